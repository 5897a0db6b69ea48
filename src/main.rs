#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod backend;
mod bridge;
mod theme;
mod widgets;

use std::fs;
use std::path::{Path, PathBuf};

use eframe::egui;
use egui::{Color32, RichText, Vec2};

use backend::{ControlEvent, StartParams};
use bridge::ControlBridge;
use theme::*;
use widgets::*;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Application State ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum StatusTone {
    Neutral,
    Good,
    Warn,
    Bad,
}

impl StatusTone {
    fn color(self) -> Color32 {
        match self {
            StatusTone::Neutral => TEXT_MUTED,
            StatusTone::Good => SUCCESS,
            StatusTone::Warn => WARNING,
            StatusTone::Bad => ERROR,
        }
    }
}

struct PanelApp {
    bridge: ControlBridge,
    params: StartParams,

    running: bool,
    stopping: bool,
    uploading: bool,

    status: String,
    status_tone: StatusTone,
}

impl Default for PanelApp {
    fn default() -> Self {
        Self {
            bridge: ControlBridge::new(),
            params: StartParams::default(),
            running: false,
            stopping: false,
            uploading: false,
            status: "Stopped".to_string(),
            status_tone: StatusTone::Neutral,
        }
    }
}

impl PanelApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        theme::configure_fonts(&cc.egui_ctx);
        theme::apply_theme(&cc.egui_ctx);

        let mut app = Self::default();
        if let Some(path) = settings_file_path() {
            if let Some(params) = load_params(&path) {
                app.params = params;
            }
        }
        app.bridge.refresh_tools();
        app
    }

    fn set_status(&mut self, text: impl Into<String>, tone: StatusTone) {
        self.status = text.into();
        self.status_tone = tone;
    }

    fn apply_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Started => {
                self.running = true;
                self.stopping = false;
                self.set_status("Running", StatusTone::Good);
            }
            ControlEvent::Stopped(code) => {
                self.running = false;
                self.stopping = false;
                if code == 0 {
                    self.set_status("Stopped", StatusTone::Neutral);
                } else {
                    self.set_status(format!("Stopped (code {code})"), StatusTone::Warn);
                }
            }
            ControlEvent::Error(message) => {
                self.running = false;
                self.stopping = false;
                self.set_status(format!("Error: {message}"), StatusTone::Bad);
            }
            ControlEvent::UploadComplete(code) => {
                self.uploading = false;
                if code == 0 {
                    self.set_status("Upload complete", StatusTone::Good);
                } else {
                    self.set_status(format!("Upload failed (code {code})"), StatusTone::Bad);
                }
            }
            ControlEvent::UploadError(message) => {
                self.uploading = false;
                self.set_status(format!("Upload error: {message}"), StatusTone::Bad);
            }
        }
    }

    fn persist_params(&self) {
        if let Some(path) = settings_file_path() {
            save_params(&path, &self.params);
        }
    }

    fn inputs_locked(&self) -> bool {
        self.running || self.stopping
    }

    fn click_start(&mut self) {
        self.persist_params();
        self.set_status("Starting…", StatusTone::Neutral);
        self.bridge.start(self.params);
    }

    fn click_stop(&mut self) {
        self.stopping = true;
        self.set_status("Stopping…", StatusTone::Neutral);
        self.bridge.stop();
    }

    fn click_upload(&mut self) {
        self.uploading = true;
        self.set_status("Uploading…", StatusTone::Neutral);
        self.bridge.upload_files();
    }
}

// ── UI ─────────────────────────────────────────────────────────────

impl PanelApp {
    fn show_params(&mut self, ui: &mut egui::Ui) {
        section_header(ui, "🎛", "Search parameters");
        ui.add_space(4.0);
        let locked = self.inputs_locked();
        card_frame(ui, |ui| {
            ui.add_enabled_ui(!locked, |ui| {
                egui::Grid::new("params_grid")
                    .num_columns(2)
                    .spacing([24.0, 8.0])
                    .show(ui, |ui| {
                        param_row(ui, "Top K results", &mut self.params.top_k, 1.0);
                        param_row(ui, "Queries", &mut self.params.num_queries, 1.0);
                        param_row(
                            ui,
                            "Per-page characters",
                            &mut self.params.per_page_chars,
                            50.0,
                        );
                        param_row(ui, "Total characters", &mut self.params.total_chars, 250.0);
                    });
            });
        });
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            let w = (ui.available_width() - 16.0) / 3.0;
            let size = Vec2::new(w, 36.0);

            let start_enabled = !self.running && !self.stopping;
            let label = if self.running { "Running" } else { "▶ Start" };
            if accent_button_enabled(ui, label, ACCENT, size, start_enabled).clicked()
                && start_enabled
            {
                self.click_start();
            }

            let stop_enabled = self.running && !self.stopping;
            if accent_button_enabled(ui, "⏹ Stop", ERROR, size, stop_enabled).clicked()
                && stop_enabled
            {
                self.click_stop();
            }

            if accent_button(ui, "⬆ Upload files", WARNING, size).clicked() {
                self.click_upload();
            }
        });
    }

    fn show_tools(&mut self, ui: &mut egui::Ui) {
        ui.add_space(10.0);
        section_header(ui, "🔌", "Stack tools");
        ui.add_space(4.0);
        card_frame(ui, |ui| {
            if self.bridge.tools().is_empty() {
                ui.label(
                    RichText::new("No tool probe has run yet")
                        .size(11.0)
                        .color(TEXT_MUTED),
                );
            } else {
                for status in self.bridge.tools().to_vec() {
                    tool_row(ui, &status);
                }
            }
        });
    }
}

impl eframe::App for PanelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        for event in self.bridge.poll() {
            self.apply_event(event);
        }

        if self.running || self.stopping || self.uploading {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        // ── Top Bar ─────────────────────────────────────────
        egui::TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::NONE
                    .fill(BG_PANEL)
                    .inner_margin(egui::Margin::symmetric(12, 7)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("🔍").size(18.0).color(ACCENT));
                    ui.label(
                        RichText::new("Searchdeck")
                            .size(16.0)
                            .color(TEXT_PRIMARY)
                            .strong(),
                    );
                    ui.label(
                        RichText::new(format!("v{APP_VERSION}"))
                            .size(10.0)
                            .color(TEXT_MUTED),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let (text, color) = if self.running {
                            ("running", SUCCESS)
                        } else if self.stopping {
                            ("stopping", WARNING)
                        } else {
                            ("idle", Color32::from_rgb(120, 130, 138))
                        };
                        status_badge(ui, text, color);
                    });
                });
            });

        // ── Status Bar ──────────────────────────────────────
        egui::TopBottomPanel::bottom("status_bar")
            .frame(
                egui::Frame::NONE
                    .fill(BG_PANEL)
                    .inner_margin(egui::Margin::symmetric(12, 5)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if self.running || self.stopping || self.uploading {
                        let t = ctx.input(|i| i.time);
                        let phase = (t * 3.0) as usize % 4;
                        ui.label(
                            RichText::new(["⠋", "⠙", "⠹", "⠸"][phase])
                                .color(ACCENT)
                                .monospace(),
                        );
                    }
                    ui.label(
                        RichText::new(&self.status)
                            .size(12.0)
                            .color(self.status_tone.color()),
                    );
                });
            });

        // ── Central Panel ───────────────────────────────────
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(4.0);
                self.show_params(ui);
                self.show_controls(ui);
                self.show_tools(ui);
                ui.add_space(12.0);
            });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.persist_params();
        self.bridge.shutdown();
    }
}

fn param_row(ui: &mut egui::Ui, label: &str, value: &mut i64, speed: f64) {
    ui.label(RichText::new(label).size(12.0).color(TEXT_SECONDARY));
    ui.add(egui::DragValue::new(value).speed(speed));
    ui.end_row();
}

// ── User Settings ──────────────────────────────────────────────────

fn settings_file_path() -> Option<PathBuf> {
    let base = dirs::config_dir()
        .or_else(dirs::data_local_dir)
        .or_else(dirs::home_dir)?;
    Some(base.join("searchdeck").join("settings.json"))
}

fn load_params(path: &Path) -> Option<StartParams> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn save_params(path: &Path, params: &StartParams) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(json) = serde_json::to_string_pretty(params) {
        let _ = fs::write(path, json);
    }
}

// ── Entry Point ────────────────────────────────────────────────────

fn main() -> eframe::Result {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([440.0, 560.0])
            .with_min_inner_size([400.0, 480.0])
            .with_title("Searchdeck"),
        ..Default::default()
    };

    eframe::run_native(
        "Searchdeck",
        options,
        Box::new(|cc| Ok(Box::new(PanelApp::new(cc)))),
    )
}
