use crate::backend::ToolStatus;
use crate::theme::*;
use egui::{self, Color32, FontFamily, FontId, Pos2, RichText, Sense, Stroke, Vec2};

// ── Accent Button ──────────────────────────────────────────────────

pub fn accent_button(ui: &mut egui::Ui, text: &str, color: Color32, size: Vec2) -> egui::Response {
    accent_button_enabled(ui, text, color, size, true)
}

pub fn accent_button_enabled(
    ui: &mut egui::Ui,
    text: &str,
    color: Color32,
    size: Vec2,
    enabled: bool,
) -> egui::Response {
    let sense = if enabled { Sense::click() } else { Sense::hover() };
    let (rect, response) = ui.allocate_exact_size(size, sense);

    if ui.is_rect_visible(rect) {
        let bg = if !enabled {
            BG_CARD
        } else if response.hovered() {
            lighten(color, 25)
        } else {
            color
        };
        ui.painter().rect_filled(rect, BUTTON_ROUNDING, bg);
        if !enabled {
            ui.painter().rect_stroke(
                rect,
                BUTTON_ROUNDING,
                Stroke::new(1.0, BORDER_SUBTLE),
                egui::StrokeKind::Inside,
            );
        }

        let text_color = if enabled { Color32::BLACK } else { TEXT_MUTED };
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            text,
            FontId::new(12.0, FontFamily::Proportional),
            text_color,
        );
    }

    response
}

// ── Card/Panel ─────────────────────────────────────────────────────

pub fn card_frame(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::NONE
        .fill(BG_CARD)
        .corner_radius(CARD_ROUNDING)
        .stroke(Stroke::new(1.0, BORDER_SUBTLE))
        .inner_margin(egui::Margin::same(12))
        .show(ui, |ui| {
            add_contents(ui);
        });
}

// ── Status Badge ───────────────────────────────────────────────────

pub fn status_badge(ui: &mut egui::Ui, text: &str, color: Color32) {
    let galley = ui.painter().layout_no_wrap(
        text.to_string(),
        FontId::new(11.0, FontFamily::Proportional),
        Color32::BLACK,
    );
    let pill_size = Vec2::new(galley.size().x + 14.0, 20.0);
    let (rect, _) = ui.allocate_exact_size(pill_size, Sense::hover());

    if ui.is_rect_visible(rect) {
        let bg = Color32::from_rgba_premultiplied(color.r(), color.g(), color.b(), 200);
        ui.painter().rect_filled(rect, PILL_ROUNDING, bg);
        ui.painter().galley(
            Pos2::new(rect.left() + 7.0, rect.center().y - galley.size().y / 2.0),
            galley,
            Color32::TRANSPARENT,
        );
    }
}

// ── Section Header ─────────────────────────────────────────────────

pub fn section_header(ui: &mut egui::Ui, icon: &str, text: &str) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(icon).size(15.0));
        ui.label(RichText::new(text).size(14.0).color(TEXT_PRIMARY).strong());
    });
}

// ── Tool Row ───────────────────────────────────────────────────────

/// One line per external tool: availability dot, name, version or path.
pub fn tool_row(ui: &mut egui::Ui, status: &ToolStatus) {
    ui.horizontal(|ui| {
        let color = if status.available { SUCCESS } else { ERROR };
        ui.label(RichText::new("●").size(10.0).color(color));
        ui.label(
            RichText::new(&status.name)
                .monospace()
                .size(12.0)
                .color(TEXT_PRIMARY),
        );
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let detail = if status.available {
                status.detail.as_deref().unwrap_or("ok")
            } else {
                "missing"
            };
            let detail_color = if status.available { TEXT_MUTED } else { WARNING };
            ui.label(
                RichText::new(truncate_end(detail, 38))
                    .monospace()
                    .size(10.0)
                    .color(detail_color),
            );
        });
    });
}

// ── Helpers ────────────────────────────────────────────────────────

fn lighten(color: Color32, amount: u8) -> Color32 {
    Color32::from_rgb(
        color.r().saturating_add(amount),
        color.g().saturating_add(amount),
        color.b().saturating_add(amount),
    )
}

fn truncate_end(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let head: String = value.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{head}…")
}
