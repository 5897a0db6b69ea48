use egui::epaint::CornerRadius;
use egui::{Color32, FontDefinitions, FontFamily, FontId, Shadow, Stroke, Style, Vec2, Visuals};

// ── Color Palette (slate + teal) ───────────────────────────────────
pub const BG_DARK: Color32 = Color32::from_rgb(14, 17, 20);
pub const BG_PANEL: Color32 = Color32::from_rgb(19, 23, 27);
pub const BG_CARD: Color32 = Color32::from_rgb(26, 31, 36);
pub const BG_CARD_HOVER: Color32 = Color32::from_rgb(36, 42, 48);
pub const BG_INPUT: Color32 = Color32::from_rgb(22, 26, 30);

pub const ACCENT: Color32 = Color32::from_rgb(47, 191, 169);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(236, 239, 241);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(205, 211, 215);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(142, 152, 160);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(58, 66, 73);

pub const SUCCESS: Color32 = Color32::from_rgb(92, 201, 110);
pub const WARNING: Color32 = Color32::from_rgb(236, 186, 90);
pub const ERROR: Color32 = Color32::from_rgb(235, 101, 101);

// ── Spacing & Sizing ───────────────────────────────────────────────
pub const CARD_ROUNDING: CornerRadius = CornerRadius::same(10);
pub const BUTTON_ROUNDING: CornerRadius = CornerRadius::same(8);
pub const PILL_ROUNDING: CornerRadius = CornerRadius::same(20);

pub const SPACING: Vec2 = Vec2::new(10.0, 8.0);

// ── Style Application ──────────────────────────────────────────────

pub fn configure_fonts(ctx: &egui::Context) {
    let mut fonts = FontDefinitions::default();
    fonts.families.entry(FontFamily::Proportional).or_default();
    fonts.families.entry(FontFamily::Monospace).or_default();
    ctx.set_fonts(fonts);
}

pub fn apply_theme(ctx: &egui::Context) {
    let mut style = Style::default();
    let mut visuals = Visuals::dark();

    visuals.window_fill = BG_PANEL;
    visuals.window_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.window_shadow = Shadow {
        offset: [0, 4],
        blur: 14,
        spread: 0,
        color: Color32::from_black_alpha(80),
    };
    visuals.window_corner_radius = CARD_ROUNDING;

    visuals.panel_fill = BG_DARK;

    visuals.widgets.noninteractive.bg_fill = BG_CARD;
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, TEXT_SECONDARY);
    visuals.widgets.noninteractive.corner_radius = BUTTON_ROUNDING;
    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, BORDER_SUBTLE);

    visuals.widgets.inactive.bg_fill = BG_CARD;
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);
    visuals.widgets.inactive.corner_radius = BUTTON_ROUNDING;
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, BORDER_SUBTLE);

    visuals.widgets.hovered.bg_fill = BG_CARD_HOVER;
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, Color32::WHITE);
    visuals.widgets.hovered.corner_radius = BUTTON_ROUNDING;
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT);

    visuals.widgets.active.bg_fill = ACCENT;
    visuals.widgets.active.fg_stroke = Stroke::new(1.0, Color32::BLACK);
    visuals.widgets.active.corner_radius = BUTTON_ROUNDING;

    visuals.selection.bg_fill = Color32::from_rgba_premultiplied(47, 191, 169, 60);
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);

    visuals.extreme_bg_color = BG_INPUT;
    visuals.faint_bg_color = BG_CARD;

    style.visuals = visuals;
    style.spacing.item_spacing = SPACING;
    style.spacing.window_margin = egui::Margin::same(16);
    style.spacing.button_padding = Vec2::new(14.0, 6.0);

    style.text_styles.insert(
        egui::TextStyle::Heading,
        FontId::new(19.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Body,
        FontId::new(14.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Button,
        FontId::new(13.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Small,
        FontId::new(12.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Monospace,
        FontId::new(13.0, FontFamily::Monospace),
    );

    ctx.set_style(style);
}
