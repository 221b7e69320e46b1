pub mod album_detail;
pub mod album_list;
pub mod artist_list;
pub mod landing;
pub mod now_playing;

use eframe::egui;

use crate::app::{Notice, NoticeLevel, UiAction};

pub use album_detail::paint_album_detail;
pub use album_list::paint_album_list;
pub use artist_list::paint_artist_list;
pub use landing::{LandingData, paint_landing};
pub use now_playing::paint_now_playing;

/// Displays at most this wide are treated as the small touch panel.
const SMALL_DISPLAY_WIDTH: f32 = 480.0;

/// Widget scale for the current display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UiScale(f32);

impl UiScale {
    /// A positive configured scale wins over the one derived from `width`.
    pub fn new(width: f32, configured: Option<f32>) -> Self {
        match configured.filter(|scale| scale.is_finite() && *scale > 0.0) {
            Some(scale) => Self(scale),
            None if width <= SMALL_DISPLAY_WIDTH => Self(0.75),
            None => Self(1.0),
        }
    }

    pub fn touch_height(self) -> f32 {
        40.0 * self.0
    }

    pub fn transport_size(self) -> f32 {
        50.0 * self.0
    }

    pub fn art_size(self) -> f32 {
        150.0 * self.0
    }

    pub fn text(self, size: f32) -> f32 {
        size * self.0
    }
}

/// Returns a semi-transparent version of the widget inactive background fill color,
/// used for list rows and the art placeholder.
pub fn semi_transparent_fill(ui: &egui::Ui) -> egui::Color32 {
    let fill = ui.visuals().widgets.inactive.bg_fill;
    egui::Color32::from_rgba_unmultiplied(fill.r(), fill.g(), fill.b(), 180)
}

/// Full-width touch row. Returns `true` when tapped.
pub fn list_button(ui: &mut egui::Ui, label: impl Into<String>, scale: UiScale) -> bool {
    let fill = semi_transparent_fill(ui);
    ui.add_sized(
        egui::vec2(ui.available_width(), scale.touch_height()),
        egui::Button::new(egui::RichText::new(label).size(scale.text(15.0)))
            .fill(fill)
            .frame(true),
    )
    .clicked()
}

pub fn paint_empty(ui: &mut egui::Ui, text: &str, scale: UiScale) {
    ui.add_space(20.0);
    ui.vertical_centered(|ui| {
        ui.label(egui::RichText::new(text).weak().size(scale.text(16.0)));
    });
}

/// Title bar with a Back button everywhere but on the root screen.
pub fn paint_header(
    ui: &mut egui::Ui,
    title: &str,
    can_go_back: bool,
    scale: UiScale,
    actions: &mut Vec<UiAction>,
) {
    ui.horizontal(|ui| {
        if can_go_back
            && ui
                .add_sized(
                    egui::vec2(scale.touch_height() * 2.0, scale.touch_height()),
                    egui::Button::new(egui::RichText::new("⬅ Back").size(scale.text(15.0))),
                )
                .clicked()
        {
            actions.push(UiAction::Back);
        }
        ui.add_space(8.0);
        ui.add(
            egui::Label::new(egui::RichText::new(title).strong().size(scale.text(22.0))).truncate(),
        );
    });
}

pub fn paint_notice(ui: &mut egui::Ui, notice: &Notice, actions: &mut Vec<UiAction>) {
    let color = match notice.level {
        NoticeLevel::Info => ui.visuals().text_color(),
        NoticeLevel::Warning => ui.visuals().warn_fg_color,
        NoticeLevel::Error => ui.visuals().error_fg_color,
    };
    ui.horizontal(|ui| {
        if ui.button("✖").clicked() {
            actions.push(UiAction::DismissNotice);
        }
        ui.add(egui::Label::new(egui::RichText::new(&notice.message).color(color)).truncate());
    });
}
