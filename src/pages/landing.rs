use eframe::egui;

use crate::app::UiAction;
use crate::navigation::Screen;
use crate::pages::{UiScale, list_button};

pub struct LandingData {
    pub album_count: usize,
    pub track_count: usize,
    pub favorite_count: usize,
    pub has_track: bool,
    pub is_scanning: bool,
}

pub fn paint_landing(
    ui: &mut egui::Ui,
    data: &LandingData,
    scale: UiScale,
    actions: &mut Vec<UiAction>,
) {
    ui.add_space(8.0);

    if list_button(ui, format!("💿  Albums ({})", data.album_count), scale) {
        actions.push(UiAction::Open(Screen::AlbumList { artist: None }));
    }
    if list_button(ui, "🎤  Artists", scale) {
        actions.push(UiAction::Open(Screen::ArtistList));
    }
    if list_button(ui, format!("♥  Favorites ({})", data.favorite_count), scale) {
        actions.push(UiAction::Open(Screen::FavoritesList));
    }
    if data.has_track && list_button(ui, "▶  Now playing", scale) {
        actions.push(UiAction::ShowNowPlaying);
    }

    ui.add_space(12.0);
    ui.horizontal(|ui| {
        if data.is_scanning {
            ui.spinner();
            ui.label(egui::RichText::new("Scanning...").weak().italics());
        } else {
            if ui
                .button(egui::RichText::new("🔄 Refresh library").size(scale.text(15.0)))
                .on_hover_text("Scan the music folder for changes")
                .clicked()
            {
                actions.push(UiAction::RefreshLibrary);
            }
            ui.label(
                egui::RichText::new(format!("{} tracks", data.track_count))
                    .weak()
                    .small(),
            );
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui
                .button(egui::RichText::new("⏻ Exit").size(scale.text(15.0)))
                .clicked()
            {
                actions.push(UiAction::Exit);
            }
        });
    });
}
