use eframe::egui;

use crate::app::UiAction;
use crate::favorites::FavoritesStore;
use crate::library::Album;
use crate::navigation::Screen;
use crate::pages::{UiScale, list_button, paint_empty};

/// Album rows for the album list, an artist's albums and the favorites.
pub fn paint_album_list(
    ui: &mut egui::Ui,
    albums: &[&Album],
    favorites: &FavoritesStore,
    empty_text: &str,
    scale: UiScale,
    actions: &mut Vec<UiAction>,
) {
    if albums.is_empty() {
        paint_empty(ui, empty_text, scale);
        return;
    }

    ui.label(
        egui::RichText::new(format!("{} albums", albums.len()))
            .weak()
            .small(),
    );
    ui.add_space(4.0);

    for album in albums {
        let marker = if favorites.is_favorite(&album.key) {
            "♥"
        } else {
            "💿"
        };
        let label = format!("{marker}  {} — {}", album.name(), album.artist());
        if list_button(ui, label, scale) {
            actions.push(UiAction::Open(Screen::AlbumDetail {
                album: album.key.clone(),
            }));
        }
    }
}
