use eframe::egui;

use crate::app::UiAction;
use crate::library::Artist;
use crate::navigation::Screen;
use crate::pages::{UiScale, list_button, paint_empty};

pub fn paint_artist_list(
    ui: &mut egui::Ui,
    artists: &[Artist],
    scale: UiScale,
    actions: &mut Vec<UiAction>,
) {
    if artists.is_empty() {
        paint_empty(ui, "No artists found", scale);
        return;
    }

    ui.label(
        egui::RichText::new(format!("{} artists", artists.len()))
            .weak()
            .small(),
    );
    ui.add_space(4.0);

    for artist in artists {
        let count = artist.albums.len();
        let label = if count == 1 {
            format!("🎤  {}", artist.name)
        } else {
            format!("🎤  {} ({count} albums)", artist.name)
        };
        if list_button(ui, label, scale) {
            actions.push(UiAction::Open(Screen::AlbumList {
                artist: Some(artist.name.clone()),
            }));
        }
    }
}
