use std::path::Path;

use eframe::egui;

use crate::app::UiAction;
use crate::library::Album;
use crate::pages::now_playing::format_time;
use crate::pages::{UiScale, paint_empty, semi_transparent_fill};

/// Track list of one album with the favorite toggle. `album` is `None` when
/// the album vanished with the last library refresh.
pub fn paint_album_detail(
    ui: &mut egui::Ui,
    album: Option<&Album>,
    is_favorite: bool,
    playing: Option<&Path>,
    scale: UiScale,
    actions: &mut Vec<UiAction>,
) {
    let Some(album) = album else {
        paint_empty(ui, "Album no longer in library", scale);
        return;
    };

    ui.horizontal(|ui| {
        ui.label(
            egui::RichText::new(album.artist())
                .weak()
                .size(scale.text(18.0)),
        );
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let (icon, hint) = if is_favorite {
                ("♥", "Remove from favorites")
            } else {
                ("♡", "Add to favorites")
            };
            if ui
                .add_sized(
                    egui::vec2(scale.touch_height(), scale.touch_height()),
                    egui::Button::new(egui::RichText::new(icon).size(scale.text(22.0))),
                )
                .on_hover_text(hint)
                .clicked()
            {
                actions.push(UiAction::ToggleFavorite(album.key.clone()));
            }
        });
    });

    ui.label(
        egui::RichText::new(format!("{} tracks", album.tracks.len()))
            .weak()
            .small(),
    );
    ui.add_space(4.0);

    let fill = semi_transparent_fill(ui);
    for (index, track) in album.tracks.iter().enumerate() {
        let number = track
            .track_number
            .map(|n| format!("{n:>2}."))
            .unwrap_or_else(|| " –".to_string());
        let mut label = format!("{number}  {}", track.title);
        if let Some(duration) = track.duration {
            label = format!("{label}  ({})", format_time(duration));
        }

        let is_current = playing == Some(track.path.as_path());
        let text = egui::RichText::new(label).size(scale.text(15.0));
        let text = if is_current { text.strong() } else { text };
        let button = egui::Button::new(text).fill(if is_current {
            ui.visuals().selection.bg_fill
        } else {
            fill
        });

        if ui
            .add_sized(egui::vec2(ui.available_width(), scale.touch_height()), button)
            .clicked()
        {
            actions.push(UiAction::PlayTrack {
                album: album.key.clone(),
                index,
            });
        }
    }
}
