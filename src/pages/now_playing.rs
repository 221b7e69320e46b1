use std::time::Duration;

use eframe::egui;

use crate::app::UiAction;
use crate::pages::{UiScale, semi_transparent_fill};
use crate::playback::{PlaybackState, PlaybackStatus};

/// Formats a duration as `m:ss`.
pub fn format_time(duration: Duration) -> String {
    let seconds = duration.as_secs();
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn paint_now_playing(
    ui: &mut egui::Ui,
    state: &PlaybackState,
    cover_texture: Option<&egui::TextureHandle>,
    scale: UiScale,
    actions: &mut Vec<UiAction>,
) {
    let art_size = egui::vec2(scale.art_size(), scale.art_size());

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        let available_width = ui.available_width();
        ui.add_space(available_width / 20.0);

        paint_art(ui, art_size, cover_texture, scale);

        ui.add_space(16.0);

        ui.vertical(|ui| {
            ui.add_space(art_size.y / 5.0);
            let Some(track) = &state.track else {
                ui.label(
                    egui::RichText::new("No track selected")
                        .strong()
                        .size(scale.text(28.0)),
                );
                return;
            };
            ui.add(
                egui::Label::new(
                    egui::RichText::new(&track.title)
                        .strong()
                        .size(scale.text(28.0)),
                )
                .truncate(),
            );
            ui.add_space(4.0);
            ui.label(
                egui::RichText::new(&track.artist)
                    .weak()
                    .size(scale.text(22.0)),
            );
            ui.label(
                egui::RichText::new(&track.album)
                    .weak()
                    .italics()
                    .size(scale.text(18.0)),
            );
        });
    });

    ui.add_space(12.0);
    paint_progress(ui, state, scale, actions);
    ui.add_space(8.0);
    paint_transport(ui, state, scale, actions);
}

fn paint_art(
    ui: &mut egui::Ui,
    art_size: egui::Vec2,
    cover_texture: Option<&egui::TextureHandle>,
    scale: UiScale,
) {
    let (rect, _) = ui.allocate_exact_size(art_size, egui::Sense::hover());
    let rounding = egui::CornerRadius::same(12);
    ui.painter()
        .rect_filled(rect, rounding, semi_transparent_fill(ui));

    let Some(texture) = cover_texture else {
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "🎵",
            egui::FontId::proportional(scale.text(64.0)),
            ui.visuals().text_color(),
        );
        return;
    };

    // "Cover" scaling: fill the square while preserving aspect ratio
    let img_size = texture.size_vec2();
    let img_aspect = img_size.x / img_size.y;
    let art_aspect = art_size.x / art_size.y;
    let uv_rect = if img_aspect > art_aspect {
        let offset = (1.0 - art_aspect / img_aspect) / 2.0;
        egui::Rect::from_min_max(egui::pos2(offset, 0.0), egui::pos2(1.0 - offset, 1.0))
    } else {
        let offset = (1.0 - img_aspect / art_aspect) / 2.0;
        egui::Rect::from_min_max(egui::pos2(0.0, offset), egui::pos2(1.0, 1.0 - offset))
    };
    ui.painter()
        .with_clip_rect(rect)
        .image(texture.id(), rect, uv_rect, egui::Color32::WHITE);
}

fn paint_progress(
    ui: &mut egui::Ui,
    state: &PlaybackState,
    scale: UiScale,
    actions: &mut Vec<UiAction>,
) {
    let duration = state.duration.unwrap_or_default();
    let seekable = state.status != PlaybackStatus::Stopped && !duration.is_zero();

    ui.horizontal(|ui| {
        let label = format!(
            "{} / {}",
            format_time(state.position),
            format_time(duration)
        );
        ui.label(egui::RichText::new(label).monospace().size(scale.text(15.0)));

        let slider_width = (ui.available_width() - 8.0).max(0.0);
        ui.spacing_mut().slider_width = slider_width;
        let mut position = state.position.as_secs_f32();
        let response = ui.add_enabled(
            seekable,
            egui::Slider::new(&mut position, 0.0..=duration.as_secs_f32()).show_value(false),
        );
        if response.drag_stopped() || (response.changed() && !response.dragged()) {
            actions.push(UiAction::Seek(Duration::from_secs_f32(position.max(0.0))));
        }
    });
}

fn paint_transport(
    ui: &mut egui::Ui,
    state: &PlaybackState,
    scale: UiScale,
    actions: &mut Vec<UiAction>,
) {
    let button_size = egui::vec2(scale.transport_size(), scale.transport_size());
    let has_track = state.track.is_some();

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 6.0;

        if ui
            .add_enabled(has_track, egui::Button::new("⏮").min_size(button_size))
            .clicked()
        {
            actions.push(UiAction::Previous);
        }

        let play_pause_label = if state.status == PlaybackStatus::Playing {
            "⏸"
        } else {
            "▶"
        };
        if ui
            .add_enabled(
                has_track,
                egui::Button::new(play_pause_label).min_size(button_size),
            )
            .clicked()
        {
            actions.push(UiAction::TogglePlay);
        }

        if ui
            .add_enabled(
                state.status != PlaybackStatus::Stopped,
                egui::Button::new("⏹").min_size(button_size),
            )
            .clicked()
        {
            actions.push(UiAction::Stop);
        }

        if ui
            .add_enabled(has_track, egui::Button::new("⏭").min_size(button_size))
            .clicked()
        {
            actions.push(UiAction::Next);
        }

        ui.separator();

        ui.label(egui::RichText::new("🔊").size(scale.text(20.0)));
        ui.spacing_mut().slider_width = scale.art_size();
        let mut volume = state.volume;
        if ui
            .add(egui::Slider::new(&mut volume, 0.0..=1.0).show_value(false))
            .changed()
        {
            actions.push(UiAction::SetVolume(volume));
        }
    });
}
