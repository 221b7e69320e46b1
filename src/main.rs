mod app;
mod config;
mod favorites;
mod library;
mod navigation;
mod pages;
mod playback;

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use anyhow::Context as _;
use eframe::{NativeOptions, egui};
use egui::{ColorImage, TextureHandle, TextureOptions};
use rodio_player::{AudioEngine, EngineEvent, NoOutput, RodioPlayer};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{AppState, UiAction};
use crate::config::Config;
use crate::favorites::FavoritesStore;
use crate::library::{Album, ScanOptions, ScanReport};
use crate::navigation::Screen;
use crate::pages::{
    LandingData, UiScale, paint_album_detail, paint_album_list, paint_artist_list, paint_header,
    paint_landing, paint_notice, paint_now_playing,
};
use crate::playback::{PlaybackController, PlaybackStatus};

/// Position refresh rate of the Now Playing screen.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

type Engine = Box<dyn AudioEngine>;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::new() {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(err) => {
            error!("Failed to load configuration: {err}");
            warn!("Using default configuration");
            Config::default()
        }
    };

    let favorites = FavoritesStore::load(config.favorites.path.clone());

    let (event_tx, event_rx) = mpsc::channel();
    let engine: Engine = match RodioPlayer::new(event_tx, config.audio.device.as_deref()) {
        Ok(player) => Box::new(player),
        Err(err) => {
            error!("No audio output available: {err:#}");
            Box::new(NoOutput)
        }
    };
    let playback = PlaybackController::new(engine, config.start_volume(), config.audio.wrap);
    let state = AppState::new(favorites, playback);

    let viewport = egui::ViewportBuilder::default()
        .with_title("Touchplayer")
        .with_fullscreen(config.ui.fullscreen);
    let options = NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Touchplayer",
        options,
        Box::new(move |cc| {
            // Engine events and scan results arrive on worker threads. The
            // bridges forward them and wake up the UI so they are handled
            // even if no other interaction is happening.
            let engine_rx = bridge("engine-event-bridge", event_rx, cc.egui_ctx.clone())?;
            let (scan_tx, scan_rx) = mpsc::channel();
            let scan_rx = bridge("scan-bridge", scan_rx, cc.egui_ctx.clone())?;
            let (cover_tx, cover_rx) = spawn_cover_loader(cc.egui_ctx.clone())?;

            Ok(Box::new(TouchPlayer {
                state,
                scan_options: ScanOptions {
                    root: config.library.root.clone(),
                    follow_links: config.library.follow_links,
                },
                scale_override: config.ui.scale,
                engine_rx,
                scan_tx,
                scan_rx,
                cover_tx,
                cover_rx,
                cover: Cover::default(),
            }))
        }),
    )
}

/// Forwards everything from `source` and requests a repaint per message.
fn bridge<T: Send + 'static>(
    name: &str,
    source: Receiver<T>,
    ctx: egui::Context,
) -> std::io::Result<Receiver<T>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            while let Ok(msg) = source.recv() {
                if tx.send(msg).is_err() {
                    break;
                }
                ctx.request_repaint();
            }
        })?;
    Ok(rx)
}

// ---------------------------------------------------------------------------
// Cover art
// ---------------------------------------------------------------------------

/// Decoded art of one file, sent back by the cover loader.
struct CoverArt {
    source: PathBuf,
    image: Option<ColorImage>,
}

fn load_cover(path: &Path) -> anyhow::Result<ColorImage> {
    let bytes = library::read_embedded_art(path)
        .with_context(|| format!("No embedded art in {}", path.display()))?;
    let img = image::load_from_memory(&bytes)
        .with_context(|| format!("Failed to decode cover art of {}", path.display()))?;
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.into_raw();
    Ok(ColorImage::from_rgba_unmultiplied(size, &pixels))
}

/// Reads and decodes cover art off the UI thread. Requests that queued up
/// while a file was decoded are collapsed to the latest one.
fn spawn_cover_loader(
    ctx: egui::Context,
) -> std::io::Result<(Sender<PathBuf>, Receiver<CoverArt>)> {
    let (request_tx, request_rx) = mpsc::channel::<PathBuf>();
    let (art_tx, art_rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("cover-loader".into())
        .spawn(move || {
            while let Ok(mut source) = request_rx.recv() {
                while let Ok(newer) = request_rx.try_recv() {
                    source = newer;
                }
                let image = match load_cover(&source) {
                    Ok(image) => {
                        debug!("Loaded cover art from {}", source.display());
                        Some(image)
                    }
                    Err(err) => {
                        warn!("{err:#}");
                        None
                    }
                };
                if art_tx.send(CoverArt { source, image }).is_err() {
                    break;
                }
                ctx.request_repaint();
            }
        })?;
    Ok((request_tx, art_rx))
}

/// Texture of the album art shown on Now Playing, keyed by the file it came from.
#[derive(Default)]
struct Cover {
    source: Option<PathBuf>,
    texture: Option<TextureHandle>,
}

impl Cover {
    /// Switches to `source`. Returns `true` when its art has to be loaded.
    fn select(&mut self, source: Option<&Path>) -> bool {
        if self.source.as_deref() == source {
            return false;
        }
        self.source = source.map(Path::to_path_buf);
        self.texture = None;
        self.source.is_some()
    }

    /// Art for anything but the selected source is dropped.
    fn receive(&mut self, ctx: &egui::Context, art: CoverArt) {
        if self.source.as_ref() != Some(&art.source) {
            return;
        }
        self.texture = art
            .image
            .map(|img| ctx.load_texture("cover_art", img, TextureOptions::LINEAR));
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

struct TouchPlayer {
    state: AppState<Engine>,
    scan_options: ScanOptions,
    scale_override: Option<f32>,
    engine_rx: Receiver<EngineEvent>,
    scan_tx: Sender<ScanReport>,
    scan_rx: Receiver<ScanReport>,
    cover_tx: Sender<PathBuf>,
    cover_rx: Receiver<CoverArt>,
    cover: Cover,
}

impl TouchPlayer {
    fn drain_channels(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.engine_rx.try_recv() {
            self.state.handle_engine_event(event);
        }
        while let Ok(report) = self.scan_rx.try_recv() {
            self.state.finish_scan(report);
        }
        while let Ok(art) = self.cover_rx.try_recv() {
            self.cover.receive(ctx, art);
        }
    }

    fn start_scan_if_requested(&mut self) {
        if !self.state.take_scan_request() {
            return;
        }
        if let Err(e) = library::spawn_scan(self.scan_options.clone(), self.scan_tx.clone()) {
            self.state.scan_failed(&e.to_string());
        }
    }

    /// Art of the playing track's album, falling back to the track itself.
    fn cover_source(&self) -> Option<PathBuf> {
        let track = self.state.playback.current_track()?;
        self.state
            .catalog
            .album(&track.album_key())
            .and_then(|album| album.art.clone())
            .or_else(|| track.has_art.then(|| track.path.clone()))
    }

    fn paint_screen(&self, ui: &mut egui::Ui, scale: UiScale, actions: &mut Vec<UiAction>) {
        let catalog = &self.state.catalog;
        let favorites = &self.state.favorites;
        match self.state.navigation.current() {
            Screen::Landing => {
                let data = LandingData {
                    album_count: catalog.albums().len(),
                    track_count: catalog.track_count(),
                    favorite_count: self.favorite_albums().len(),
                    has_track: self.state.playback.current_track().is_some(),
                    is_scanning: self.state.is_scanning(),
                };
                paint_landing(ui, &data, scale, actions);
            }
            Screen::AlbumList { artist: None } => {
                let albums: Vec<&Album> = catalog.albums().iter().collect();
                paint_album_list(ui, &albums, favorites, "No albums found", scale, actions);
            }
            Screen::AlbumList {
                artist: Some(artist),
            } => {
                let albums = catalog.albums_by(artist);
                paint_album_list(ui, &albums, favorites, "No albums found", scale, actions);
            }
            Screen::ArtistList => paint_artist_list(ui, catalog.artists(), scale, actions),
            Screen::FavoritesList => {
                let albums = self.favorite_albums();
                paint_album_list(ui, &albums, favorites, "No favorites yet", scale, actions);
            }
            Screen::AlbumDetail { album } => {
                let playing = self
                    .state
                    .playback
                    .current_track()
                    .map(|track| track.path.as_path());
                paint_album_detail(
                    ui,
                    catalog.album(album),
                    favorites.is_favorite(album),
                    playing,
                    scale,
                    actions,
                );
            }
            Screen::NowPlaying => {
                let playback = self.state.playback.state();
                paint_now_playing(ui, &playback, self.cover.texture.as_ref(), scale, actions);
            }
        }
    }

    /// Favorites that exist in the current catalog, in the order they were added.
    fn favorite_albums(&self) -> Vec<&Album> {
        self.state
            .favorites
            .albums()
            .iter()
            .filter_map(|key| self.state.catalog.album(key))
            .collect()
    }
}

impl eframe::App for TouchPlayer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_channels(ctx);
        self.start_scan_if_requested();

        let mut actions: Vec<UiAction> = Vec::new();

        let (escape, space) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::Space),
            )
        });
        if escape {
            actions.push(UiAction::Back);
        }
        if space {
            actions.push(UiAction::TogglePlay);
        }

        if *self.state.navigation.current() == Screen::NowPlaying {
            let source = self.cover_source();
            if self.cover.select(source.as_deref())
                && let Some(path) = source
                && self.cover_tx.send(path).is_err()
            {
                warn!("Cover loader is gone");
            }
        }

        let scale = UiScale::new(ctx.screen_rect().width(), self.scale_override);
        let screen = self.state.navigation.current().clone();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(4.0);
            paint_header(
                ui,
                &screen.title(),
                !self.state.navigation.is_root(),
                scale,
                &mut actions,
            );
            if let Some(notice) = &self.state.notice {
                paint_notice(ui, notice, &mut actions);
            }
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| self.paint_screen(ui, scale, &mut actions));
        });

        for action in actions {
            self.state.process_action(action);
        }

        if self.state.exit_requested() {
            info!("Exiting");
            self.state.playback.stop();
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        // Position label and scan spinner need regular refreshes.
        if self.state.playback.status() == PlaybackStatus::Playing || self.state.is_scanning() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }
}
