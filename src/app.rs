use std::time::Duration;

use rodio_player::{AudioEngine, EngineEvent};
use tracing::{error, info, warn};

use crate::favorites::FavoritesStore;
use crate::library::{AlbumKey, Catalog, ScanReport};
use crate::navigation::{NavStack, Screen};
use crate::playback::{PlaybackController, PlaybackError};

// ---------------------------------------------------------------------------
// UI actions collected during rendering
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum UiAction {
    Open(Screen),
    Back,
    PlayTrack { album: AlbumKey, index: usize },
    ShowNowPlaying,
    TogglePlay,
    Stop,
    Next,
    Previous,
    Seek(Duration),
    SetVolume(f32),
    ToggleFavorite(AlbumKey),
    RefreshLibrary,
    DismissNotice,
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Message shown on top of the current screen until dismissed or replaced.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Everything the player owns. Lives on the UI thread; other threads only
/// talk to it through events handed in by the event loop.
pub struct AppState<E: AudioEngine> {
    pub catalog: Catalog,
    pub favorites: FavoritesStore,
    pub playback: PlaybackController<E>,
    pub navigation: NavStack,
    pub notice: Option<Notice>,
    scanning: bool,
    scan_requested: bool,
    exit_requested: bool,
}

impl<E: AudioEngine> AppState<E> {
    /// The library scan is requested right away.
    pub fn new(favorites: FavoritesStore, playback: PlaybackController<E>) -> Self {
        Self {
            catalog: Catalog::default(),
            favorites,
            playback,
            navigation: NavStack::new(),
            notice: None,
            scanning: false,
            scan_requested: true,
            exit_requested: false,
        }
    }

    pub fn process_action(&mut self, action: UiAction) {
        match action {
            UiAction::Open(screen) => self.navigation.push(screen),
            UiAction::Back => {
                if !self.navigation.pop() {
                    info!("Back on the landing screen, exiting");
                    self.exit_requested = true;
                }
            }
            UiAction::PlayTrack { album, index } => self.play_album_track(&album, index),
            UiAction::ShowNowPlaying => self.navigation.show_now_playing(),
            UiAction::TogglePlay => {
                let result = self.playback.toggle();
                self.handle_playback_result(result);
            }
            UiAction::Stop => self.playback.stop(),
            UiAction::Next => {
                let result = self.playback.next().map(|_| ());
                self.handle_playback_result(result);
            }
            UiAction::Previous => {
                let result = self.playback.previous();
                self.handle_playback_result(result);
            }
            UiAction::Seek(position) => {
                if let Err(e) = self.playback.seek(position) {
                    warn!("Seek to {position:?} failed: {e}");
                }
            }
            UiAction::SetVolume(volume) => self.playback.set_volume(volume),
            UiAction::ToggleFavorite(album) => self.toggle_favorite(&album),
            UiAction::RefreshLibrary => {
                if !self.scanning {
                    self.scan_requested = true;
                }
            }
            UiAction::DismissNotice => self.notice = None,
            UiAction::Exit => self.exit_requested = true,
        }
    }

    /// Handles a message from the audio engine's threads.
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Finished { token } => {
                let result = self.playback.on_track_finished(token).map(|_| ());
                self.handle_playback_result(result);
            }
        }
    }

    /// Returns `true` once per requested scan and marks the scan as running.
    pub fn take_scan_request(&mut self) -> bool {
        if self.scan_requested && !self.scanning {
            self.scan_requested = false;
            self.scanning = true;
            true
        } else {
            false
        }
    }

    /// Called when a scan could not be started at all.
    pub fn scan_failed(&mut self, reason: &str) {
        error!("Could not start library scan: {reason}");
        self.scanning = false;
        self.notice = Some(Notice::new(
            NoticeLevel::Error,
            format!("Could not scan library: {reason}"),
        ));
    }

    /// Replaces the catalog with a finished scan.
    pub fn finish_scan(&mut self, report: ScanReport) {
        self.scanning = false;
        self.catalog = report.catalog;
        if let Some(first) = report.errors.first() {
            let message = if report.errors.len() == 1 {
                first.to_string()
            } else {
                format!("{first} (and {} more)", report.errors.len() - 1)
            };
            self.notice = Some(Notice::new(NoticeLevel::Warning, message));
        } else if self.catalog.is_empty() {
            self.notice = Some(Notice::new(NoticeLevel::Info, "No music found"));
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    fn play_album_track(&mut self, key: &AlbumKey, index: usize) {
        let Some(album) = self.catalog.album(key) else {
            warn!("Album {key} is not in the library");
            self.notice = Some(Notice::new(
                NoticeLevel::Warning,
                format!("{} is no longer in the library", key.name),
            ));
            return;
        };
        let Some(track) = album.tracks.get(index).cloned() else {
            warn!("Album {key} has no track {index}");
            return;
        };
        self.playback.set_queue(album.tracks.clone());
        let result = self
            .playback
            .load(&track)
            .and_then(|_| self.playback.play());
        self.navigation.show_now_playing();
        self.handle_playback_result(result);
    }

    fn toggle_favorite(&mut self, album: &AlbumKey) {
        match self.favorites.toggle(album) {
            Ok(true) => info!("Added {album} to favorites"),
            Ok(false) => info!("Removed {album} from favorites"),
            Err(e) => {
                error!("{e}");
                self.notice = Some(Notice::new(
                    NoticeLevel::Warning,
                    format!("Favorites not saved: {e}"),
                ));
            }
        }
    }

    /// Tracks that fail to open are skipped until one plays or the album
    /// ends. Every track is tried at most once.
    fn handle_playback_result(&mut self, result: Result<(), PlaybackError>) {
        let Err(mut failure) = result else {
            return;
        };
        let mut attempts = self.playback.queue_len();
        let mut skipped = 0;
        loop {
            if !matches!(failure, PlaybackError::Load { .. }) {
                warn!("Playback: {failure}");
                return;
            }
            skipped += 1;
            self.notice = Some(Notice::new(NoticeLevel::Error, failure.to_string()));
            if attempts == 0 {
                break;
            }
            attempts -= 1;
            match self.playback.next() {
                Ok(_) => break,
                Err(next_failure) => failure = next_failure,
            }
        }
        if skipped > 1 {
            if let Some(notice) = &mut self.notice {
                notice.message = format!("{} ({skipped} tracks skipped)", notice.message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::WrapMode;
    use crate::library::Track;
    use crate::playback::PlaybackStatus;
    use crate::playback::testing::FakeEngine;
    use tempfile::TempDir;

    fn track(file: &str, title: &str, number: u32) -> Track {
        Track {
            path: PathBuf::from(format!("/m/AlbumA/{file}")),
            title: title.to_string(),
            artist: "X".to_string(),
            album: "AlbumA".to_string(),
            track_number: Some(number),
            duration: None,
            has_art: false,
        }
    }

    fn album_a() -> AlbumKey {
        AlbumKey::new("AlbumA", "X")
    }

    fn app(dir: &TempDir, engine: FakeEngine, wrap: WrapMode) -> AppState<FakeEngine> {
        let favorites = FavoritesStore::load(dir.path().join("favorites.json"));
        let playback = PlaybackController::new(engine, 1.0, wrap);
        let mut app = AppState::new(favorites, playback);
        assert!(app.take_scan_request());
        app.finish_scan(ScanReport {
            catalog: Catalog::from_tracks(vec![
                track("track2.mp3", "T2", 2),
                track("track1.mp3", "T1", 1),
                track("track3.mp3", "T3", 3),
            ]),
            ..ScanReport::default()
        });
        app
    }

    fn finish_current(app: &mut AppState<FakeEngine>) {
        let token = app.playback.engine().token;
        app.handle_engine_event(EngineEvent::Finished { token });
    }

    fn current_title(app: &AppState<FakeEngine>) -> Option<String> {
        app.playback.current_track().map(|t| t.title.clone())
    }

    #[test]
    fn test_scan_requested_once_at_start() {
        let dir = TempDir::new().unwrap();
        let favorites = FavoritesStore::load(dir.path().join("favorites.json"));
        let playback = PlaybackController::new(FakeEngine::default(), 1.0, WrapMode::Stop);
        let mut app = AppState::new(favorites, playback);
        assert!(app.take_scan_request());
        assert!(app.is_scanning());
        assert!(!app.take_scan_request());

        app.process_action(UiAction::RefreshLibrary);
        assert!(!app.take_scan_request());
    }

    #[test]
    fn test_refresh_after_scan_requests_new_scan() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, FakeEngine::default(), WrapMode::Stop);
        assert!(!app.is_scanning());
        app.process_action(UiAction::RefreshLibrary);
        assert!(app.take_scan_request());
    }

    #[test]
    fn test_empty_scan_shows_notice() {
        let dir = TempDir::new().unwrap();
        let favorites = FavoritesStore::load(dir.path().join("favorites.json"));
        let playback = PlaybackController::new(FakeEngine::default(), 1.0, WrapMode::Stop);
        let mut app = AppState::new(favorites, playback);
        app.take_scan_request();
        app.finish_scan(ScanReport::default());
        assert_eq!(app.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Info));
    }

    #[test]
    fn test_play_track_opens_now_playing_and_auto_advances() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, FakeEngine::default(), WrapMode::Stop);
        app.process_action(UiAction::Open(Screen::AlbumList { artist: None }));
        app.process_action(UiAction::Open(Screen::AlbumDetail { album: album_a() }));

        app.process_action(UiAction::PlayTrack {
            album: album_a(),
            index: 1,
        });

        assert_eq!(app.navigation.current(), &Screen::NowPlaying);
        assert_eq!(current_title(&app).as_deref(), Some("T2"));
        assert_eq!(app.playback.status(), PlaybackStatus::Playing);

        finish_current(&mut app);
        assert_eq!(current_title(&app).as_deref(), Some("T3"));
        assert_eq!(app.playback.status(), PlaybackStatus::Playing);

        finish_current(&mut app);
        assert_eq!(app.playback.status(), PlaybackStatus::Stopped);

        app.process_action(UiAction::Back);
        assert_eq!(
            app.navigation.current(),
            &Screen::AlbumDetail { album: album_a() }
        );
    }

    #[test]
    fn test_unplayable_track_is_skipped_with_notice() {
        let dir = TempDir::new().unwrap();
        let engine = FakeEngine::failing_on(&["/m/AlbumA/track1.mp3"]);
        let mut app = app(&dir, engine, WrapMode::Stop);

        app.process_action(UiAction::PlayTrack {
            album: album_a(),
            index: 0,
        });

        assert_eq!(current_title(&app).as_deref(), Some("T2"));
        assert_eq!(app.playback.status(), PlaybackStatus::Playing);
        assert_eq!(app.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn test_failing_next_track_on_auto_advance_is_skipped() {
        let dir = TempDir::new().unwrap();
        let engine = FakeEngine::failing_on(&["/m/AlbumA/track2.mp3"]);
        let mut app = app(&dir, engine, WrapMode::Stop);
        app.process_action(UiAction::PlayTrack {
            album: album_a(),
            index: 0,
        });

        finish_current(&mut app);

        assert_eq!(current_title(&app).as_deref(), Some("T3"));
        assert_eq!(app.playback.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_all_tracks_unplayable_stops_even_when_wrapping() {
        let dir = TempDir::new().unwrap();
        let engine = FakeEngine::failing_on(&[
            "/m/AlbumA/track1.mp3",
            "/m/AlbumA/track2.mp3",
            "/m/AlbumA/track3.mp3",
        ]);
        let mut app = app(&dir, engine, WrapMode::Wrap);

        app.process_action(UiAction::PlayTrack {
            album: album_a(),
            index: 0,
        });

        assert_eq!(app.playback.status(), PlaybackStatus::Stopped);
        assert!(app.playback.engine().loads.len() <= 4);
        let notice = app.notice.unwrap();
        assert!(notice.message.contains("tracks skipped"));
    }

    #[test]
    fn test_back_on_landing_requests_exit() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, FakeEngine::default(), WrapMode::Stop);
        app.process_action(UiAction::Open(Screen::ArtistList));
        app.process_action(UiAction::Back);
        assert!(!app.exit_requested());
        app.process_action(UiAction::Back);
        assert!(app.exit_requested());
        assert_eq!(app.navigation.current(), &Screen::Landing);
    }

    #[test]
    fn test_toggle_play_pauses_and_resumes() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, FakeEngine::default(), WrapMode::Stop);
        app.process_action(UiAction::PlayTrack {
            album: album_a(),
            index: 0,
        });
        app.process_action(UiAction::TogglePlay);
        assert_eq!(app.playback.status(), PlaybackStatus::Paused);
        app.process_action(UiAction::TogglePlay);
        assert_eq!(app.playback.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_toggle_play_without_track_is_harmless() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, FakeEngine::default(), WrapMode::Stop);
        app.process_action(UiAction::TogglePlay);
        assert_eq!(app.playback.status(), PlaybackStatus::Stopped);
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_toggle_favorite_persists() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, FakeEngine::default(), WrapMode::Stop);
        app.process_action(UiAction::ToggleFavorite(album_a()));
        assert!(app.favorites.is_favorite(&album_a()));

        let reloaded = FavoritesStore::load(dir.path().join("favorites.json"));
        assert!(reloaded.is_favorite(&album_a()));
    }

    #[test]
    fn test_play_missing_album_shows_notice() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, FakeEngine::default(), WrapMode::Stop);
        app.process_action(UiAction::PlayTrack {
            album: AlbumKey::new("Gone", "Nobody"),
            index: 0,
        });
        assert_eq!(app.playback.status(), PlaybackStatus::Stopped);
        assert_eq!(app.navigation.current(), &Screen::Landing);
        assert!(app.notice.is_some());

        app.process_action(UiAction::DismissNotice);
        assert!(app.notice.is_none());
    }
}
