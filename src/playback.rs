use std::path::PathBuf;
use std::time::Duration;

use rodio_player::{AudioEngine, LoadedTrack};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::WrapMode;
use crate::library::Track;

/// `previous` restarts the current track instead when it played longer than this.
const RESTART_THRESHOLD: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackStatus {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Could not play {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
    #[error("No track loaded")]
    NoTrack,
    #[error("Seeking failed: {0}")]
    Seek(String),
}

/// Snapshot of the player for rendering.
#[derive(Clone, Debug)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub track: Option<Track>,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub volume: f32,
}

/// Owns the engine and the play queue, which is the track order of the album
/// playback was started from.
pub struct PlaybackController<E: AudioEngine> {
    engine: E,
    queue: Vec<Track>,
    index: Option<usize>,
    loaded: Option<LoadedTrack>,
    status: PlaybackStatus,
    volume: f32,
    wrap: WrapMode,
}

impl<E: AudioEngine> PlaybackController<E> {
    pub fn new(mut engine: E, volume: f32, wrap: WrapMode) -> Self {
        let volume = volume.clamp(0.0, 1.0);
        engine.set_volume(volume);
        Self {
            engine,
            queue: Vec::new(),
            index: None,
            loaded: None,
            status: PlaybackStatus::Stopped,
            volume,
            wrap,
        }
    }

    /// Replaces the play queue. Whatever played before is stopped.
    pub fn set_queue(&mut self, tracks: Vec<Track>) {
        self.stop();
        self.queue = tracks;
        self.index = None;
    }

    /// Opens `track` without starting it. A track that is not part of the
    /// queue becomes a queue of its own.
    pub fn load(&mut self, track: &Track) -> Result<(), PlaybackError> {
        let index = match self.queue.iter().position(|t| t.path == track.path) {
            Some(index) => index,
            None => {
                self.queue = vec![track.clone()];
                0
            }
        };
        self.load_index(index)
    }

    fn load_index(&mut self, index: usize) -> Result<(), PlaybackError> {
        self.engine.stop();
        self.loaded = None;
        self.status = PlaybackStatus::Stopped;
        self.index = Some(index);

        let track = &self.queue[index];
        match self.engine.load(&track.path) {
            Ok(loaded) => {
                info!("Loaded {} - {}", track.artist, track.title);
                self.loaded = Some(loaded);
                Ok(())
            }
            Err(reason) => {
                error!("Could not load {}: {reason}", track.path.display());
                Err(PlaybackError::Load {
                    path: track.path.clone(),
                    reason: reason.to_string(),
                })
            }
        }
    }

    pub fn play(&mut self) -> Result<(), PlaybackError> {
        match self.status {
            PlaybackStatus::Playing => return Ok(()),
            PlaybackStatus::Paused => {}
            PlaybackStatus::Stopped => {
                if self.loaded.is_none() {
                    let index = self.index.ok_or(PlaybackError::NoTrack)?;
                    self.load_index(index)?;
                }
            }
        }
        self.engine.play();
        self.status = PlaybackStatus::Playing;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.status == PlaybackStatus::Playing {
            self.engine.pause();
            self.status = PlaybackStatus::Paused;
        }
    }

    pub fn toggle(&mut self) -> Result<(), PlaybackError> {
        match self.status {
            PlaybackStatus::Playing => {
                self.pause();
                Ok(())
            }
            PlaybackStatus::Paused | PlaybackStatus::Stopped => self.play(),
        }
    }

    /// Stops and rewinds. The current track stays selected, `play` starts it
    /// again from the beginning.
    pub fn stop(&mut self) {
        self.engine.stop();
        self.loaded = None;
        self.status = PlaybackStatus::Stopped;
    }

    /// Plays the following track. Returns `false` and stops when the end of
    /// the queue is reached and wrapping is off.
    pub fn next(&mut self) -> Result<bool, PlaybackError> {
        let index = self.index.ok_or(PlaybackError::NoTrack)?;
        let target = if index + 1 < self.queue.len() {
            Some(index + 1)
        } else if self.wrap == WrapMode::Wrap && !self.queue.is_empty() {
            Some(0)
        } else {
            None
        };
        match target {
            Some(target) => {
                self.load_index(target)?;
                self.play()?;
                Ok(true)
            }
            None => {
                debug!("End of queue reached");
                self.stop();
                Ok(false)
            }
        }
    }

    /// Plays the preceding track, or restarts the current one when it is the
    /// first (without wrapping) or already played for a few seconds.
    pub fn previous(&mut self) -> Result<(), PlaybackError> {
        let index = self.index.ok_or(PlaybackError::NoTrack)?;
        if self.loaded.is_some() && self.engine.position() > RESTART_THRESHOLD {
            return self.restart();
        }
        let target = if index > 0 {
            index - 1
        } else if self.wrap == WrapMode::Wrap {
            self.queue.len().saturating_sub(1)
        } else {
            index
        };
        self.load_index(target)?;
        self.play()
    }

    fn restart(&mut self) -> Result<(), PlaybackError> {
        self.seek(Duration::ZERO)?;
        self.play()
    }

    pub fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        if self.status == PlaybackStatus::Stopped || self.loaded.is_none() {
            return Err(PlaybackError::NoTrack);
        }
        let position = match self.duration() {
            Some(duration) => position.min(duration),
            None => position,
        };
        self.engine
            .seek(position)
            .map_err(|error| PlaybackError::Seek(error.to_string()))
    }

    /// Handles the engine's end-of-track notification. Notifications for a
    /// track that is no longer loaded are ignored.
    pub fn on_track_finished(&mut self, token: u64) -> Result<bool, PlaybackError> {
        let current = self.loaded.as_ref().map(|loaded| loaded.token);
        if current != Some(token) || self.status != PlaybackStatus::Playing {
            debug!("Ignoring end of stale track {token}");
            return Ok(false);
        }
        self.next()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn position(&self) -> Duration {
        if self.status == PlaybackStatus::Stopped {
            return Duration::ZERO;
        }
        let position = self.engine.position();
        match self.duration() {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.loaded
            .as_ref()
            .and_then(|loaded| loaded.duration)
            .or_else(|| self.current_track().and_then(|track| track.duration))
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.index.and_then(|index| self.queue.get(index))
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.engine.set_volume(self.volume);
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            status: self.status,
            track: self.current_track().cloned(),
            position: self.position(),
            duration: self.duration(),
            volume: self.volume,
        }
    }

    #[cfg(test)]
    pub(crate) fn engine(&self) -> &E {
        &self.engine
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FakeEngine, TRACK_LENGTH};
    use super::*;

    fn track(path: &str, title: &str, number: u32) -> Track {
        Track {
            path: PathBuf::from(path),
            title: title.to_string(),
            artist: "X".to_string(),
            album: "AlbumA".to_string(),
            track_number: Some(number),
            duration: None,
            has_art: false,
        }
    }

    fn album() -> Vec<Track> {
        vec![
            track("/m/AlbumA/track1.mp3", "T1", 1),
            track("/m/AlbumA/track2.mp3", "T2", 2),
        ]
    }

    fn controller(engine: FakeEngine, wrap: WrapMode) -> PlaybackController<FakeEngine> {
        let mut controller = PlaybackController::new(engine, 0.8, wrap);
        controller.set_queue(album());
        controller
    }

    fn current_title(controller: &PlaybackController<FakeEngine>) -> &str {
        controller.current_track().map(|t| t.title.as_str()).unwrap()
    }

    fn token(controller: &PlaybackController<FakeEngine>) -> u64 {
        controller.engine().token
    }

    #[test]
    fn test_starts_stopped_without_track() {
        let controller = PlaybackController::new(FakeEngine::default(), 0.5, WrapMode::Stop);
        assert_eq!(controller.status(), PlaybackStatus::Stopped);
        assert!(controller.current_track().is_none());
        assert_eq!(controller.position(), Duration::ZERO);
        assert_eq!(controller.engine().volume, 0.5);
    }

    #[test]
    fn test_play_pause_stop_cycle() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.load(&album()[0]).unwrap();
        controller.play().unwrap();
        assert_eq!(controller.status(), PlaybackStatus::Playing);
        assert!(controller.engine().playing);

        controller.pause();
        assert_eq!(controller.status(), PlaybackStatus::Paused);
        assert!(!controller.engine().playing);

        controller.play().unwrap();
        assert_eq!(controller.status(), PlaybackStatus::Playing);

        controller.seek(Duration::from_secs(42)).unwrap();
        assert_eq!(controller.position(), Duration::from_secs(42));

        controller.stop();
        assert_eq!(controller.status(), PlaybackStatus::Stopped);
        assert_eq!(controller.position(), Duration::ZERO);
    }

    #[test]
    fn test_play_after_stop_restarts_current_track() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.load(&album()[1]).unwrap();
        controller.play().unwrap();
        controller.stop();

        controller.play().unwrap();

        assert_eq!(controller.status(), PlaybackStatus::Playing);
        assert_eq!(current_title(&controller), "T2");
        assert_eq!(controller.engine().loads.len(), 2);
    }

    #[test]
    fn test_play_without_track_is_rejected() {
        let mut controller = PlaybackController::new(FakeEngine::default(), 1.0, WrapMode::Stop);
        assert!(matches!(controller.play(), Err(PlaybackError::NoTrack)));
        assert_eq!(controller.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_seek_when_stopped_is_rejected() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.load(&album()[0]).unwrap();
        assert!(matches!(
            controller.seek(Duration::from_secs(10)),
            Err(PlaybackError::NoTrack)
        ));
        assert_eq!(controller.status(), PlaybackStatus::Stopped);
        assert_eq!(controller.position(), Duration::ZERO);
    }

    #[test]
    fn test_seek_is_clamped_to_duration() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.load(&album()[0]).unwrap();
        controller.play().unwrap();
        controller.seek(Duration::from_secs(999)).unwrap();
        assert_eq!(controller.position(), TRACK_LENGTH);
    }

    #[test]
    fn test_end_of_track_advances_then_stops_at_album_end() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.load(&album()[0]).unwrap();
        controller.play().unwrap();

        assert!(controller.on_track_finished(token(&controller)).unwrap());
        assert_eq!(current_title(&controller), "T2");
        assert_eq!(controller.status(), PlaybackStatus::Playing);

        assert!(!controller.on_track_finished(token(&controller)).unwrap());
        assert_eq!(controller.status(), PlaybackStatus::Stopped);
        assert_eq!(controller.position(), Duration::ZERO);
    }

    #[test]
    fn test_end_of_track_wraps_when_configured() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Wrap);
        controller.load(&album()[1]).unwrap();
        controller.play().unwrap();

        assert!(controller.on_track_finished(token(&controller)).unwrap());
        assert_eq!(current_title(&controller), "T1");
        assert_eq!(controller.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_stale_end_of_track_is_ignored() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.load(&album()[0]).unwrap();
        controller.play().unwrap();
        let stale = token(&controller);
        controller.next().unwrap();

        assert!(!controller.on_track_finished(stale).unwrap());
        assert_eq!(current_title(&controller), "T2");
        assert_eq!(controller.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_end_of_track_while_paused_is_ignored() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.load(&album()[0]).unwrap();
        controller.play().unwrap();
        controller.pause();

        assert!(!controller.on_track_finished(token(&controller)).unwrap());
        assert_eq!(controller.status(), PlaybackStatus::Paused);
        assert_eq!(current_title(&controller), "T1");
    }

    #[test]
    fn test_previous_on_first_track_restarts_it() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.load(&album()[0]).unwrap();
        controller.play().unwrap();

        controller.previous().unwrap();

        assert_eq!(current_title(&controller), "T1");
        assert_eq!(controller.status(), PlaybackStatus::Playing);
        assert_eq!(controller.position(), Duration::ZERO);
    }

    #[test]
    fn test_previous_goes_back_early_in_track() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.load(&album()[1]).unwrap();
        controller.play().unwrap();
        controller.seek(Duration::from_secs(2)).unwrap();

        controller.previous().unwrap();

        assert_eq!(current_title(&controller), "T1");
    }

    #[test]
    fn test_previous_late_in_track_restarts_it() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.load(&album()[1]).unwrap();
        controller.play().unwrap();
        controller.seek(Duration::from_secs(30)).unwrap();

        controller.previous().unwrap();

        assert_eq!(current_title(&controller), "T2");
        assert_eq!(controller.position(), Duration::ZERO);
        assert_eq!(controller.engine().loads.len(), 1);
    }

    #[test]
    fn test_previous_wraps_to_last_track() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Wrap);
        controller.load(&album()[0]).unwrap();
        controller.play().unwrap();

        controller.previous().unwrap();

        assert_eq!(current_title(&controller), "T2");
    }

    #[test]
    fn test_load_failure_is_reported_and_not_silent() {
        let engine = FakeEngine::failing_on(&["/m/AlbumA/track2.mp3"]);
        let mut controller = controller(engine, WrapMode::Stop);
        controller.load(&album()[0]).unwrap();
        controller.play().unwrap();

        let result = controller.next();

        assert!(matches!(result, Err(PlaybackError::Load { .. })));
        assert_eq!(controller.status(), PlaybackStatus::Stopped);
        assert_eq!(current_title(&controller), "T2");
        assert!(controller.engine().loaded.is_none());
    }

    #[test]
    fn test_load_outside_queue_becomes_single_track_queue() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        let single = track("/m/Other/solo.mp3", "Solo", 1);
        controller.load(&single).unwrap();
        controller.play().unwrap();

        assert_eq!(controller.queue_len(), 1);
        assert!(!controller.next().unwrap());
        assert_eq!(controller.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_volume_is_clamped_and_forwarded() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.set_volume(1.5);
        assert_eq!(controller.volume(), 1.0);
        assert_eq!(controller.engine().volume, 1.0);
    }

    #[test]
    fn test_state_snapshot() {
        let mut controller = controller(FakeEngine::default(), WrapMode::Stop);
        controller.load(&album()[0]).unwrap();
        controller.play().unwrap();
        let state = controller.state();
        assert_eq!(state.status, PlaybackStatus::Playing);
        assert_eq!(state.track.map(|t| t.title), Some("T1".to_string()));
        assert_eq!(state.duration, Some(TRACK_LENGTH));
        assert_eq!(state.volume, 0.8);
    }
}
