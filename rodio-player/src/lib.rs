//! This crate is an abstraction layer for the audio library [rodio]. It is
//! made for small touch screen players like [touchplayer].
//!
//! It exposes a single-track [`AudioEngine`]: the application decides what to
//! play next, the engine only opens, plays, pauses, seeks and reports when a
//! track reached its end. End-of-track notifications are sent as
//! [`EngineEvent`]s over a channel, so the receiving side can handle them on
//! its own thread.
//!
//! [rodio]: https://crates.io/crates/rodio
//! [touchplayer]: ../touchplayer/index.html

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use anyhow::{Error, anyhow};
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, info, warn};

/// Message sent by an engine from its own threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// The track opened with the given token played to its end.
    Finished { token: u64 },
}

/// Result of opening a track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedTrack {
    /// Identifies this load. `EngineEvent::Finished` carries the same token.
    pub token: u64,
    /// Duration reported by the decoder, if it knows it.
    pub duration: Option<Duration>,
}

/// Control surface of a media engine.
///
/// All calls are non-blocking. A freshly loaded track starts paused.
pub trait AudioEngine {
    fn load(&mut self, path: &Path) -> Result<LoadedTrack, Error>;
    fn play(&mut self);
    fn pause(&mut self);
    /// Stops and unloads the current track. No `Finished` event is sent for it.
    fn stop(&mut self);
    fn seek(&mut self, position: Duration) -> Result<(), Error>;
    fn position(&self) -> Duration;
    /// Volume in the range `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32);
}

impl<E: AudioEngine + ?Sized> AudioEngine for Box<E> {
    fn load(&mut self, path: &Path) -> Result<LoadedTrack, Error> {
        (**self).load(path)
    }

    fn play(&mut self) {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn seek(&mut self, position: Duration) -> Result<(), Error> {
        (**self).seek(position)
    }

    fn position(&self) -> Duration {
        (**self).position()
    }

    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }
}

/// The rodio backed engine.
pub struct RodioPlayer {
    stream: OutputStream,
    sink: Option<Arc<Sink>>,
    generation: Arc<AtomicU64>,
    volume: f32,
    event_sender: Sender<EngineEvent>,
}

impl RodioPlayer {
    /// Opens the output device called `device`, or the system default when
    /// it is `None` or cannot be found.
    pub fn new(event_sender: Sender<EngineEvent>, device: Option<&str>) -> Result<Self, Error> {
        let stream = open_stream(device)?;
        Ok(Self {
            stream,
            sink: None,
            generation: Arc::new(AtomicU64::new(0)),
            volume: 1.0,
            event_sender,
        })
    }

    fn release_sink(&mut self) {
        // Invalidate the watcher of the old sink before it wakes up.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}

impl AudioEngine for RodioPlayer {
    fn load(&mut self, path: &Path) -> Result<LoadedTrack, Error> {
        self.release_sink();

        debug!("Open file: {}", path.display());
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        let source = rodio::Decoder::builder()
            .with_seekable(true)
            .with_byte_len(metadata.len())
            .with_data(file)
            .build()
            .map_err(|error| anyhow!("Could not decode {}: {error}", path.display()))?;
        let duration = source.total_duration();
        debug!("Duration: {:?}", duration);

        let sink = Arc::new(Sink::connect_new(self.stream.mixer()));
        sink.pause();
        sink.set_volume(self.volume);
        sink.append(source);

        let token = self.generation.load(Ordering::SeqCst);
        let watched_sink = Arc::clone(&sink);
        let generation = Arc::clone(&self.generation);
        let event_sender = self.event_sender.clone();
        thread::Builder::new()
            .name("track-watch".into())
            .spawn(move || {
                watched_sink.sleep_until_end();
                if generation.load(Ordering::SeqCst) == token {
                    debug!("Play finished ...");
                    let _ = event_sender.send(EngineEvent::Finished { token });
                }
            })?;

        self.sink = Some(sink);
        Ok(LoadedTrack { token, duration })
    }

    fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn stop(&mut self) {
        self.release_sink();
    }

    fn seek(&mut self, position: Duration) -> Result<(), Error> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| anyhow!("Nothing loaded to seek in"))?;
        sink.try_seek(position)
            .map_err(|error| anyhow!("Could not seek to {position:?}: {error}"))
    }

    fn position(&self) -> Duration {
        self.sink
            .as_ref()
            .map(|sink| sink.get_pos())
            .unwrap_or(Duration::ZERO)
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }
}

impl Drop for RodioPlayer {
    fn drop(&mut self) {
        self.release_sink();
    }
}

/// Engine used when no output device could be opened. Every load fails, so
/// the application keeps running and shows why nothing plays.
#[derive(Debug, Default)]
pub struct NoOutput;

impl AudioEngine for NoOutput {
    fn load(&mut self, path: &Path) -> Result<LoadedTrack, Error> {
        Err(anyhow!(
            "No audio output device available to play {}",
            path.display()
        ))
    }

    fn play(&mut self) {}

    fn pause(&mut self) {}

    fn stop(&mut self) {}

    fn seek(&mut self, _position: Duration) -> Result<(), Error> {
        Err(anyhow!("No audio output device available"))
    }

    fn position(&self) -> Duration {
        Duration::ZERO
    }

    fn set_volume(&mut self, _volume: f32) {}
}

fn open_stream(device: Option<&str>) -> Result<OutputStream, Error> {
    if let Some(name) = device {
        match find_device(name) {
            Some(output) => match OutputStreamBuilder::from_device(output) {
                Ok(builder) => match builder.open_stream() {
                    Ok(stream) => {
                        info!("Using audio device {name}");
                        return Ok(stream);
                    }
                    Err(error) => warn!("Could not open audio device {name}: {error}"),
                },
                Err(error) => warn!("Could not configure audio device {name}: {error}"),
            },
            None => warn!("Audio device {name} not found, using default output"),
        }
    }
    OutputStreamBuilder::open_default_stream()
        .map_err(|error| anyhow!("Could not open default audio output: {error}"))
}

fn find_device(name: &str) -> Option<rodio::cpal::Device> {
    let host = rodio::cpal::default_host();
    let mut devices = host.output_devices().ok()?;
    devices.find(|device| {
        device
            .name()
            .map(|device_name| device_matches(&device_name, name))
            .unwrap_or(false)
    })
}

/// ALSA lists devices like `hw:CARD=Device,DEV=0`, configs usually say
/// `hw:1,0`. Accept an exact match or a name that starts with the wanted one.
fn device_matches(device_name: &str, wanted: &str) -> bool {
    device_name == wanted
        || device_name
            .strip_prefix(wanted)
            .is_some_and(|rest| rest.starts_with([',', ' ', ':']))
}
