use std::path::PathBuf;

use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub favorites: FavoritesConfig,
    pub audio: AudioConfig,
    pub ui: UiConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub root: PathBuf,
    pub follow_links: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: default_music_dir(),
            follow_links: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FavoritesConfig {
    pub path: PathBuf,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            path: home_dir().join(".touchplayer_favorites.json"),
        }
    }
}

/// What `next`/`previous` do at the ends of an album.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    /// Stop after the last track, stay on the first one.
    #[default]
    Stop,
    /// Continue at the other end of the album.
    Wrap,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub start_volume: u8,
    pub wrap: WrapMode,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: Some("hw:1,0".to_string()),
            start_volume: 80,
            wrap: WrapMode::Stop,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub fullscreen: bool,
    /// Overrides the widget scale derived from the display width.
    pub scale: Option<f32>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            fullscreen: true,
            scale: None,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::new("config", config::FileFormat::Json).required(false))
            .add_source(
                config::File::new("/etc/touchplayer/config", config::FileFormat::Json)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix("TOUCHPLAYER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }

    /// Initial volume as a factor in `0.0..=1.0`.
    pub fn start_volume(&self) -> f32 {
        f32::from(self.audio.start_volume.min(100)) / 100.0
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_music_dir() -> PathBuf {
    dirs::audio_dir().unwrap_or_else(|| home_dir().join("Music"))
}
