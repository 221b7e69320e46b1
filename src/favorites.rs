use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::library::AlbumKey;

#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("Could not write favorites to {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Could not encode favorites: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize, Serialize)]
struct FavoritesFile {
    favorites: Vec<String>,
}

/// Favorite albums, persisted as `{ "favorites": ["album|artist", ...] }`.
#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    albums: Vec<AlbumKey>,
}

impl FavoritesStore {
    /// Reads the favorites file. A missing or corrupt file gives an empty set.
    pub fn load(path: PathBuf) -> Self {
        let albums = match fs::read_to_string(&path) {
            Ok(content) => parse(&path, &content),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("No favorites file at {}", path.display());
                Vec::new()
            }
            Err(error) => {
                warn!("Could not read favorites {}: {error}", path.display());
                Vec::new()
            }
        };
        info!("Loaded {} favorite albums", albums.len());
        Self { path, albums }
    }

    pub fn is_favorite(&self, album: &AlbumKey) -> bool {
        self.albums.contains(album)
    }

    /// Favorites in the order they were added.
    pub fn albums(&self) -> &[AlbumKey] {
        &self.albums
    }

    /// Flips membership of `album` and rewrites the whole file. The in-memory
    /// set changes even when writing fails. Returns the new membership.
    pub fn toggle(&mut self, album: &AlbumKey) -> Result<bool, FavoritesError> {
        let now_favorite = match self.albums.iter().position(|a| a == album) {
            Some(i) => {
                self.albums.remove(i);
                false
            }
            None => {
                self.albums.push(album.clone());
                true
            }
        };
        self.save()?;
        Ok(now_favorite)
    }

    fn save(&self) -> Result<(), FavoritesError> {
        let file = FavoritesFile {
            favorites: self.albums.iter().map(AlbumKey::to_string).collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        write_replacing(&self.path, json.as_bytes()).map_err(|source| FavoritesError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("Saved {} favorites to {}", self.albums.len(), self.path.display());
        Ok(())
    }
}

fn parse(path: &Path, content: &str) -> Vec<AlbumKey> {
    let file: FavoritesFile = match serde_json::from_str(content) {
        Ok(file) => file,
        Err(error) => {
            warn!("Ignoring corrupt favorites file {}: {error}", path.display());
            return Vec::new();
        }
    };
    let mut albums: Vec<AlbumKey> = Vec::new();
    for entry in file.favorites {
        match AlbumKey::parse(&entry) {
            Some(key) if !albums.contains(&key) => albums.push(key),
            Some(_) => {}
            None => warn!("Ignoring malformed favorite {entry:?}"),
        }
    }
    albums
}

/// Writes to a sibling temp file and renames it over `path`.
fn write_replacing(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)
}
