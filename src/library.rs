use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// A playable file with its metadata, resolved once at scan time.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub track_number: Option<u32>,
    pub duration: Option<Duration>,
    /// The file carries an embedded picture, see [`read_embedded_art`].
    pub has_art: bool,
}

impl Track {
    /// Track with fallback metadata derived from the file name.
    pub fn untagged(path: &Path) -> Self {
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().trim().to_string())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self {
            path: path.to_path_buf(),
            title,
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            track_number: None,
            duration: None,
            has_art: false,
        }
    }

    pub fn album_key(&self) -> AlbumKey {
        AlbumKey::new(&self.album, &self.artist)
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// Albums have no stable id, so they are identified by name and artist.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlbumKey {
    pub name: String,
    pub artist: String,
}

impl AlbumKey {
    pub fn new(name: &str, artist: &str) -> Self {
        Self {
            name: name.to_string(),
            artist: artist.to_string(),
        }
    }

    /// Parses the `album|artist` form used in the favorites file. A `|` or
    /// `\\` inside a part is escaped with a backslash.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = vec![String::new()];
        let mut chars = value.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => parts.last_mut()?.push(chars.next()?),
                '|' => parts.push(String::new()),
                c => parts.last_mut()?.push(c),
            }
        }
        match parts.as_slice() {
            [name, artist] if !name.is_empty() && !artist.is_empty() => {
                Some(Self::new(name, artist))
            }
            _ => None,
        }
    }
}

fn escape_key_part(part: &str) -> String {
    part.replace('\\', "\\\\").replace('|', "\\|")
}

impl fmt::Display for AlbumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}",
            escape_key_part(&self.name),
            escape_key_part(&self.artist)
        )
    }
}

#[derive(Clone, Debug)]
pub struct Album {
    pub key: AlbumKey,
    /// Ordered by track number, ties broken by file name.
    pub tracks: Vec<Track>,
    /// First track in album order with embedded art.
    pub art: Option<PathBuf>,
}

impl Album {
    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn artist(&self) -> &str {
        &self.key.artist
    }
}

#[derive(Clone, Debug)]
pub struct Artist {
    pub name: String,
    pub albums: Vec<AlbumKey>,
}

/// Albums and artists derived from a set of tracks.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    albums: Vec<Album>,
    artists: Vec<Artist>,
    album_index: HashMap<AlbumKey, usize>,
}

impl Catalog {
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut grouped: BTreeMap<AlbumKey, Vec<Track>> = BTreeMap::new();
        for track in tracks {
            grouped.entry(track.album_key()).or_default().push(track);
        }

        let mut albums: Vec<Album> = grouped
            .into_iter()
            .map(|(key, mut tracks)| {
                tracks.sort_by_cached_key(|track| {
                    (
                        track.track_number.is_none(),
                        track.track_number,
                        track.file_name(),
                    )
                });
                let art = tracks
                    .iter()
                    .find(|track| track.has_art)
                    .map(|track| track.path.clone());
                Album { key, tracks, art }
            })
            .collect();
        albums.sort_by_cached_key(|album| {
            (
                album.key.name.to_lowercase(),
                album.key.artist.to_lowercase(),
            )
        });

        let mut by_artist: BTreeMap<String, Vec<AlbumKey>> = BTreeMap::new();
        for album in &albums {
            by_artist
                .entry(album.key.artist.clone())
                .or_default()
                .push(album.key.clone());
        }
        let mut artists: Vec<Artist> = by_artist
            .into_iter()
            .map(|(name, albums)| Artist { name, albums })
            .collect();
        artists.sort_by_cached_key(|artist| artist.name.to_lowercase());

        let album_index = albums
            .iter()
            .enumerate()
            .map(|(i, album)| (album.key.clone(), i))
            .collect();

        Self {
            albums,
            artists,
            album_index,
        }
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn artists(&self) -> &[Artist] {
        &self.artists
    }

    pub fn album(&self, key: &AlbumKey) -> Option<&Album> {
        self.album_index.get(key).map(|&i| &self.albums[i])
    }

    pub fn albums_by(&self, artist: &str) -> Vec<&Album> {
        self.artists
            .iter()
            .find(|a| a.name == artist)
            .map(|a| a.albums.iter().filter_map(|key| self.album(key)).collect())
            .unwrap_or_default()
    }

    pub fn track_count(&self) -> usize {
        self.albums.iter().map(|album| album.tracks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }
}

/// A directory entry the scan had to skip.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Library root {0} is not a directory")]
    MissingRoot(PathBuf),
    #[error("Could not read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

#[derive(Clone, Debug)]
pub struct ScanOptions {
    pub root: PathBuf,
    pub follow_links: bool,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub catalog: Catalog,
    pub errors: Vec<ScanError>,
    /// Files that had no usable tags and got fallback metadata.
    pub untagged: usize,
}

pub fn scan(options: &ScanOptions) -> ScanReport {
    let root = &options.root;
    if !root.is_dir() {
        warn!("Library root {} is not a directory", root.display());
        return ScanReport {
            errors: vec![ScanError::MissingRoot(root.clone())],
            ..ScanReport::default()
        };
    }

    let mut tracks: Vec<Track> = Vec::new();
    let mut errors: Vec<ScanError> = Vec::new();
    let mut untagged = 0;

    for entry in WalkDir::new(root).follow_links(options.follow_links) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                let path = error.path().unwrap_or(root).to_path_buf();
                warn!("Skipping {}: {error}", path.display());
                errors.push(ScanError::Unreadable {
                    path,
                    reason: error.to_string(),
                });
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_supported_extension(path) {
            continue;
        }
        match read_track(path) {
            Ok(track) => tracks.push(track),
            Err(reason) => {
                warn!("Using fallback metadata for {}: {reason}", path.display());
                untagged += 1;
                tracks.push(Track::untagged(path));
            }
        }
    }

    ScanReport {
        catalog: Catalog::from_tracks(tracks),
        errors,
        untagged,
    }
}

/// Runs [`scan`] on its own thread and sends the report when done.
pub fn spawn_scan(
    options: ScanOptions,
    sender: Sender<ScanReport>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("library-scan".into())
        .spawn(move || {
            info!("Starting scan of {} ...", options.root.display());
            let started = Instant::now();
            let report = scan(&options);
            info!(
                "Scan finished in {:?}: {} tracks, {} albums, {} artists, {} untagged, {} skipped",
                started.elapsed(),
                report.catalog.track_count(),
                report.catalog.albums().len(),
                report.catalog.artists().len(),
                report.untagged,
                report.errors.len()
            );
            let _ = sender.send(report);
        })
}

fn is_supported_extension(path: &Path) -> bool {
    matches!(
        path.extension()
            .unwrap_or_default()
            .to_ascii_lowercase()
            .to_str(),
        Some("flac") | Some("mp3") | Some("m4a") | Some("ogg")
    )
}

fn non_empty(value: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads the tags of one file. Missing single fields fall back individually,
/// an unreadable file or one without any tag is an error.
fn read_track(path: &Path) -> Result<Track, String> {
    let tagged_file = lofty::read_from_path(path).map_err(|error| error.to_string())?;
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .ok_or_else(|| "no tag found".to_string())?;

    let fallback = Track::untagged(path);
    let duration = tagged_file.properties().duration();
    let track = Track {
        path: path.to_path_buf(),
        title: non_empty(tag.title()).unwrap_or(fallback.title),
        artist: non_empty(tag.artist()).unwrap_or(fallback.artist),
        album: non_empty(tag.album()).unwrap_or(fallback.album),
        track_number: tag.track().filter(|&n| n > 0),
        duration: (!duration.is_zero()).then_some(duration),
        has_art: !tag.pictures().is_empty(),
    };
    debug!("Read {}: {} - {}", path.display(), track.artist, track.title);
    Ok(track)
}

/// Loads the bytes of the first embedded picture of `path`.
pub fn read_embedded_art(path: &Path) -> Option<Vec<u8>> {
    let tagged_file = match lofty::read_from_path(path) {
        Ok(file) => file,
        Err(error) => {
            debug!("No art from {}: {error}", path.display());
            return None;
        }
    };
    tagged_file
        .tags()
        .iter()
        .find_map(|tag| tag.pictures().first())
        .map(|picture| picture.data().to_vec())
}
