use tracing::debug;

use crate::library::AlbumKey;

/// A screen together with the data it displays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Root screen with the entry points to albums, artists and favorites.
    Landing,
    /// All albums, or only those of `artist`.
    AlbumList { artist: Option<String> },
    ArtistList,
    FavoritesList,
    AlbumDetail { album: AlbumKey },
    /// The current track is owned by the playback controller.
    NowPlaying,
}

impl Screen {
    pub fn title(&self) -> String {
        match self {
            Screen::Landing => "Music Player".to_string(),
            Screen::AlbumList { artist: None } => "Albums".to_string(),
            Screen::AlbumList {
                artist: Some(artist),
            } => artist.clone(),
            Screen::ArtistList => "Artists".to_string(),
            Screen::FavoritesList => "Favorites".to_string(),
            Screen::AlbumDetail { album } => album.name.clone(),
            Screen::NowPlaying => "Now Playing".to_string(),
        }
    }
}

/// Stack of visited screens. Landing is the permanent root, so the stack is
/// never empty.
#[derive(Debug)]
pub struct NavStack {
    stack: Vec<Screen>,
}

impl Default for NavStack {
    fn default() -> Self {
        Self::new()
    }
}

impl NavStack {
    pub fn new() -> Self {
        Self {
            stack: vec![Screen::Landing],
        }
    }

    /// Shows `screen` on top. Pushing `Landing` goes back to the root.
    pub fn push(&mut self, screen: Screen) {
        debug!("Navigate to {screen:?}");
        if screen == Screen::Landing {
            self.stack.truncate(1);
        } else {
            self.stack.push(screen);
        }
    }

    /// Goes back one level. Returns `false` at the root, where nothing changes.
    pub fn pop(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        self.stack.pop();
        true
    }

    pub fn current(&self) -> &Screen {
        static ROOT: Screen = Screen::Landing;
        // The root is never popped, so the fallback is unreachable.
        self.stack.last().unwrap_or(&ROOT)
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_root(&self) -> bool {
        self.stack.len() == 1
    }

    /// Pushes `NowPlaying` unless it is already shown.
    pub fn show_now_playing(&mut self) {
        if *self.current() != Screen::NowPlaying {
            self.push(Screen::NowPlaying);
        }
    }
}
