use std::path::PathBuf;
use std::time::Duration;

/// Album art attached to a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cover {
    /// First picture found in the file's tags.
    Embedded { mime: Option<String>, bytes: usize },
    /// Image file next to the track (`cover.jpg`, `folder.png`, ...).
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
    pub cover: Option<Cover>,
    pub display: String,
}

/// Ordered list of tracks. The index into it identifies the current track.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }
}

impl From<Vec<Track>> for Playlist {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}
