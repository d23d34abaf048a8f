//! Error types for playback commands.
//!
//! Every variant is recoverable from the app's point of view: the runtime
//! turns them into notices instead of exiting.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    /// The audio output could not be opened. Playback stays disabled for the
    /// whole session, browsing keeps working.
    #[error("audio unavailable: {0}")]
    AudioUnavailable(String),

    /// A track could not be opened or decoded.
    #[error("cannot load {}: {reason}", path.display())]
    AudioLoad { path: PathBuf, reason: String },

    #[error("playlist is empty")]
    EmptyPlaylist,

    #[error("track {index} is out of range (playlist has {len} tracks)")]
    TrackOutOfRange { index: usize, len: usize },
}

impl PlayerError {
    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::AudioLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
