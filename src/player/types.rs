//! Small types shared by the player, the UI and the MPRIS bridge.

use std::time::Duration;

use crate::config::LoopModeSetting;

/// The playback state of the player.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// What happens when a track plays to its end.
///
/// Manual next/previous always wrap around the playlist; the loop mode only
/// governs automatic advance.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LoopMode {
    /// Advance, and stop after the last track.
    NoLoop,
    /// Advance, wrapping from the last track to the first.
    #[default]
    LoopAll,
    /// Repeat the current track.
    LoopOne,
}

impl LoopMode {
    /// Cycle `NoLoop -> LoopAll -> LoopOne -> NoLoop`.
    pub fn cycle(self) -> Self {
        match self {
            Self::NoLoop => Self::LoopAll,
            Self::LoopAll => Self::LoopOne,
            Self::LoopOne => Self::NoLoop,
        }
    }
}

impl From<LoopModeSetting> for LoopMode {
    fn from(setting: LoopModeSetting) -> Self {
        match setting {
            LoopModeSetting::NoLoop => Self::NoLoop,
            LoopModeSetting::LoopAll => Self::LoopAll,
            LoopModeSetting::LoopOne => Self::LoopOne,
        }
    }
}

/// Read-only view of the player handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSnapshot {
    pub current_index: Option<usize>,
    pub state: PlaybackState,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub volume: f32,
    pub loop_mode: LoopMode,
}

impl PlaybackSnapshot {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Fraction of the track already played, when the duration is known.
    pub fn progress(&self) -> Option<f64> {
        let total = self.duration?.as_secs_f64();
        if total <= 0.0 {
            return None;
        }
        Some((self.position.as_secs_f64() / total).clamp(0.0, 1.0))
    }
}

/// Things that happened inside the player which the UI may want to surface.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TrackChanged { index: usize },
    StateChanged { state: PlaybackState },
    /// A track could not be loaded and was passed over.
    Skipped { index: usize, reason: String },
    TrackFinished { index: usize },
    /// The last track ended with `LoopMode::NoLoop`.
    PlaylistEnded,
}
