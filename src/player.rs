//! Playback state: the state machine between UI events and the audio engine.

mod state;
mod types;

pub use state::Player;
pub use types::{LoopMode, PlaybackSnapshot, PlaybackState, PlayerEvent};

#[cfg(test)]
mod tests;
