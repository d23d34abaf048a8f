use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// The narrow set of playback primitives the player needs from an audio backend.
///
/// An engine holds at most one stream. `load` releases whatever stream was
/// held before and prepares the new one paused at position zero.
pub trait AudioEngine {
    /// Replace the current stream with `path`, paused at the start.
    fn load(&mut self, path: &Path) -> Result<()>;

    /// Start the loaded stream.
    fn play(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    /// Stop and release the loaded stream.
    fn stop(&mut self);

    /// Jump to `position` within the loaded stream.
    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Elapsed time within the loaded stream.
    fn position(&self) -> Duration;

    /// True once the loaded stream has played to its end, or when no stream
    /// is held at all.
    fn is_finished(&self) -> bool;

    /// Output volume in `[0, 1]`; applies to the current and future streams.
    fn set_volume(&mut self, volume: f32);

    /// Release everything before the process exits.
    fn shutdown(&mut self) {
        self.stop();
    }
}
