//! Music library: the `Track`/`Playlist` model and the directory scanner
//! that builds a playlist from audio files on disk.

mod display;
mod model;
mod scan;

pub use model::{Cover, Playlist, Track};
pub use scan::scan;
