//! Application module: the app model driven by the TUI, key bindings and
//! MPRIS.
//!
//! The `App` model lives in `app::model` and holds the player, the playlist
//! cursor and the current notice.

mod model;

pub use model::*;
