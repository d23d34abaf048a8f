//! Utilities for creating `rodio` sinks from files on disk.
//!
//! The helper here encapsulates opening/decoding a file and preparing a
//! paused `Sink` at the requested start position.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::error::{PlayerError, Result};

/// Create a paused `Sink` for `path` that starts playback at `start_at`.
pub(super) fn create_sink_at(
    stream: &OutputStream,
    path: &Path,
    start_at: Duration,
) -> Result<Sink> {
    let file = File::open(path).map_err(|e| PlayerError::load(path, e))?;
    let source = Decoder::new(BufReader::new(file)).map_err(|e| PlayerError::load(path, e))?;

    let sink = Sink::connect_new(stream.mixer());
    if start_at.is_zero() {
        sink.append(source);
    } else {
        // `skip_duration` is the seeking primitive for decoders that cannot seek.
        sink.append(source.skip_duration(start_at));
    }
    sink.pause();
    Ok(sink)
}
