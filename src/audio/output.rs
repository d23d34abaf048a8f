use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::debug;

use crate::config::AudioSettings;
use crate::error::{PlayerError, Result};

use super::engine::AudioEngine;
use super::sink::create_sink_at;

const FADE_STEPS: u64 = 20;

/// `AudioEngine` backed by the default `rodio` output device.
///
/// Owns exactly one `Sink` at a time; loading a new track stops and drops the
/// previous one first.
pub struct RodioEngine {
    stream: OutputStream,
    sink: Option<Sink>,
    current: Option<PathBuf>,
    // Start of the current sink within the file when it was rebuilt with
    // `skip_duration` (decoders without seek support).
    offset: Duration,
    volume: f32,
    quit_fade_out: Duration,
}

impl RodioEngine {
    /// Open the default output device.
    pub fn open(settings: &AudioSettings) -> Result<Self> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlayerError::AudioUnavailable(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped, which would land on top of the TUI.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            sink: None,
            current: None,
            offset: Duration::ZERO,
            volume: settings.initial_volume.clamp(0.0, 1.0),
            quit_fade_out: Duration::from_millis(settings.quit_fade_out_ms),
        })
    }

    fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.current = None;
        self.offset = Duration::ZERO;
    }

    fn fade_out(&self, sink: &Sink) {
        if self.quit_fade_out.is_zero() {
            return;
        }
        let step = (self.quit_fade_out / FADE_STEPS as u32).max(Duration::from_millis(1));
        for i in 1..=FADE_STEPS {
            let t = i as f32 / FADE_STEPS as f32;
            sink.set_volume(self.volume * (1.0 - t));
            thread::sleep(step);
        }
    }
}

impl AudioEngine for RodioEngine {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.release();
        let sink = create_sink_at(&self.stream, path, Duration::ZERO)?;
        sink.set_volume(self.volume);
        debug!(path = %path.display(), "stream loaded");
        self.sink = Some(sink);
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&mut self) {
        self.play();
    }

    fn stop(&mut self) {
        self.release();
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let (Some(sink), Some(path)) = (self.sink.as_ref(), self.current.clone()) else {
            return Ok(());
        };

        match sink.try_seek(position) {
            Ok(()) => {
                self.offset = Duration::ZERO;
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "decoder cannot seek, rebuilding sink");
                let was_paused = sink.is_paused();
                sink.stop();
                let rebuilt = match create_sink_at(&self.stream, &path, position) {
                    Ok(s) => s,
                    Err(err) => {
                        self.release();
                        return Err(err);
                    }
                };
                rebuilt.set_volume(self.volume);
                if !was_paused {
                    rebuilt.play();
                }
                self.sink = Some(rebuilt);
                self.offset = position;
                Ok(())
            }
        }
    }

    fn position(&self) -> Duration {
        self.sink
            .as_ref()
            .map(|s| self.offset + s.get_pos())
            .unwrap_or(Duration::ZERO)
    }

    fn is_finished(&self) -> bool {
        self.sink.as_ref().is_none_or(|s| s.empty())
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    fn shutdown(&mut self) {
        if let Some(sink) = &self.sink {
            if !sink.is_paused() && !sink.empty() {
                self.fade_out(sink);
            }
        }
        self.release();
    }
}

impl Drop for RodioEngine {
    fn drop(&mut self) {
        if self.sink.is_some() {
            debug!("releasing live stream on drop");
            self.release();
        }
    }
}
