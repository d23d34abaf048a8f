//! Scripted engine used by tests: records every command and lets the test
//! drive the clock.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PlayerError, Result};

use super::engine::AudioEngine;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Load(PathBuf),
    Play,
    Pause,
    Resume,
    Stop,
    Seek(Duration),
    SetVolume(f32),
}

#[derive(Debug, Default)]
pub struct FakeEngine {
    pub calls: Vec<EngineCall>,
    pub failing: HashSet<PathBuf>,
    pub finished: bool,
    /// Make `seek` drop the stream and fail, like a file vanishing mid-play.
    pub failing_seek: bool,
    loaded: Option<PathBuf>,
    running: bool,
    position: Duration,
}

impl FakeEngine {
    pub fn failing_on(paths: &[&str]) -> Self {
        Self {
            failing: paths.iter().map(PathBuf::from).collect(),
            ..Self::default()
        }
    }

    /// Let `by` of audio play, if the stream is running.
    pub fn advance(&mut self, by: Duration) {
        if self.running {
            self.position += by;
        }
    }

    pub fn loaded(&self) -> Option<&Path> {
        self.loaded.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl AudioEngine for FakeEngine {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.calls.push(EngineCall::Load(path.to_path_buf()));
        self.loaded = None;
        self.running = false;
        self.position = Duration::ZERO;
        self.finished = false;
        if self.failing.contains(path) {
            return Err(PlayerError::load(path, "unsupported format"));
        }
        self.loaded = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self) {
        self.calls.push(EngineCall::Play);
        self.running = self.loaded.is_some();
    }

    fn pause(&mut self) {
        self.calls.push(EngineCall::Pause);
        self.running = false;
    }

    fn resume(&mut self) {
        self.calls.push(EngineCall::Resume);
        self.running = self.loaded.is_some();
    }

    fn stop(&mut self) {
        self.calls.push(EngineCall::Stop);
        self.loaded = None;
        self.running = false;
        self.position = Duration::ZERO;
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        self.calls.push(EngineCall::Seek(position));
        if self.failing_seek {
            let path = self.loaded.take().unwrap_or_default();
            self.running = false;
            self.position = Duration::ZERO;
            return Err(PlayerError::load(path, "stream vanished"));
        }
        self.position = position;
        Ok(())
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn set_volume(&mut self, volume: f32) {
        self.calls.push(EngineCall::SetVolume(volume));
    }
}
