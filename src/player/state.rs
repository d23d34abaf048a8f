//! The playback state machine.
//!
//! `Player` owns the playlist, the audio engine and the playback state. It is
//! the only place where engine commands are issued, so every transition can
//! keep the engine and the recorded state in step.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::AudioEngine;
use crate::error::{PlayerError, Result};
use crate::library::{Playlist, Track};

use super::types::{LoopMode, PlaybackSnapshot, PlaybackState, PlayerEvent};

pub struct Player<E: AudioEngine> {
    playlist: Playlist,
    engine: Option<E>,
    unavailable: Option<String>,

    current: Option<usize>,
    state: PlaybackState,
    position: Duration,
    volume: f32,
    loop_mode: LoopMode,

    // Whether the engine currently holds a stream for `current`.
    loaded: bool,
    events: Vec<PlayerEvent>,
}

impl<E: AudioEngine> Player<E> {
    /// Build a player from the result of opening the audio engine.
    ///
    /// A failed engine puts the player in degraded mode: selection keeps
    /// working, playback commands fail with `AudioUnavailable`.
    pub fn new(playlist: Playlist, engine: Result<E>) -> Self {
        let (engine, unavailable) = match engine {
            Ok(e) => (Some(e), None),
            Err(PlayerError::AudioUnavailable(reason)) => (None, Some(reason)),
            Err(other) => (None, Some(other.to_string())),
        };
        if let Some(reason) = &unavailable {
            warn!(%reason, "audio unavailable, playback disabled");
        }

        Self {
            playlist,
            engine,
            unavailable,
            current: None,
            state: PlaybackState::Stopped,
            position: Duration::ZERO,
            volume: 1.0,
            loop_mode: LoopMode::default(),
            loaded: false,
            events: Vec::new(),
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    /// Reason the engine failed to open, if the player runs degraded.
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.engine.is_none()
    }

    /// Whether transport commands can do anything at all.
    pub fn transport_enabled(&self) -> bool {
        !self.is_degraded() && !self.playlist.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.playlist.get(i))
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            current_index: self.current,
            state: self.state,
            position: self.position,
            duration: self.current_duration(),
            volume: self.volume,
            loop_mode: self.loop_mode,
        }
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Make `index` the current track and load it, without starting playback.
    pub fn select(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        let previous = self.current;

        self.current = Some(index);
        self.position = Duration::ZERO;
        self.set_state(PlaybackState::Stopped);
        self.note_track_change(previous);

        if self.engine.is_none() {
            self.loaded = false;
            return Ok(());
        }
        self.load_current()
    }

    /// Start `index` from the beginning. A track that fails to load is
    /// skipped forward, like auto-advance does.
    pub fn play_track(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        if self.is_degraded() {
            self.select(index)?;
            return self.require_engine().map(|_| ());
        }
        self.change_track(index, true, true)
    }

    /// Start or resume playback. Selects the first track if nothing is selected.
    pub fn play(&mut self) -> Result<()> {
        self.require_engine()?;
        if self.playlist.is_empty() {
            return Err(PlayerError::EmptyPlaylist);
        }

        match self.state {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Paused => {
                self.require_engine()?.resume();
                self.set_state(PlaybackState::Playing);
                Ok(())
            }
            PlaybackState::Stopped => {
                if self.current.is_none() {
                    return self.change_track(0, true, true);
                }
                if !self.loaded {
                    if let Err(err) = self.load_current() {
                        return self.skip_current(err);
                    }
                    if !self.position.is_zero() {
                        let at = self.position;
                        self.engine_seek(at)?;
                    }
                }
                self.require_engine()?.play();
                self.set_state(PlaybackState::Playing);
                Ok(())
            }
        }
    }

    /// Pause playback, freezing the position. No-op unless playing.
    pub fn pause(&mut self) -> Result<()> {
        self.require_engine()?;
        if self.state != PlaybackState::Playing {
            return Ok(());
        }

        let engine = self.require_engine()?;
        engine.pause();
        let at = engine.position();
        self.position = self.clamp_to_track(at);
        self.set_state(PlaybackState::Paused);
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused | PlaybackState::Stopped => self.play(),
        }
    }

    /// Stop playback and release the engine stream. The selection is kept.
    pub fn stop(&mut self) -> Result<()> {
        self.require_engine()?;
        if self.state == PlaybackState::Stopped && !self.loaded && self.position.is_zero() {
            return Ok(());
        }
        self.release_stream();
        Ok(())
    }

    pub fn next(&mut self) -> Result<()> {
        self.step(true)
    }

    pub fn previous(&mut self) -> Result<()> {
        self.step(false)
    }

    /// Jump to `target`, clamped to the current track's bounds.
    pub fn seek(&mut self, target: Duration) -> Result<()> {
        self.require_engine()?;
        if self.playlist.is_empty() {
            return Err(PlayerError::EmptyPlaylist);
        }
        if self.current.is_none() {
            return Ok(());
        }

        let target = self.clamp_to_track(target);
        if self.loaded {
            self.engine_seek(target)?;
        }
        self.position = target;
        debug!(position = ?target, "seek");
        Ok(())
    }

    /// Seek relative to the current position by `delta_secs` seconds.
    pub fn seek_by(&mut self, delta_secs: i64) -> Result<()> {
        self.seek_by_micros(delta_secs.saturating_mul(1_000_000))
    }

    /// Seek relative to the current position by `delta_micros` microseconds.
    ///
    /// While playing, the base is the engine clock rather than the last
    /// polled position.
    pub fn seek_by_micros(&mut self, delta_micros: i64) -> Result<()> {
        let base = match (self.state, self.engine.as_ref()) {
            (PlaybackState::Playing, Some(engine)) => engine.position(),
            _ => self.position,
        };
        let delta = Duration::from_micros(delta_micros.unsigned_abs());
        let target = if delta_micros >= 0 {
            base.saturating_add(delta)
        } else {
            base.saturating_sub(delta)
        };
        self.seek(target)
    }

    /// Set the output volume, clamped to `[0, 1]`.
    ///
    /// The level is remembered in degraded mode too.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.volume = volume;
        if let Some(engine) = self.engine.as_mut() {
            engine.set_volume(volume);
        }
    }

    /// Poll the engine for the elapsed time and run the end-of-track
    /// transition when the current track is over. Call once per UI refresh.
    pub fn tick(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Ok(());
        }
        let Some(engine) = self.engine.as_ref() else {
            return Ok(());
        };

        let at = engine.position();
        let finished = engine.is_finished();
        self.position = self.clamp_to_track(at);

        let reached_end = self.current_duration().is_some_and(|d| at >= d);
        if reached_end || finished {
            self.on_track_end()
        } else {
            Ok(())
        }
    }

    /// Release the engine before exiting.
    pub fn shutdown(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.shutdown();
        }
        self.loaded = false;
        self.set_state(PlaybackState::Stopped);
    }

    fn on_track_end(&mut self) -> Result<()> {
        let Some(index) = self.current else {
            return Ok(());
        };
        self.events.push(PlayerEvent::TrackFinished { index });
        let len = self.playlist.len();

        match self.loop_mode {
            LoopMode::LoopOne => self.change_track(index, true, true),
            LoopMode::LoopAll => self.change_track(neighbour(index, len, true), true, true),
            LoopMode::NoLoop if index + 1 >= len => {
                info!("end of playlist");
                self.release_stream();
                self.events.push(PlayerEvent::PlaylistEnded);
                Ok(())
            }
            LoopMode::NoLoop => self.change_track(index + 1, true, true),
        }
    }

    fn step(&mut self, forward: bool) -> Result<()> {
        let len = self.playlist.len();
        if len == 0 {
            return Err(PlayerError::EmptyPlaylist);
        }

        let target = match self.current {
            Some(i) => neighbour(i, len, forward),
            None if forward => 0,
            None => len - 1,
        };
        let resume = self.state == PlaybackState::Playing;
        self.change_track(target, resume, forward)
    }

    /// Move to `start` and load it, skipping over tracks that fail to load in
    /// the given direction. Each track is tried at most once.
    fn change_track(&mut self, start: usize, resume: bool, forward: bool) -> Result<()> {
        if self.engine.is_none() {
            let previous = self.current;
            self.current = Some(start);
            self.position = Duration::ZERO;
            self.set_state(PlaybackState::Stopped);
            self.note_track_change(previous);
            return Ok(());
        }
        let len = self.playlist.len();
        self.try_tracks(start, len, start, resume, forward)
    }

    /// The current track failed to load on `play`: report it and start the
    /// next track that loads. Stays on the current track if none does.
    fn skip_current(&mut self, err: PlayerError) -> Result<()> {
        let Some(index) = self.current else {
            return Err(err);
        };
        self.note_skip(index, &err);
        let len = self.playlist.len();
        if len <= 1 {
            self.position = Duration::ZERO;
            self.set_state(PlaybackState::Stopped);
            return Err(err);
        }
        self.try_tracks(neighbour(index, len, true), len - 1, index, true, true)
    }

    /// Try up to `attempts` tracks from `start`. When all of them fail the
    /// player stops on `home`.
    fn try_tracks(
        &mut self,
        start: usize,
        attempts: usize,
        home: usize,
        resume: bool,
        forward: bool,
    ) -> Result<()> {
        let previous = self.current;
        let len = self.playlist.len();
        self.position = Duration::ZERO;

        let mut index = start;
        let mut last_err = None;
        for _ in 0..attempts {
            self.current = Some(index);
            match self.load_current() {
                Ok(()) => {
                    if resume {
                        self.require_engine()?.play();
                        self.set_state(PlaybackState::Playing);
                    } else {
                        self.set_state(PlaybackState::Stopped);
                    }
                    self.note_track_change(previous);
                    return Ok(());
                }
                Err(err) => {
                    self.note_skip(index, &err);
                    last_err = Some(err);
                    index = neighbour(index, len, forward);
                }
            }
        }

        self.current = Some(home);
        self.set_state(PlaybackState::Stopped);
        self.note_track_change(previous);
        Err(last_err.unwrap_or(PlayerError::EmptyPlaylist))
    }

    fn note_skip(&mut self, index: usize, err: &PlayerError) {
        warn!(index, error = %err, "skipping unplayable track");
        self.events.push(PlayerEvent::Skipped {
            index,
            reason: err.to_string(),
        });
    }

    fn load_current(&mut self) -> Result<()> {
        let Some(path) = self.current_track().map(|t| t.path.clone()) else {
            return Ok(());
        };
        let result = self.require_engine()?.load(&path);
        self.loaded = result.is_ok();
        result
    }

    /// Seek the loaded stream. A failed seek may leave the engine without a
    /// stream, so the player stops rather than claim it is still playing.
    fn engine_seek(&mut self, at: Duration) -> Result<()> {
        let result = self.require_engine()?.seek(at);
        if let Err(err) = result {
            warn!(error = %err, "seek failed, stream released");
            self.release_stream();
            return Err(err);
        }
        Ok(())
    }

    fn release_stream(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.stop();
        }
        self.loaded = false;
        self.position = Duration::ZERO;
        self.set_state(PlaybackState::Stopped);
    }

    fn require_engine(&mut self) -> Result<&mut E> {
        self.engine.as_mut().ok_or_else(|| {
            PlayerError::AudioUnavailable(self.unavailable.clone().unwrap_or_default())
        })
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.playlist.len();
        if len == 0 {
            Err(PlayerError::EmptyPlaylist)
        } else if index >= len {
            Err(PlayerError::TrackOutOfRange { index, len })
        } else {
            Ok(())
        }
    }

    fn current_duration(&self) -> Option<Duration> {
        self.current_track().and_then(|t| t.duration)
    }

    fn clamp_to_track(&self, at: Duration) -> Duration {
        match self.current_duration() {
            Some(total) => at.min(total),
            None => at,
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.events.push(PlayerEvent::StateChanged { state });
        }
    }

    fn note_track_change(&mut self, previous: Option<usize>) {
        if let Some(index) = self.current.filter(|&i| Some(i) != previous) {
            debug!(index, "track changed");
            self.events.push(PlayerEvent::TrackChanged { index });
        }
    }
}

/// Index one step away from `index`, wrapping around both ends.
fn neighbour(index: usize, len: usize, forward: bool) -> usize {
    if forward {
        (index + 1) % len
    } else if index == 0 {
        len - 1
    } else {
        index - 1
    }
}
