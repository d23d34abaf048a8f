//! Application model: `App` and the transient `Notice`.
//!
//! `App` owns the `Player` and the playlist cursor. Every UI event and media
//! key ends up in one of the `on_*` handlers below; errors from the player
//! are caught here and shown as notices, never propagated.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::audio::AudioEngine;
use crate::error::Result;
use crate::library::Track;
use crate::player::{PlaybackSnapshot, Player, PlayerEvent};

/// A one-line message shown under the progress bar until it expires.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub text: String,
    pub expires_at: Instant,
}

impl Notice {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// The main application model.
pub struct App<E: AudioEngine> {
    pub player: Player<E>,
    /// Highlighted playlist row. Independent of the playing track.
    pub selected: usize,
    pub notice: Option<Notice>,
    /// Move the cursor along when playback changes track on its own.
    pub follow_playback: bool,
    pub current_dir: Option<String>,
    notice_ttl: Duration,
}

impl<E: AudioEngine> App<E> {
    /// Create a new `App` around `player`. Notices live for `notice_ttl`.
    pub fn new(player: Player<E>, notice_ttl: Duration) -> Self {
        Self {
            player,
            selected: 0,
            notice: None,
            follow_playback: true,
            current_dir: None,
            notice_ttl,
        }
    }

    /// Record the current directory in the app state.
    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    pub fn tracks(&self) -> &[Track] {
        self.player.playlist().tracks()
    }

    pub fn has_tracks(&self) -> bool {
        !self.player.playlist().is_empty()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.player.snapshot()
    }

    /// Whether the transport controls should be rendered as usable.
    pub fn transport_enabled(&self) -> bool {
        self.player.transport_enabled()
    }

    /// Show `text` as a notice until the configured lifetime elapses.
    pub fn notify(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            expires_at: Instant::now() + self.notice_ttl,
        });
    }

    pub fn on_select_track(&mut self, index: usize) {
        let result = self.player.select(index);
        if result.is_ok() {
            self.selected = index;
        }
        self.report(result);
    }

    /// Play the highlighted row from the start.
    pub fn on_play_selected(&mut self) {
        let result = self.player.play_track(self.selected);
        self.report(result);
        self.follow_current();
    }

    pub fn on_play(&mut self) {
        let result = self.player.play();
        self.report(result);
    }

    pub fn on_pause(&mut self) {
        let result = self.player.pause();
        self.report(result);
    }

    pub fn on_play_pause(&mut self) {
        let result = self.player.toggle();
        self.report(result);
    }

    pub fn on_stop(&mut self) {
        let result = self.player.stop();
        self.report(result);
    }

    pub fn on_next(&mut self) {
        let result = self.player.next();
        self.report(result);
        self.follow_current();
    }

    pub fn on_previous(&mut self) {
        let result = self.player.previous();
        self.report(result);
        self.follow_current();
    }

    pub fn on_seek(&mut self, target: Duration) {
        let result = self.player.seek(target);
        self.report(result);
    }

    pub fn on_seek_by(&mut self, delta_secs: i64) {
        let result = self.player.seek_by(delta_secs);
        self.report(result);
    }

    /// Relative seek from MPRIS, which counts in microseconds.
    pub fn on_seek_by_micros(&mut self, delta_micros: i64) {
        let result = self.player.seek_by_micros(delta_micros);
        self.report(result);
    }

    pub fn on_volume_change(&mut self, volume: f32) {
        self.player.set_volume(volume);
        debug!(volume = self.player.volume(), "volume changed");
    }

    /// Change the volume relative to its current level.
    pub fn on_volume_step(&mut self, delta: f32) {
        self.on_volume_change(self.player.volume() + delta);
    }

    pub fn on_cycle_loop_mode(&mut self) {
        let mode = self.player.loop_mode().cycle();
        self.player.set_loop_mode(mode);
        debug!(?mode, "loop mode changed");
    }

    /// Move the cursor down, wrapping to the first row.
    pub fn cursor_next(&mut self) {
        let len = self.tracks().len();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    /// Move the cursor up, wrapping to the last row.
    pub fn cursor_prev(&mut self) {
        let len = self.tracks().len();
        if len > 0 {
            self.selected = if self.selected == 0 {
                len - 1
            } else {
                self.selected - 1
            };
        }
    }

    pub fn cursor_top(&mut self) {
        self.selected = 0;
    }

    pub fn cursor_bottom(&mut self) {
        self.selected = self.tracks().len().saturating_sub(1);
    }

    /// One refresh cycle: poll the player, surface its events and drop an
    /// expired notice.
    pub fn tick(&mut self, now: Instant) {
        let result = self.player.tick();
        self.report(result);
        self.process_events();
        if self.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.notice = None;
        }
    }

    fn process_events(&mut self) {
        for event in self.player.drain_events() {
            match event {
                PlayerEvent::TrackChanged { index } => {
                    if self.follow_playback {
                        self.selected = index;
                    }
                }
                PlayerEvent::Skipped { reason, .. } => {
                    self.notify(format!("skipped: {reason}"));
                }
                PlayerEvent::PlaylistEnded => self.notify("end of playlist"),
                PlayerEvent::StateChanged { .. } | PlayerEvent::TrackFinished { .. } => {}
            }
        }
    }

    fn follow_current(&mut self) {
        if let (true, Some(index)) = (self.follow_playback, self.player.current_index()) {
            self.selected = index;
        }
    }

    fn report(&mut self, result: Result<()>) {
        if let Err(err) = result {
            warn!(error = %err, "command failed");
            self.notify(err.to_string());
        }
    }
}
