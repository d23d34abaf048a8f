use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::app::App;
use crate::audio::AudioEngine;
use crate::config;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::mpris_sync::{Published, update_mpris};
use crate::runtime::startup::tick_interval;
use crate::ui;

/// State tracked by the runtime event loop across iterations.
#[derive(Debug, Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// What MPRIS was last told.
    pub published: Published,
}

/// Main terminal event loop: handles input, ticks the player, keeps MPRIS in
/// sync and redraws. Returns `Ok(())` when shutdown is requested.
pub fn run<E: AudioEngine>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App<E>,
    mpris: &MprisHandle,
    control_tx: &mpsc::Sender<ControlCmd>,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick = tick_interval(settings);
    let mut last_tick = Instant::now();

    loop {
        update_mpris(mpris, app, &mut state.published);
        terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.controls))?;

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, app) {
                return Ok(());
            }
        }

        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && handle_key_event(key, settings, app, control_tx, state)
                {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick {
            app.tick(Instant::now());
            last_tick = Instant::now();
        }
    }
}

/// Apply a command from MPRIS (or a key routed through the control channel).
/// Returns `true` when the app should quit.
pub(super) fn handle_control_cmd<E: AudioEngine>(cmd: ControlCmd, app: &mut App<E>) -> bool {
    debug!(?cmd, "control command");
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => app.on_play(),
        ControlCmd::Pause => app.on_pause(),
        ControlCmd::PlayPause => app.on_play_pause(),
        ControlCmd::Stop => app.on_stop(),
        ControlCmd::Next => app.on_next(),
        ControlCmd::Prev => app.on_previous(),
        ControlCmd::SeekBy(micros) => app.on_seek_by_micros(micros),
        ControlCmd::SetPosition(micros) => {
            app.on_seek(Duration::from_micros(micros.max(0).unsigned_abs()));
        }
        ControlCmd::SetVolume(volume) => app.on_volume_change(volume as f32),
    }
    false
}

/// Apply a key press. Returns `true` when the app should quit.
pub(super) fn handle_key_event<E: AudioEngine>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App<E>,
    control_tx: &mpsc::Sender<ControlCmd>,
    state: &mut EventLoopState,
) -> bool {
    let was_pending_gg = std::mem::take(&mut state.pending_gg);

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('g') => {
            if was_pending_gg {
                app.cursor_top();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.cursor_bottom(),
        KeyCode::Char('j') | KeyCode::Down => app.cursor_next(),
        KeyCode::Char('k') | KeyCode::Up => app.cursor_prev(),
        KeyCode::Enter => app.on_play_selected(),
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let _ = control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('l') => {
            let _ = control_tx.send(ControlCmd::Next);
        }
        KeyCode::Char('h') => {
            let _ = control_tx.send(ControlCmd::Prev);
        }
        KeyCode::Char('L') => app.on_seek_by(scrub_secs(settings)),
        KeyCode::Char('H') => app.on_seek_by(-scrub_secs(settings)),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.on_volume_step(settings.controls.volume_step)
        }
        KeyCode::Char('-') => app.on_volume_step(-settings.controls.volume_step),
        KeyCode::Char('s') => app.on_stop(),
        KeyCode::Char('r') => app.on_cycle_loop_mode(),
        _ => {}
    }

    false
}

fn scrub_secs(settings: &config::Settings) -> i64 {
    settings.controls.scrub_seconds.min(i64::MAX as u64) as i64
}
