use std::env;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::audio::RodioEngine;
use crate::library::scan;
use crate::logging;
use crate::mpris::ControlCmd;
use crate::player::Player;

mod event_loop;
mod mpris_sync;
mod settings;
mod startup;


pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_problem) = settings::load_settings();

    // Logging is best effort; the player runs without it.
    if let Err(e) = logging::init(&settings.log) {
        eprintln!("waltz: logging disabled: {e}");
    }
    if let Some(problem) = config_problem {
        warn!("{problem}");
    }

    let dir = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    info!(dir = %dir.display(), "starting");

    let playlist = scan(&dir, &settings.library);
    let engine = RodioEngine::open(&settings.audio);
    let player = Player::new(playlist, engine);

    let mut app = App::new(player, Duration::from_millis(settings.ui.notice_ms));
    app.set_current_dir(dir.display().to_string());
    startup::apply_playback_defaults(&mut app, &settings);

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx.clone());

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::default();
    let run_result = event_loop::run(
        &mut terminal,
        &settings,
        &mut app,
        &mpris,
        &control_tx,
        &control_rx,
        &mut state,
    );

    app.player.shutdown();
    info!("shutting down");

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}
