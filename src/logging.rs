//! Log setup. The terminal belongs to the TUI, so `tracing` output goes to a
//! file instead of stderr.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogSettings, default_log_path};

/// Install the global subscriber. Returns the log file in use.
///
/// `RUST_LOG` wins over `log.level` when set.
pub fn init(settings: &LogSettings) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = settings
        .file
        .clone()
        .or_else(default_log_path)
        .ok_or("no log file configured and HOME is unset")?;
    let file = open_log_file(&path)?;

    tracing_subscriber::registry()
        .with(filter_for(std::env::var("RUST_LOG").ok(), &settings.level))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;

    Ok(path)
}

fn filter_for(env_directive: Option<String>, level: &str) -> EnvFilter {
    env_directive
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
