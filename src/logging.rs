//! Tracing configuration and log routing.
//!
//! Every event goes to stdout through a compact formatter. A second, non-blocking layer appends
//! the same events to the file named by [`Config::log_file`](crate::config::Config::log_file).
//! When that file cannot be opened the server keeps running with stdout only.
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global tracing subscriber.
///
/// `RUST_LOG` controls filtering and defaults to `info`.
pub fn init_tracing(log_file: &Path) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();
    let file_layer = file_writer(log_file).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

/// Open `path` for appending, creating missing parent directories.
///
/// The writer guard is parked in a static so buffered lines are flushed at exit.
fn file_writer(path: &Path) -> Option<NonBlocking> {
    path.file_name()?;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(dir) {
            eprintln!("Failed to create log directory {}: {err}", dir.display());
            return None;
        }
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            if LOG_GUARD.set(guard).is_err() {
                tracing::debug!("Log writer already installed");
            }
            Some(writer)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
