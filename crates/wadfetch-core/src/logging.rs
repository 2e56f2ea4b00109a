//! Logging init: file under the XDG state dir, or stderr when that is unusable.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// `wadfetch` is the binary's target, `wadfetch_core` this library's.
const DEFAULT_FILE_FILTER: &str = "info,wadfetch=debug,wadfetch_core=debug";

const LOG_FILE_NAME: &str = "wadfetch.log";

/// Path of the log file: `$XDG_STATE_HOME/wadfetch/wadfetch.log`
/// (`~/.local/state/wadfetch/wadfetch.log` by default).
pub fn log_file_path() -> Result<PathBuf> {
    // the prefix is already part of the returned state home
    let xdg_dirs = xdg::BaseDirectories::with_prefix("wadfetch")?;
    Ok(xdg_dirs.get_state_home().join(LOG_FILE_NAME))
}

/// Initialize structured logging to the XDG state log file.
/// Returns Err (state dir unwritable, subscriber already set) so the caller
/// can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let log_file_path = log_file_path()?;
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILE_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "logging to {}",
        log_file_path.display()
    );
    Ok(())
}

/// Initialize logging to stderr only. The default filter is quiet so it does
/// not drown the console output.
pub fn init_logging_stderr() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}
