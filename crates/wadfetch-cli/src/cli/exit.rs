//! Exit status mapping.

use std::fmt;
use wadfetch_core::config::ConfigError;
use wadfetch_core::directory::InvalidDirectory;
use wadfetch_core::fetch::FetchByNameError;
use wadfetch_core::reconcile::ReconcileError;

/// Configuration or download directory invalid (also the generic failure code).
pub const EXIT_CONFIG: u8 = 1;
/// A WAD could not be downloaded.
pub const EXIT_DOWNLOAD: u8 = 2;
/// Reconciliation requested but no lockfile exists.
pub const EXIT_LOCKFILE_MISSING: u8 = 3;

/// Error with an explicit exit code, for failures that are not a core error type.
#[derive(Debug)]
pub struct ExitError {
    pub code: u8,
    pub message: String,
    /// Details were already printed (or `--quiet` was given).
    pub silent: bool,
}

impl ExitError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            silent: false,
        }
    }

    pub fn silent(code: u8) -> Self {
        Self {
            code,
            message: String::new(),
            silent: true,
        }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExitError {}

pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<ExitError>() {
        return e.code;
    }
    if let Some(ReconcileError::LedgerMissing(_)) = err.downcast_ref::<ReconcileError>() {
        return EXIT_LOCKFILE_MISSING;
    }
    match err.downcast_ref::<FetchByNameError>() {
        Some(FetchByNameError::InvalidName(_)) => return EXIT_CONFIG,
        Some(_) => return EXIT_DOWNLOAD,
        None => {}
    }
    if err.downcast_ref::<InvalidDirectory>().is_some()
        || err.downcast_ref::<ConfigError>().is_some()
    {
        return EXIT_CONFIG;
    }
    EXIT_CONFIG
}

pub fn is_silent(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ExitError>(), Some(e) if e.silent)
}
