//! `wadfetch check-config`: validate odasrvmgr.toml.

use anyhow::Result;
use std::path::Path;
use wadfetch_core::config;
use wadfetch_core::directory::DownloadDir;

use crate::cli::exit::{ExitError, EXIT_CONFIG};

pub fn run_check_config(path: &Path, quiet: bool) -> Result<()> {
    let cfg = match config::load(path) {
        Ok(cfg) => cfg,
        Err(e) if quiet => {
            tracing::debug!("{}", e);
            return Err(ExitError::silent(EXIT_CONFIG).into());
        }
        Err(e) => return Err(e.into()),
    };

    let issues = config::validate(&cfg);
    if !issues.is_empty() {
        if !quiet {
            eprintln!("{} contains {} error(s):", path.display(), issues.len());
            for issue in &issues {
                eprintln!("  {}", issue);
            }
        }
        return Err(ExitError::silent(EXIT_CONFIG).into());
    }

    // Schema is fine; warn if the download directory is not usable right now.
    if let Err(e) = DownloadDir::resolve(cfg.download_dir_value()) {
        if !quiet {
            eprintln!("Warning: {}", e);
        }
    }

    if !quiet {
        println!("No errors found in {}", path.display());
    }
    Ok(())
}
