//! CLI for wadfetch.

mod commands;
mod console;
pub mod exit;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use wadfetch_core::config::{self, CONFIG_ENV, DEFAULT_CONFIG_PATH};
use wadfetch_core::directory::DownloadDir;

use commands::{run_check_config, run_checksum, run_fetch, run_reconcile};

/// Download WAD files for odasrvmgr.
///
/// With a WAD name, downloads that WAD (if not already present) and records its
/// MD5 in the lockfile. Without one, downloads every WAD listed in the lockfile
/// that is missing from the download directory.
#[derive(Debug, Parser)]
#[command(name = "wadfetch", version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Path to odasrvmgr.toml.
    #[arg(long, global = true, env = CONFIG_ENV, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// WAD name to download (".wad" is appended if missing).
    pub wad: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Validate odasrvmgr.toml.
    CheckConfig {
        /// Only set the exit status, print nothing.
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the MD5 of a file in lockfile format.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

pub fn run_from_args() -> Result<()> {
    let cli = Cli::parse();
    tracing::debug!("parsed args: {:?}", cli);

    match cli.command {
        Some(CliCommand::CheckConfig { quiet }) => run_check_config(&cli.config, quiet),
        Some(CliCommand::Checksum { path }) => run_checksum(&path),
        None => {
            let (cfg, dir) = load_download_dir(&cli.config)?;
            match cli.wad {
                Some(wad) => run_fetch(&cfg, dir, &wad),
                None => run_reconcile(&cfg, dir),
            }
        }
    }
}

/// Load config and validate the download directory before any network I/O.
fn load_download_dir(path: &Path) -> Result<(config::OdasrvConfig, DownloadDir)> {
    let cfg = config::load(path)?;
    let dir = DownloadDir::resolve(cfg.download_dir_value())?;
    Ok((cfg, dir))
}

#[cfg(test)]
mod tests;
