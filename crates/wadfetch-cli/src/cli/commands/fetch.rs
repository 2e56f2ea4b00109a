//! `wadfetch <WAD>`: download one WAD and record it in the lockfile.

use anyhow::Result;
use wadfetch_core::config::OdasrvConfig;
use wadfetch_core::directory::DownloadDir;
use wadfetch_core::fetch::{FetchOutcome, SingleAssetFetcher};
use wadfetch_core::ledger::Ledger;

use super::build_downloader;
use crate::cli::console::{ConsoleObserver, HiddenCursor};

pub fn run_fetch(cfg: &OdasrvConfig, dir: DownloadDir, wad: &str) -> Result<()> {
    let ledger = Ledger::new(&dir);
    let dir_display = dir.path().display().to_string();
    let mut fetcher = SingleAssetFetcher::new(dir, ledger, build_downloader(cfg));

    let mut observer = ConsoleObserver::new();
    let outcome = {
        let _cursor = HiddenCursor::hide();
        fetcher.fetch_by_name(wad, &mut observer)?
    };

    match outcome {
        FetchOutcome::Downloaded { name, path, digest, .. } => {
            tracing::info!(%name, %digest, "recorded in lockfile");
            println!("Successfully downloaded {} to {}", name, path.display());
        }
        FetchOutcome::AlreadyExists { name, .. } => {
            println!("{} already exists in {}", name, dir_display);
        }
    }
    Ok(())
}
