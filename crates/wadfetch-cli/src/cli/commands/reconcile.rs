//! `wadfetch` with no WAD: download everything listed in the lockfile that is missing.

use anyhow::Result;
use wadfetch_core::config::OdasrvConfig;
use wadfetch_core::directory::DownloadDir;
use wadfetch_core::ledger::Ledger;
use wadfetch_core::reconcile::{BatchReconciler, EntryOutcome};

use super::build_downloader;
use crate::cli::console::{ConsoleObserver, HiddenCursor};
use crate::cli::exit::{ExitError, EXIT_DOWNLOAD};

pub fn run_reconcile(cfg: &OdasrvConfig, dir: DownloadDir) -> Result<()> {
    let ledger = Ledger::new(&dir);
    let mut reconciler = BatchReconciler::new(dir, ledger, build_downloader(cfg));

    let mut observer = ConsoleObserver::new();
    let report = {
        let _cursor = HiddenCursor::hide();
        reconciler.reconcile(&mut observer)?
    };

    let downloaded = report.count(|o| matches!(o, EntryOutcome::Downloaded { .. }));
    let present = report.count(|o| matches!(o, EntryOutcome::Satisfied));
    let mismatched = report.count(|o| matches!(o, EntryOutcome::Mismatch { .. }));
    println!(
        "{} downloaded, {} already present, {} hash mismatch(es)",
        downloaded, present, mismatched
    );

    if report.is_success() {
        return Ok(());
    }
    let failed: Vec<String> = report
        .unsatisfied()
        .map(|r| r.entry.name.to_string())
        .collect();
    Err(ExitError::new(
        EXIT_DOWNLOAD,
        format!("failed to download {}: {}", failed.len(), failed.join(", ")),
    )
    .into())
}
