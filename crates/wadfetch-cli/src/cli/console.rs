//! Console output for fetch and reconcile runs.

use std::io::{self, IsTerminal, Write};
use wadfetch_core::asset::AssetName;
use wadfetch_core::observer::FetchObserver;
use wadfetch_core::progress::Progress;
use wadfetch_core::transport::AttemptOutcome;

const PROGRESS_WIDTH: usize = 32;

/// Prints attempts and progress to stdout, failures to stderr.
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    /// A `\r` progress line is on screen and needs a newline before other output.
    progress_open: bool,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn close_progress(&mut self) {
        if self.progress_open {
            println!();
            self.progress_open = false;
        }
    }
}

impl FetchObserver for ConsoleObserver {
    fn attempt_started(&mut self, name: &AssetName, mirror: &str) {
        self.close_progress();
        println!("Attempting to download {} from {}", name, mirror);
    }

    fn progress(&mut self, _name: &AssetName, progress: Progress) {
        let mut out = io::stdout().lock();
        let _ = write!(
            out,
            "{:<width$}\r",
            progress.display_line(),
            width = PROGRESS_WIDTH
        );
        let _ = out.flush();
        self.progress_open = true;
    }

    fn attempt_finished(&mut self, _name: &AssetName, _mirror: &str, outcome: &AttemptOutcome) {
        self.close_progress();
        match outcome {
            AttemptOutcome::Success { .. } => {}
            AttemptOutcome::WriteFailed(_) => eprintln!("Error: {}", outcome),
            _ => eprintln!("{}, trying next site.", outcome),
        }
    }

    fn attempt_rejected(&mut self, name: &AssetName, _mirror: &str, reason: &str) {
        self.close_progress();
        eprintln!(
            "Hash mismatch for {} ({}), deleting temporary file.",
            name, reason
        );
    }

    fn entry_satisfied(&mut self, name: &AssetName) {
        println!("[Skipping] {} already exists in download directory.", name);
    }

    fn entry_mismatch(&mut self, name: &AssetName, expected: &str, actual: &str) {
        eprintln!(
            "[Skipping] Hash Mismatch: {} found in download directory but hash does not match \
             (expected {}, found {}).",
            name, expected, actual
        );
    }

    fn entry_downloaded(&mut self, name: &AssetName, mirror: &str) {
        self.close_progress();
        println!("Downloaded {} from {}", name, mirror);
    }

    fn entry_unsatisfied(&mut self, name: &AssetName, reason: &str) {
        self.close_progress();
        eprintln!("Error downloading {}: {}", name, reason);
    }

    fn malformed_line(&mut self, message: &str) {
        eprintln!("Warning: skipping lockfile line: {}", message);
    }
}

/// Hides the terminal cursor while progress lines are drawn; restores it on drop.
pub struct HiddenCursor {
    active: bool,
}

impl HiddenCursor {
    pub fn hide() -> Self {
        let mut out = io::stdout();
        let active = out.is_terminal();
        if active {
            let _ = write!(out, "\x1b[?25l");
            let _ = out.flush();
        }
        Self { active }
    }
}

impl Drop for HiddenCursor {
    fn drop(&mut self) {
        if self.active {
            let mut out = io::stdout();
            let _ = write!(out, "\x1b[?25h");
            let _ = out.flush();
        }
    }
}
