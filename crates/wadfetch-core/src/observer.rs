//! Event hooks for user-facing output.
//!
//! Core components log through `tracing`; anything a person running the tool
//! should see goes through a [`FetchObserver`], which the CLI implements.

use crate::asset::AssetName;
use crate::progress::Progress;
use crate::transport::AttemptOutcome;

/// Receives download and reconciliation events. Every method defaults to a no-op.
pub trait FetchObserver {
    /// About to GET `name` from `mirror`.
    fn attempt_started(&mut self, _name: &AssetName, _mirror: &str) {}

    /// Throttled transfer progress for the current attempt.
    fn progress(&mut self, _name: &AssetName, _progress: Progress) {}

    /// The attempt against `mirror` finished at the transport level.
    fn attempt_finished(&mut self, _name: &AssetName, _mirror: &str, _outcome: &AttemptOutcome) {}

    /// Bytes arrived but failed verification (digest mismatch).
    fn attempt_rejected(&mut self, _name: &AssetName, _mirror: &str, _reason: &str) {}

    /// Reconciliation: local file present with the recorded digest.
    fn entry_satisfied(&mut self, _name: &AssetName) {}

    /// Reconciliation: local file present but its digest differs; left untouched.
    fn entry_mismatch(&mut self, _name: &AssetName, _expected: &str, _actual: &str) {}

    /// Reconciliation: missing file downloaded and verified.
    fn entry_downloaded(&mut self, _name: &AssetName, _mirror: &str) {}

    /// Reconciliation: no mirror produced matching bytes.
    fn entry_unsatisfied(&mut self, _name: &AssetName, _reason: &str) {}

    /// Reconciliation: a ledger line could not be parsed and was skipped.
    fn malformed_line(&mut self, _message: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl FetchObserver for NoopObserver {}
