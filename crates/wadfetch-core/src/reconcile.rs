//! Batch reconciliation of the download directory against the ledger.
//!
//! Each entry is handled independently; a failure on one asset never stops
//! the batch. Missing assets are downloaded to a temp file, checked against
//! the recorded MD5 and only then renamed into place. Present assets with the
//! wrong digest are reported but never overwritten, since they may be a
//! deliberate local override.

use crate::checksum;
use crate::directory::DownloadDir;
use crate::downloader::{MirrorDownloader, Verdict};
use crate::ledger::{Ledger, LedgerEntry, LedgerError};
use crate::observer::FetchObserver;
use crate::storage;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("lockfile '{}' does not exist", .0.display())]
    LedgerMissing(PathBuf),
    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for ReconcileError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Missing(path) => ReconcileError::LedgerMissing(path),
            other => ReconcileError::Ledger(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Present and matching; untouched.
    Satisfied,
    /// Present with a different digest; untouched.
    Mismatch { actual: String },
    /// Was missing, now downloaded and verified.
    Downloaded { mirror: String },
    /// Still missing.
    Unsatisfied { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub entry: LedgerEntry,
    pub outcome: EntryOutcome,
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub entries: Vec<EntryReport>,
    pub malformed_lines: usize,
}

impl ReconcileReport {
    /// False if any entry is still missing. Mismatches are warnings only.
    pub fn is_success(&self) -> bool {
        self.unsatisfied().next().is_none()
    }

    pub fn unsatisfied(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries
            .iter()
            .filter(|r| matches!(r.outcome, EntryOutcome::Unsatisfied { .. }))
    }

    pub fn count(&self, pred: impl Fn(&EntryOutcome) -> bool) -> usize {
        self.entries.iter().filter(|r| pred(&r.outcome)).count()
    }
}

pub struct BatchReconciler {
    dir: DownloadDir,
    ledger: Ledger,
    downloader: MirrorDownloader,
}

impl BatchReconciler {
    pub fn new(dir: DownloadDir, ledger: Ledger, downloader: MirrorDownloader) -> Self {
        Self {
            dir,
            ledger,
            downloader,
        }
    }

    /// Reconcile every ledger entry (most recent digest per name).
    pub fn reconcile(
        &mut self,
        observer: &mut dyn FetchObserver,
    ) -> Result<ReconcileReport, ReconcileError> {
        let snapshot = self.ledger.latest()?;
        let mut report = ReconcileReport {
            entries: Vec::with_capacity(snapshot.entries.len()),
            malformed_lines: snapshot.malformed.len(),
        };
        for bad in &snapshot.malformed {
            observer.malformed_line(&bad.to_string());
        }

        for entry in snapshot.entries {
            let outcome = self.reconcile_entry(&entry, observer);
            report.entries.push(EntryReport { entry, outcome });
        }

        tracing::info!(
            entries = report.entries.len(),
            unsatisfied = report.unsatisfied().count(),
            malformed = report.malformed_lines,
            "reconciliation finished"
        );
        Ok(report)
    }

    fn reconcile_entry(
        &mut self,
        entry: &LedgerEntry,
        observer: &mut dyn FetchObserver,
    ) -> EntryOutcome {
        let name = &entry.name;
        let final_path = self.dir.asset_path(name);

        if final_path.exists() {
            return match checksum::md5_path(&final_path) {
                Ok(actual) if actual == entry.digest => {
                    tracing::info!(%name, "already satisfied");
                    observer.entry_satisfied(name);
                    EntryOutcome::Satisfied
                }
                Ok(actual) => {
                    tracing::warn!(%name, expected = %entry.digest, %actual, "hash mismatch, leaving local file alone");
                    observer.entry_mismatch(name, &entry.digest, &actual);
                    EntryOutcome::Mismatch { actual }
                }
                Err(e) => {
                    let reason = format!("cannot hash existing file: {:#}", e);
                    tracing::error!(%name, "{}", reason);
                    observer.entry_unsatisfied(name, &reason);
                    EntryOutcome::Unsatisfied { reason }
                }
            };
        }

        let temp = storage::temp_path(&final_path);
        let expected = entry.digest.as_str();
        let fetched = self
            .downloader
            .fetch_verified(name, &temp, observer, |p| {
                let actual = checksum::md5_path(p)?;
                if actual == expected {
                    Ok(Verdict::Accept)
                } else {
                    Ok(Verdict::Reject(format!(
                        "hash mismatch: expected {}, got {}",
                        expected, actual
                    )))
                }
            });

        let outcome = match fetched {
            Ok(fetched) => match storage::finalize(&temp, &final_path) {
                Ok(()) => {
                    tracing::info!(%name, mirror = %fetched.mirror, "verified and committed");
                    observer.entry_downloaded(name, &fetched.mirror);
                    return EntryOutcome::Downloaded {
                        mirror: fetched.mirror,
                    };
                }
                Err(e) => format!("{:#}", e),
            },
            Err(e) => e.to_string(),
        };

        storage::discard_or_warn(&temp);
        tracing::error!(%name, "{}", outcome);
        observer.entry_unsatisfied(name, &outcome);
        EntryOutcome::Unsatisfied { reason: outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetName;
    use crate::checksum::md5_bytes;
    use crate::ledger::NoGroupOwnership;
    use crate::mirrors::MirrorList;
    use crate::testing::{download_dir, list_dir, RecordingObserver, Reply, ScriptedTransport};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const A: &str = "http://a.test/";
    const B: &str = "http://b.test/";

    const DOOM2: &[u8] = b"IWAD doom2 contents";
    const TNT: &[u8] = b"IWAD tnt contents";

    fn reconciler(dir: &DownloadDir, transport: ScriptedTransport) -> BatchReconciler {
        let ledger = Ledger::with_group_ownership(dir, Box::new(NoGroupOwnership));
        let downloader =
            MirrorDownloader::new(MirrorList::new([A, B]).unwrap(), Box::new(transport))
                .with_rng(Box::new(StdRng::seed_from_u64(2)));
        BatchReconciler::new(dir.clone(), ledger, downloader)
    }

    fn write_ledger(dir: &DownloadDir, text: &str) {
        std::fs::write(dir.path().join(crate::ledger::LEDGER_FILE_NAME), text).unwrap();
    }

    fn name(s: &str) -> AssetName {
        AssetName::normalize(s).unwrap()
    }

    #[test]
    fn missing_ledger_is_an_error() {
        let (_tmp, dir) = download_dir();
        let err = reconciler(&dir, ScriptedTransport::new())
            .reconcile(&mut RecordingObserver::default())
            .unwrap_err();
        assert!(matches!(err, ReconcileError::LedgerMissing(_)));
    }

    #[test]
    fn downloads_missing_entry_and_leaves_no_temp_file() {
        let (_tmp, dir) = download_dir();
        write_ledger(&dir, &format!("doom2.wad {}\n", md5_bytes(DOOM2)));
        let transport = ScriptedTransport::new()
            .reply(&format!("{}doom2.wad", A), Reply::Body(DOOM2.to_vec()))
            .reply(&format!("{}doom2.wad", B), Reply::Body(DOOM2.to_vec()));
        let log = transport.request_log();

        let report = reconciler(&dir, transport)
            .reconcile(&mut RecordingObserver::default())
            .unwrap();

        assert!(report.is_success());
        assert!(matches!(report.entries[0].outcome, EntryOutcome::Downloaded { .. }));
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(std::fs::read(dir.path().join("doom2.wad")).unwrap(), DOOM2);
        assert_eq!(list_dir(&dir), vec!["doom2.wad", "wadfetch.lock"]);
    }

    #[test]
    fn latin1_comment_does_not_block_later_entries() {
        let (_tmp, dir) = download_dir();
        let mut text = b"# caf\xe9 mirror notes\n".to_vec();
        text.extend_from_slice(format!("doom2.wad {}\n", md5_bytes(DOOM2)).as_bytes());
        std::fs::write(dir.path().join(crate::ledger::LEDGER_FILE_NAME), text).unwrap();
        let transport = ScriptedTransport::new()
            .reply(&format!("{}doom2.wad", A), Reply::Body(DOOM2.to_vec()))
            .reply(&format!("{}doom2.wad", B), Reply::Body(DOOM2.to_vec()));

        let report = reconciler(&dir, transport)
            .reconcile(&mut RecordingObserver::default())
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.malformed_lines, 0);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(std::fs::read(dir.path().join("doom2.wad")).unwrap(), DOOM2);
    }

    #[test]
    fn satisfied_entry_does_no_io() {
        let (_tmp, dir) = download_dir();
        std::fs::write(dir.path().join("doom2.wad"), DOOM2).unwrap();
        write_ledger(&dir, &format!("doom2.wad {}\n", md5_bytes(DOOM2)));
        let transport = ScriptedTransport::new();
        let log = transport.request_log();
        let before = std::fs::metadata(dir.path().join("doom2.wad")).unwrap().modified().unwrap();
        let mut obs = RecordingObserver::default();

        let report = reconciler(&dir, transport).reconcile(&mut obs).unwrap();

        assert_eq!(report.entries[0].outcome, EntryOutcome::Satisfied);
        assert!(log.borrow().is_empty());
        let after = std::fs::metadata(dir.path().join("doom2.wad")).unwrap().modified().unwrap();
        assert_eq!(before, after);
        assert_eq!(obs.events, vec!["satisfied doom2.wad"]);
    }

    #[test]
    fn mismatched_local_file_is_left_alone() {
        let (_tmp, dir) = download_dir();
        std::fs::write(dir.path().join("doom2.wad"), b"locally patched").unwrap();
        write_ledger(&dir, &format!("doom2.wad {}\n", md5_bytes(DOOM2)));
        let transport = ScriptedTransport::new()
            .reply(&format!("{}doom2.wad", A), Reply::Body(DOOM2.to_vec()));
        let log = transport.request_log();

        let report = reconciler(&dir, transport)
            .reconcile(&mut RecordingObserver::default())
            .unwrap();

        assert!(matches!(report.entries[0].outcome, EntryOutcome::Mismatch { .. }));
        assert!(report.is_success());
        assert!(log.borrow().is_empty());
        assert_eq!(std::fs::read(dir.path().join("doom2.wad")).unwrap(), b"locally patched");
    }

    #[test]
    fn wrong_bytes_from_one_mirror_fall_through_to_next() {
        let (_tmp, dir) = download_dir();
        write_ledger(&dir, &format!("doom2.wad {}\n", md5_bytes(DOOM2)));
        let transport = ScriptedTransport::new()
            .reply(&format!("{}doom2.wad", A), Reply::Body(b"<html>not found</html>".to_vec()))
            .reply(&format!("{}doom2.wad", B), Reply::Body(b"<html>not found</html>".to_vec()));
        // whichever mirror comes second serves the real file
        let order = MirrorList::new([A, B])
            .unwrap()
            .shuffled(&mut StdRng::seed_from_u64(2))
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        let transport = transport.reply(&format!("{}doom2.wad", order[1]), Reply::Body(DOOM2.to_vec()));
        let mut obs = RecordingObserver::default();

        let report = reconciler(&dir, transport).reconcile(&mut obs).unwrap();

        assert_eq!(
            report.entries[0].outcome,
            EntryOutcome::Downloaded {
                mirror: order[1].clone()
            }
        );
        assert!(obs.events.contains(&format!("rejected doom2.wad {}", order[0])));
        assert_eq!(list_dir(&dir), vec!["doom2.wad", "wadfetch.lock"]);
    }

    #[test]
    fn failure_on_one_entry_does_not_stop_the_batch() {
        let (_tmp, dir) = download_dir();
        write_ledger(
            &dir,
            &format!(
                "# managed by wadfetch\nicarus.wad\ndoom2.wad {}\ntnt.wad {}\n",
                md5_bytes(DOOM2),
                md5_bytes(TNT)
            ),
        );
        // doom2 only ever arrives corrupted; tnt is fine
        let transport = ScriptedTransport::new()
            .reply(&format!("{}doom2.wad", A), Reply::Body(b"corrupt".to_vec()))
            .reply(&format!("{}doom2.wad", B), Reply::Partial(b"cor".to_vec()))
            .reply(&format!("{}tnt.wad", A), Reply::Body(TNT.to_vec()))
            .reply(&format!("{}tnt.wad", B), Reply::Body(TNT.to_vec()));
        let mut obs = RecordingObserver::default();

        let report = reconciler(&dir, transport).reconcile(&mut obs).unwrap();

        assert_eq!(report.malformed_lines, 1);
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].entry.name, name("doom2"));
        assert!(matches!(report.entries[0].outcome, EntryOutcome::Unsatisfied { .. }));
        assert!(matches!(report.entries[1].outcome, EntryOutcome::Downloaded { .. }));
        assert!(!report.is_success());
        assert_eq!(obs.events[0], "malformed");
        assert!(!dir.path().join("doom2.wad").exists());
        assert_eq!(list_dir(&dir), vec!["tnt.wad", "wadfetch.lock"]);
    }

    #[test]
    fn most_recent_digest_wins() {
        let (_tmp, dir) = download_dir();
        write_ledger(
            &dir,
            &format!(
                "doom2.wad {}\ndoom2.wad {}\n",
                md5_bytes(b"old release"),
                md5_bytes(DOOM2)
            ),
        );
        std::fs::write(dir.path().join("doom2.wad"), DOOM2).unwrap();

        let report = reconciler(&dir, ScriptedTransport::new())
            .reconcile(&mut RecordingObserver::default())
            .unwrap();

        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].outcome, EntryOutcome::Satisfied);
    }
}
