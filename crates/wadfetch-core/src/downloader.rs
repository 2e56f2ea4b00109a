//! Mirror-fallback downloader.
//!
//! Every fetch walks a fresh random permutation of the mirror list, one GET
//! at a time, until an attempt succeeds and (optionally) passes a caller's
//! verification. Status errors and transport failures move on to the next
//! mirror; not every mirror carries every WAD. When the list is exhausted the
//! destination file is removed so no partial download is left behind.

use crate::asset::AssetName;
use crate::mirrors::{fetch_url, MirrorList};
use crate::observer::FetchObserver;
use crate::progress::ProgressThrottle;
use crate::storage::{self, StorageWriter};
use crate::transport::{AttemptOutcome, Transport};
use rand::RngCore;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("all {attempts} mirrors exhausted for {name}")]
    AllMirrorsExhausted { name: AssetName, attempts: usize },
    #[error("local I/O error while fetching {name}: {detail}")]
    Io { name: AssetName, detail: String },
}

/// Verdict of a caller-supplied check on a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(String),
}

/// A successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Mirror base URL that served the accepted bytes.
    pub mirror: String,
    pub bytes: u64,
}

pub struct MirrorDownloader {
    mirrors: MirrorList,
    transport: Box<dyn Transport>,
    rng: Box<dyn RngCore>,
    progress_interval: Duration,
}

impl MirrorDownloader {
    /// Downloader using the thread-local RNG for mirror order.
    pub fn new(mirrors: MirrorList, transport: Box<dyn Transport>) -> Self {
        Self {
            mirrors,
            transport,
            rng: Box::new(rand::rng()),
            progress_interval: Duration::from_millis(250),
        }
    }

    /// Replace the random source (tests use a seeded `StdRng`).
    pub fn with_rng(mut self, rng: Box<dyn RngCore>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Fetch `name` into `dest`, accepting the first transport-level success.
    pub fn fetch(
        &mut self,
        name: &AssetName,
        dest: &Path,
        observer: &mut dyn FetchObserver,
    ) -> Result<Fetched, FetchError> {
        self.fetch_verified(name, dest, observer, |_| Ok(Verdict::Accept))
    }

    /// Fetch `name` into `dest`; after each transport-level success `verify`
    /// inspects the file. A rejected file is removed and the next mirror is tried.
    pub fn fetch_verified<F>(
        &mut self,
        name: &AssetName,
        dest: &Path,
        observer: &mut dyn FetchObserver,
        mut verify: F,
    ) -> Result<Fetched, FetchError>
    where
        F: FnMut(&Path) -> anyhow::Result<Verdict>,
    {
        let order: Vec<String> = self
            .mirrors
            .shuffled(&mut *self.rng)
            .into_iter()
            .map(str::to_owned)
            .collect();
        // local I/O failure: nothing worth retrying, and nothing may stay at dest
        let io_err = |e: anyhow::Error| {
            storage::discard_or_warn(dest);
            FetchError::Io {
                name: name.clone(),
                detail: format!("{:#}", e),
            }
        };

        for base in &order {
            let url = fetch_url(base, name.as_str());
            tracing::info!(%name, mirror = %base, "attempting download");
            observer.attempt_started(name, base);

            let outcome = self.attempt(&url, name, dest, observer).map_err(io_err)?;
            observer.attempt_finished(name, base, &outcome);

            match outcome {
                AttemptOutcome::Success { bytes } => match verify(dest).map_err(io_err)? {
                    Verdict::Accept => {
                        tracing::info!(%name, mirror = %base, bytes, "download accepted");
                        return Ok(Fetched {
                            mirror: base.clone(),
                            bytes,
                        });
                    }
                    Verdict::Reject(reason) => {
                        tracing::warn!(%name, mirror = %base, "download rejected: {}", reason);
                        observer.attempt_rejected(name, base, &reason);
                    }
                },
                AttemptOutcome::StatusError(code) => {
                    tracing::info!(%name, mirror = %base, code, "HTTP error, trying next mirror");
                }
                AttemptOutcome::TransportFailed(ref failure) => {
                    tracing::warn!(%name, mirror = %base, kind = ?failure.kind, "{}, trying next mirror", failure);
                }
                AttemptOutcome::WriteFailed(detail) => {
                    storage::discard_or_warn(dest);
                    return Err(FetchError::Io {
                        name: name.clone(),
                        detail,
                    });
                }
            }
            storage::discard(dest).map_err(io_err)?;
        }

        tracing::error!(%name, attempts = order.len(), "all mirrors exhausted");
        storage::discard(dest).map_err(io_err)?;
        Err(FetchError::AllMirrorsExhausted {
            name: name.clone(),
            attempts: order.len(),
        })
    }

    /// One GET into a freshly truncated `dest`.
    fn attempt(
        &self,
        url: &str,
        name: &AssetName,
        dest: &Path,
        observer: &mut dyn FetchObserver,
    ) -> anyhow::Result<AttemptOutcome> {
        let mut writer = StorageWriter::create(dest)?;
        let mut throttle = ProgressThrottle::new(self.progress_interval);
        let outcome = self.transport.get(url, &mut writer, &mut |p| {
            if throttle.should_emit(p) {
                observer.progress(name, p);
            }
        });
        writer.close()?;
        Ok(outcome)
    }
}
