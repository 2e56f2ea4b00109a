//! Fetch a single asset by name and record it in the ledger.
//!
//! This is how the ledger gets built: there is no known digest yet, so the
//! first successful download is trusted and its MD5 recorded.

use crate::asset::{AssetName, AssetNameError};
use crate::checksum;
use crate::directory::DownloadDir;
use crate::downloader::{FetchError, MirrorDownloader};
use crate::ledger::{Ledger, LedgerError};
use crate::observer::FetchObserver;
use crate::storage;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The file is already in the download directory; nothing was done.
    AlreadyExists { name: AssetName, path: PathBuf },
    /// Downloaded to `path` and recorded with `digest`.
    Downloaded {
        name: AssetName,
        path: PathBuf,
        digest: String,
        mirror: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum FetchByNameError {
    #[error(transparent)]
    InvalidName(#[from] AssetNameError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Download(#[from] FetchError),
    #[error("failed to hash {name}: {detail}")]
    Digest { name: AssetName, detail: String },
}

pub struct SingleAssetFetcher {
    dir: DownloadDir,
    ledger: Ledger,
    downloader: MirrorDownloader,
}

impl SingleAssetFetcher {
    pub fn new(dir: DownloadDir, ledger: Ledger, downloader: MirrorDownloader) -> Self {
        Self {
            dir,
            ledger,
            downloader,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Normalize `raw_name`, skip if present, else download straight to the
    /// final path and append `(name, md5)` to the ledger.
    pub fn fetch_by_name(
        &mut self,
        raw_name: &str,
        observer: &mut dyn FetchObserver,
    ) -> Result<FetchOutcome, FetchByNameError> {
        let name = AssetName::normalize(raw_name)?;
        let path = self.dir.asset_path(&name);
        if path.exists() {
            tracing::info!(%name, "already exists, skipping");
            return Ok(FetchOutcome::AlreadyExists { name, path });
        }

        self.ledger.ensure_exists()?;
        let fetched = self.downloader.fetch(&name, &path, observer)?;

        let digest = match checksum::md5_path(&path) {
            Ok(d) => d,
            Err(e) => {
                storage::discard_or_warn(&path);
                return Err(FetchByNameError::Digest {
                    name,
                    detail: format!("{:#}", e),
                });
            }
        };
        // an unrecorded file would be skipped as "already exists" forever
        if let Err(e) = self.ledger.append(&name, &digest) {
            storage::discard_or_warn(&path);
            return Err(e.into());
        }

        Ok(FetchOutcome::Downloaded {
            name,
            path,
            digest,
            mirror: fetched.mirror,
        })
    }
}
