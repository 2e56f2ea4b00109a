//! Download file lifecycle.
//!
//! Bytes are written to a sibling temp file and only renamed onto the final
//! name once accepted, so the final name never shows a partial asset. Direct
//! single fetches write straight to the final path and rely on `discard` to
//! clean up after a failed attempt.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Temp path for `final_path`, unique per process so concurrent runs
/// reconciling the same asset do not write into each other's file
/// (`doom2.wad` -> `doom2.wad.4242.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    temp_path_for(final_path, std::process::id())
}

fn temp_path_for(final_path: &Path, pid: u32) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(format!(".{}{}", pid, TEMP_SUFFIX));
    PathBuf::from(o)
}

/// Sequential writer for one download attempt.
pub struct StorageWriter {
    file: File,
    path: PathBuf,
}

impl StorageWriter {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        Ok(StorageWriter {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Sync file data to disk and close it.
    pub fn close(self) -> Result<PathBuf> {
        self.file
            .sync_all()
            .with_context(|| format!("sync {}", self.path.display()))?;
        Ok(self.path)
    }
}

impl Write for StorageWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Atomically rename `temp` onto `final_path`. Fails across filesystems,
/// which cannot happen for sibling temp files.
pub fn finalize(temp: &Path, final_path: &Path) -> Result<()> {
    std::fs::rename(temp, final_path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp.display(),
            final_path.display()
        )
    })
}

/// Remove a partial or rejected file. A file that is already gone is fine.
pub fn discard(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}

/// [`discard`] for cleanup paths that already carry an error of their own.
/// A failure is logged; returns false if `path` may still exist.
pub fn discard_or_warn(path: &Path) -> bool {
    match discard(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), "leftover file not removed: {:#}", e);
            false
        }
    }
}
