//! Download directory resolution.
//!
//! The configured directory must exist, be a directory, and be readable and
//! writable by this process before anything touches the network or the ledger.

use crate::asset::AssetName;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidDirectory {
    #[error("waddownloaddir not found in config")]
    Missing,
    #[error("waddownloaddir in config is not a valid string")]
    NotAString,
    #[error("waddownloaddir '{}' could not be found", .0.display())]
    NotFound(PathBuf),
    #[error("waddownloaddir '{}' is not a valid directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("waddownloaddir '{}' is not readable", .0.display())]
    NotReadable(PathBuf),
    #[error("waddownloaddir '{}' is not writable", .0.display())]
    NotWritable(PathBuf),
}

/// A validated, canonical download directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDir {
    path: PathBuf,
}

impl DownloadDir {
    /// Resolve the raw `settings.waddownloaddir` configuration value.
    pub fn resolve(value: Option<&toml::Value>) -> Result<Self, InvalidDirectory> {
        let raw = value.ok_or(InvalidDirectory::Missing)?;
        let raw = raw.as_str().ok_or(InvalidDirectory::NotAString)?;
        Self::from_path(Path::new(raw))
    }

    /// Validate an explicit path (canonicalized; symlinks are followed).
    pub fn from_path(path: &Path) -> Result<Self, InvalidDirectory> {
        Self::from_path_with(path, access_ok)
    }

    /// `from_path` with the permission check supplied by the caller.
    fn from_path_with(
        path: &Path,
        check: impl Fn(&Path, Access) -> bool,
    ) -> Result<Self, InvalidDirectory> {
        let path = path
            .canonicalize()
            .map_err(|_| InvalidDirectory::NotFound(path.to_path_buf()))?;
        if !path.is_dir() {
            return Err(InvalidDirectory::NotADirectory(path));
        }
        if !check(&path, Access::Read) {
            return Err(InvalidDirectory::NotReadable(path));
        }
        if !check(&path, Access::Write) {
            return Err(InvalidDirectory::NotWritable(path));
        }
        tracing::debug!(dir = %path.display(), "download directory validated");
        Ok(DownloadDir { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path of an asset inside this directory.
    pub fn asset_path(&self, name: &AssetName) -> PathBuf {
        self.path.join(name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

#[cfg(unix)]
fn access_ok(path: &Path, access: Access) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    let mode = match access {
        Access::Read => libc::R_OK,
        Access::Write => libc::W_OK,
    };
    unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
}

#[cfg(not(unix))]
fn access_ok(path: &Path, access: Access) -> bool {
    match (access, std::fs::metadata(path)) {
        (_, Err(_)) => false,
        (Access::Read, Ok(_)) => true,
        (Access::Write, Ok(m)) => !m.permissions().readonly(),
    }
}
