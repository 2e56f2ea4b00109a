//! Group ownership of the ledger file.
//!
//! The ledger is appended to both by operators and by the service account, so
//! it is handed to a shared system group. Hosts where that group has not been
//! provisioned yet must still work, which is why callers treat every error
//! here as a warning.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("group '{0}' does not exist on this host")]
    NoSuchGroup(String),
    #[error("failed to change group of {}: {source}", path.display())]
    Chown {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("group ownership is not supported on this platform")]
    Unsupported,
}

/// Capability to hand a file to a named group.
pub trait GroupOwnership {
    fn set_group_ownership(&self, path: &Path, group: &str) -> Result<(), GroupError>;
}

/// Real implementation: `getgrnam` + `chown(path, -1, gid)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixGroupOwnership;

#[cfg(unix)]
impl GroupOwnership for UnixGroupOwnership {
    fn set_group_ownership(&self, path: &Path, group: &str) -> Result<(), GroupError> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_group =
            CString::new(group).map_err(|_| GroupError::NoSuchGroup(group.to_string()))?;
        // getgrnam is not reentrant; wadfetch only calls it from the main thread.
        let gid = unsafe {
            let grp = libc::getgrnam(c_group.as_ptr());
            if grp.is_null() {
                return Err(GroupError::NoSuchGroup(group.to_string()));
            }
            (*grp).gr_gid
        };

        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| GroupError::Chown {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;
        let r = unsafe { libc::chown(c_path.as_ptr(), libc::uid_t::MAX, gid) };
        if r != 0 {
            return Err(GroupError::Chown {
                path: path.to_path_buf(),
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

#[cfg(not(unix))]
impl GroupOwnership for UnixGroupOwnership {
    fn set_group_ownership(&self, _path: &Path, _group: &str) -> Result<(), GroupError> {
        Err(GroupError::Unsupported)
    }
}

/// Does nothing. For tests and for callers that manage ownership themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGroupOwnership;

impl GroupOwnership for NoGroupOwnership {
    fn set_group_ownership(&self, _path: &Path, _group: &str) -> Result<(), GroupError> {
        Ok(())
    }
}
