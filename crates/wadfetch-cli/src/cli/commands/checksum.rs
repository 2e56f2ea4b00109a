//! Checksum command: print a file's MD5 as a lockfile line.

use anyhow::{Context, Result};
use std::path::Path;
use wadfetch_core::checksum;

/// Print `<file name> <md5>`, ready to append to `wadfetch.lock`.
pub fn run_checksum(path: &Path) -> Result<()> {
    let digest = checksum::md5_path(path)?;
    let name = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?;
    println!("{} {}", name.to_string_lossy().to_lowercase(), digest);
    Ok(())
}
