//! Integrity ledger (`wadfetch.lock`).
//!
//! Append-only, line-oriented record of `<asset-name> <md5-hex>` pairs kept in
//! the download directory. Lines are only ever appended with a single write,
//! so concurrent wadfetch invocations interleave whole lines. Blank lines and
//! `#` comments are ignored on read.

mod group;

pub use group::{GroupError, GroupOwnership, NoGroupOwnership, UnixGroupOwnership};

use crate::asset::AssetName;
use crate::checksum::is_md5_hex;
use crate::directory::DownloadDir;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Fixed ledger file name inside the download directory.
pub const LEDGER_FILE_NAME: &str = "wadfetch.lock";

/// System group that owns the ledger.
pub const LEDGER_GROUP: &str = "odasrvmgr";

/// Owner and group read/write, nothing for others.
pub const LEDGER_MODE: u32 = 0o660;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("lockfile '{}' does not exist", .0.display())]
    Missing(PathBuf),
    #[error("lockfile {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed lockfile line {line_no}: '{line}' ({reason})")]
    Malformed {
        line_no: usize,
        line: String,
        reason: String,
    },
}

/// One `(name, digest)` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub name: AssetName,
    /// Lowercase hex MD5.
    pub digest: String,
}

impl LedgerEntry {
    pub fn new(name: AssetName, digest: &str) -> Self {
        Self {
            name,
            digest: digest.to_ascii_lowercase(),
        }
    }

    fn to_line(&self) -> String {
        format!("{} {}\n", self.name, self.digest)
    }
}

/// True for blank and `#` comment lines, decided on raw bytes so comments
/// in any encoding are ignored.
fn is_ignorable(raw: &[u8]) -> bool {
    match raw.iter().position(|b| !b.is_ascii_whitespace()) {
        None => true,
        Some(i) => raw[i] == b'#',
    }
}

/// Parse one ledger line. `Ok(None)` for blank and comment lines.
fn parse_line(line: &str) -> Result<Option<LedgerEntry>, String> {
    let stripped = line.trim();
    if stripped.is_empty() || stripped.starts_with('#') {
        return Ok(None);
    }
    let tokens: Vec<&str> = stripped.split_whitespace().collect();
    let [name, digest] = tokens.as_slice() else {
        return Err(format!("expected 2 fields, found {}", tokens.len()));
    };
    let name = AssetName::from_ledger(name).map_err(|e| e.to_string())?;
    if !is_md5_hex(digest) {
        return Err(format!("'{}' is not a 32-character hex MD5 digest", digest));
    }
    Ok(Some(LedgerEntry::new(name, digest)))
}

/// The ledger of one download directory.
pub struct Ledger {
    path: PathBuf,
    group: Box<dyn GroupOwnership>,
}

impl Ledger {
    /// Ledger for `dir`, handing newly created files to [`LEDGER_GROUP`].
    pub fn new(dir: &DownloadDir) -> Self {
        Self::with_group_ownership(dir, Box::new(UnixGroupOwnership))
    }

    pub fn with_group_ownership(dir: &DownloadDir, group: Box<dyn GroupOwnership>) -> Self {
        Self {
            path: dir.path().join(LEDGER_FILE_NAME),
            group,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn io_err(&self, source: io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Create the ledger if absent with mode 0660 and the service group.
    /// Returns true if this call created it. Group assignment is best effort.
    pub fn ensure_exists(&self) -> Result<bool, LedgerError> {
        let mut opts = OpenOptions::new();
        opts.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(LEDGER_MODE);
        }
        match opts.open(&self.path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(self.io_err(e)),
        }

        // umask may have stripped group write
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(LEDGER_MODE))
                .map_err(|e| self.io_err(e))?;
        }

        if let Err(e) = self.group.set_group_ownership(&self.path, LEDGER_GROUP) {
            tracing::warn!(path = %self.path.display(), "could not assign lockfile group: {}", e);
        }
        tracing::info!(path = %self.path.display(), "created lockfile");
        Ok(true)
    }

    /// Append one entry, creating the ledger first if needed.
    pub fn append(&self, name: &AssetName, digest: &str) -> Result<(), LedgerError> {
        self.ensure_exists()?;
        let entry = LedgerEntry::new(name.clone(), digest);
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        // one write per line keeps concurrent appenders from interleaving
        f.write_all(entry.to_line().as_bytes())
            .map_err(|e| self.io_err(e))?;
        tracing::info!(name = %entry.name, digest = %entry.digest, "recorded in lockfile");
        Ok(())
    }

    /// Lazily read every entry from the start of the file. Malformed lines
    /// are yielded as `Err(LedgerError::Malformed)` and the scan continues.
    pub fn read_all(&self) -> Result<LedgerEntries, LedgerError> {
        let f = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LedgerError::Missing(self.path.clone()))
            }
            Err(e) => return Err(self.io_err(e)),
        };
        Ok(LedgerEntries {
            path: self.path.clone(),
            reader: BufReader::new(f),
            buf: Vec::new(),
            line_no: 0,
            done: false,
        })
    }

    /// Full scan collapsed to one entry per name: the most recent entry for a
    /// name wins, names keep the order of their first appearance.
    pub fn latest(&self) -> Result<LedgerSnapshot, LedgerError> {
        let mut snapshot = LedgerSnapshot::default();
        let mut index: HashMap<AssetName, usize> = HashMap::new();
        for item in self.read_all()? {
            match item {
                Ok(entry) => match index.get(&entry.name) {
                    Some(&i) => {
                        if snapshot.entries[i].digest != entry.digest {
                            tracing::debug!(
                                name = %entry.name,
                                old = %snapshot.entries[i].digest,
                                new = %entry.digest,
                                "later lockfile entry overrides earlier digest"
                            );
                        }
                        snapshot.entries[i] = entry;
                    }
                    None => {
                        index.insert(entry.name.clone(), snapshot.entries.len());
                        snapshot.entries.push(entry);
                    }
                },
                Err(e @ LedgerError::Malformed { .. }) => {
                    tracing::warn!("{}", e);
                    snapshot.malformed.push(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(snapshot)
    }
}

/// Result of [`Ledger::latest`].
#[derive(Debug, Default)]
pub struct LedgerSnapshot {
    pub entries: Vec<LedgerEntry>,
    pub malformed: Vec<LedgerError>,
}

/// Lazy iterator over ledger lines.
pub struct LedgerEntries {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    line_no: usize,
    done: bool,
}

impl Iterator for LedgerEntries {
    type Item = Result<LedgerEntry, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    self.done = true;
                    return Some(Err(LedgerError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
            }
            self.line_no += 1;
            if is_ignorable(&self.buf) {
                continue;
            }
            let parsed = match std::str::from_utf8(&self.buf) {
                Ok(line) => parse_line(line).map_err(|reason| (line.trim().to_string(), reason)),
                Err(e) => Err((
                    String::from_utf8_lossy(&self.buf).trim().to_string(),
                    format!("not valid UTF-8: {}", e),
                )),
            };
            match parsed {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err((line, reason)) => {
                    return Some(Err(LedgerError::Malformed {
                        line_no: self.line_no,
                        line,
                        reason,
                    }))
                }
            }
        }
        None
    }
}
