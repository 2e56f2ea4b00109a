//! Asset name normalization.
//!
//! Names are typed by hand on the command line, so they are folded to a
//! canonical form before any lookup, download or ledger write.

use std::fmt;

/// File extension every asset carries.
pub const WAD_EXTENSION: &str = ".wad";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetNameError {
    #[error("asset name is empty")]
    Empty,
    #[error("asset name '{0}' must not contain path separators or '..'")]
    PathLike(String),
    #[error("asset name '{0}' must not contain whitespace or control characters")]
    BadCharacter(String),
}

/// Normalized asset file name: lower-case, `.wad` suffixed, a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetName(String);

impl AssetName {
    /// Normalize a user-supplied name (`"DOOM2"` -> `"doom2.wad"`).
    pub fn normalize(raw: &str) -> Result<Self, AssetNameError> {
        let mut name = raw.trim().to_lowercase();
        if name.is_empty() {
            return Err(AssetNameError::Empty);
        }
        if !name.ends_with(WAD_EXTENSION) {
            name.push_str(WAD_EXTENSION);
        }
        Self::check(name)
    }

    /// Accept a name as already stored in the ledger. Only lower-cases it and
    /// runs the same safety checks; no extension is added.
    pub fn from_ledger(raw: &str) -> Result<Self, AssetNameError> {
        if raw.is_empty() {
            return Err(AssetNameError::Empty);
        }
        Self::check(raw.to_lowercase())
    }

    fn check(name: String) -> Result<Self, AssetNameError> {
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(AssetNameError::PathLike(name));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AssetNameError::BadCharacter(name));
        }
        Ok(AssetName(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
