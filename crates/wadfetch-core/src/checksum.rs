//! MD5 digests of asset files.
//!
//! MD5 is what the game server reports and what wikis publish for WADs; it is
//! used to detect corruption and wrong versions, not tampering.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Length of a hex-encoded MD5 digest.
pub const MD5_HEX_LEN: usize = 32;

/// Compute MD5 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded.
pub fn md5_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut ctx = md5::Context::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }
    Ok(hex::encode(ctx.finalize().0))
}

/// MD5 of an in-memory buffer, lowercase hex.
pub fn md5_bytes(data: &[u8]) -> String {
    hex::encode(md5::compute(data).0)
}

/// True if `s` looks like a hex MD5 digest (any case).
pub fn is_md5_hex(s: &str) -> bool {
    s.len() == MD5_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}
