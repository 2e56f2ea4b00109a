//! CLI command handlers, one per file.

mod check_config;
mod checksum;
mod fetch;
mod reconcile;

pub use check_config::run_check_config;
pub use checksum::run_checksum;
pub use fetch::run_fetch;
pub use reconcile::run_reconcile;

use wadfetch_core::config::OdasrvConfig;
use wadfetch_core::downloader::MirrorDownloader;
use wadfetch_core::mirrors::MirrorList;
use wadfetch_core::transport::CurlTransport;

/// Mirror downloader over the built-in mirror list, tuned from `[wadfetch]`.
fn build_downloader(cfg: &OdasrvConfig) -> MirrorDownloader {
    let transport = CurlTransport::new(&cfg.wadfetch);
    MirrorDownloader::new(MirrorList::default(), Box::new(transport))
        .with_progress_interval(cfg.wadfetch.progress_interval())
}
