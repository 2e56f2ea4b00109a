pub mod config;
pub mod logging;

pub mod asset;
pub mod checksum;
pub mod directory;
pub mod downloader;
pub mod fetch;
pub mod ledger;
pub mod mirrors;
pub mod observer;
pub mod progress;
pub mod reconcile;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod testing;
