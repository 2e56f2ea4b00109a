//! Test doubles shared by the unit tests.

use crate::asset::AssetName;
use crate::directory::DownloadDir;
use crate::observer::FetchObserver;
use crate::progress::Progress;
use crate::transport::{AttemptOutcome, FailureKind, Transport, TransportFailure};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Body(Vec<u8>),
    Status(u32),
    Fail(FailureKind),
    /// Writes these bytes, then reports a truncated body.
    Partial(Vec<u8>),
}

/// Transport answering from a URL -> reply table; unknown URLs get 404.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedTransport {
    replies: HashMap<String, Reply>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }

    /// Handle onto the request log that survives boxing the transport.
    pub(crate) fn request_log(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.requests)
    }
}

impl Transport for ScriptedTransport {
    fn get(
        &self,
        url: &str,
        sink: &mut dyn Write,
        on_progress: &mut dyn FnMut(Progress),
    ) -> AttemptOutcome {
        self.requests.borrow_mut().push(url.to_string());
        match self.replies.get(url) {
            None => AttemptOutcome::StatusError(404),
            Some(Reply::Status(code)) => AttemptOutcome::StatusError(*code),
            Some(Reply::Fail(kind)) => {
                AttemptOutcome::TransportFailed(TransportFailure::new(*kind, "scripted failure"))
            }
            Some(Reply::Partial(body)) => {
                if let Err(e) = sink.write_all(body) {
                    return AttemptOutcome::WriteFailed(e.to_string());
                }
                AttemptOutcome::TransportFailed(TransportFailure::new(
                    FailureKind::Truncated,
                    "truncated body",
                ))
            }
            Some(Reply::Body(body)) => {
                if let Err(e) = sink.write_all(body) {
                    return AttemptOutcome::WriteFailed(e.to_string());
                }
                on_progress(Progress {
                    downloaded: body.len() as u64,
                    total: Some(body.len() as u64),
                });
                AttemptOutcome::Success {
                    bytes: body.len() as u64,
                }
            }
        }
    }
}

/// Observer that records events as short strings.
#[derive(Debug, Default)]
pub(crate) struct RecordingObserver {
    pub(crate) events: Vec<String>,
}

impl FetchObserver for RecordingObserver {
    fn attempt_started(&mut self, name: &AssetName, mirror: &str) {
        self.events.push(format!("start {} {}", name, mirror));
    }

    fn attempt_rejected(&mut self, name: &AssetName, mirror: &str, _reason: &str) {
        self.events.push(format!("rejected {} {}", name, mirror));
    }

    fn entry_satisfied(&mut self, name: &AssetName) {
        self.events.push(format!("satisfied {}", name));
    }

    fn entry_mismatch(&mut self, name: &AssetName, _expected: &str, _actual: &str) {
        self.events.push(format!("mismatch {}", name));
    }

    fn entry_downloaded(&mut self, name: &AssetName, _mirror: &str) {
        self.events.push(format!("downloaded {}", name));
    }

    fn entry_unsatisfied(&mut self, name: &AssetName, _reason: &str) {
        self.events.push(format!("unsatisfied {}", name));
    }

    fn malformed_line(&mut self, _message: &str) {
        self.events.push("malformed".to_string());
    }
}

pub(crate) fn download_dir() -> (tempfile::TempDir, DownloadDir) {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DownloadDir::from_path(tmp.path()).unwrap();
    (tmp, dir)
}

/// File names in `dir`, sorted.
pub(crate) fn list_dir(dir: &DownloadDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
