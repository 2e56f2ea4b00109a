//! HTTP GET transport for mirror attempts.
//!
//! One attempt = one plain GET (no Range, no auth) streamed into a sink. The
//! result is an [`AttemptOutcome`] value rather than an error, so the mirror
//! loop can decide what to do next without unwinding.

use crate::config::FetchSettings;
use crate::progress::Progress;
use std::cell::Cell;
use std::fmt;
use std::io::Write;
use std::time::Duration;

/// Why a transfer failed below the HTTP status level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Connect,
    Resolve,
    /// Body ended before the advertised length.
    Truncated,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of a single GET against a single mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx and the whole body was written to the sink.
    Success { bytes: u64 },
    /// Connection, timeout, or truncated body.
    TransportFailed(TransportFailure),
    /// Non-2xx final status.
    StatusError(u32),
    /// Writing to the local sink failed; retrying another mirror won't help.
    WriteFailed(String),
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Success { bytes } => write!(f, "downloaded {} bytes", bytes),
            AttemptOutcome::TransportFailed(t) => write!(f, "{}", t),
            AttemptOutcome::StatusError(code) => write!(f, "HTTP error: {}", code),
            AttemptOutcome::WriteFailed(e) => write!(f, "local write failed: {}", e),
        }
    }
}

/// Performs one GET, streaming the body into `sink` and reporting progress.
pub trait Transport {
    fn get(
        &self,
        url: &str,
        sink: &mut dyn Write,
        on_progress: &mut dyn FnMut(Progress),
    ) -> AttemptOutcome;
}

/// libcurl-backed transport. A fresh easy handle per attempt.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    connect_timeout: Duration,
    low_speed_limit: u32,
    low_speed_time: Duration,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new(&FetchSettings::default())
    }
}

impl CurlTransport {
    pub fn new(settings: &FetchSettings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout(),
            low_speed_limit: settings.low_speed_limit_bytes,
            low_speed_time: settings.low_speed_time(),
        }
    }

    fn configure(&self, easy: &mut curl::easy::Easy, url: &str) -> Result<(), curl::Error> {
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(concat!("wadfetch/", env!("CARGO_PKG_VERSION")))?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.low_speed_limit(self.low_speed_limit)?;
        easy.low_speed_time(self.low_speed_time)?;
        Ok(())
    }
}

impl Transport for CurlTransport {
    fn get(
        &self,
        url: &str,
        sink: &mut dyn Write,
        on_progress: &mut dyn FnMut(Progress),
    ) -> AttemptOutcome {
        let mut easy = curl::easy::Easy::new();
        if let Err(e) = self.configure(&mut easy, url) {
            return AttemptOutcome::TransportFailed(classify_curl_error(&e));
        }

        // Redirect hops each send a status line; the last one wins.
        let status = Cell::new(0u32);
        let content_length: Cell<Option<u64>> = Cell::new(None);
        let written = Cell::new(0u64);
        let mut write_err: Option<std::io::Error> = None;

        let result = perform(
            &mut easy,
            &status,
            &content_length,
            &written,
            &mut write_err,
            sink,
            on_progress,
        );

        if let Some(e) = write_err {
            return AttemptOutcome::WriteFailed(e.to_string());
        }
        if let Err(e) = result {
            return AttemptOutcome::TransportFailed(classify_curl_error(&e));
        }

        let code = match easy.response_code() {
            Ok(code) => code,
            Err(e) => return AttemptOutcome::TransportFailed(classify_curl_error(&e)),
        };
        if !is_success(code) {
            return AttemptOutcome::StatusError(code);
        }

        let bytes = written.get();
        if let Some(expected) = content_length.get() {
            if bytes != expected {
                return AttemptOutcome::TransportFailed(TransportFailure::new(
                    FailureKind::Truncated,
                    format!("truncated body: received {} of {} bytes", bytes, expected),
                ));
            }
        }
        if let Err(e) = sink.flush() {
            return AttemptOutcome::WriteFailed(e.to_string());
        }
        AttemptOutcome::Success { bytes }
    }
}

/// Runs the transfer; callbacks record status, length and bytes written.
fn perform(
    easy: &mut curl::easy::Easy,
    status: &Cell<u32>,
    content_length: &Cell<Option<u64>>,
    written: &Cell<u64>,
    write_err: &mut Option<std::io::Error>,
    sink: &mut dyn Write,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<(), curl::Error> {
    let mut transfer = easy.transfer();
    transfer.header_function(|data| {
        if let Ok(line) = std::str::from_utf8(data) {
            if let Some(code) = parse_status_line(line) {
                status.set(code);
                content_length.set(None);
            } else if let Some(len) = parse_content_length(line) {
                content_length.set(Some(len));
            }
        }
        true
    })?;
    transfer.write_function(|data| {
        // error pages are not asset bytes
        if !is_success(status.get()) {
            return Ok(data.len());
        }
        if let Err(e) = sink.write_all(data) {
            *write_err = Some(e);
            return Ok(0); // abort transfer
        }
        let done = written.get() + data.len() as u64;
        written.set(done);
        on_progress(Progress {
            downloaded: done,
            total: content_length.get(),
        });
        Ok(data.len())
    })?;
    transfer.perform()
}

fn is_success(code: u32) -> bool {
    (200..300).contains(&code)
}

/// Status code from an `HTTP/x.y NNN reason` header line.
fn parse_status_line(line: &str) -> Option<u32> {
    let line = line.trim();
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

fn parse_content_length(line: &str) -> Option<u64> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

/// Map a curl error to a failure kind and a short message.
pub fn classify_curl_error(e: &curl::Error) -> TransportFailure {
    let kind = if e.is_operation_timedout() {
        FailureKind::Timeout
    } else if e.is_couldnt_connect() || e.is_ssl_connect_error() {
        FailureKind::Connect
    } else if e.is_couldnt_resolve_host() || e.is_couldnt_resolve_proxy() {
        FailureKind::Resolve
    } else if e.is_partial_file() || e.is_got_nothing() || e.is_recv_error() {
        FailureKind::Truncated
    } else {
        FailureKind::Other
    };
    TransportFailure::new(kind, e.description())
}
