//! Transfer progress reporting.
//!
//! The transport reports every chunk; observers only want an update every few
//! hundred milliseconds plus the final one.

use std::time::{Duration, Instant};

/// Snapshot of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes received so far.
    pub downloaded: u64,
    /// Total size if the server advertised one.
    pub total: Option<u64>,
}

impl Progress {
    /// Fraction complete in [0.0, 1.0], if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.downloaded as f64 / total as f64).min(1.0)),
            None => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.total, Some(total) if self.downloaded >= total)
    }

    /// Console line: `1.5 MiB / 14.0 MiB 10.7%` (or just the byte count).
    pub fn display_line(&self) -> String {
        match (self.total, self.fraction()) {
            (Some(total), Some(frac)) => format!(
                "{} / {} {:.1}%",
                format_size(self.downloaded),
                format_size(total),
                frac * 100.0
            ),
            _ => format_size(self.downloaded),
        }
    }
}

/// Human-readable binary size (`"512.0 B"`, `"1.5 MiB"`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Rate limiter for progress callbacks.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last: Option<Instant>,
    last_sent: Option<Progress>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            last_sent: None,
        }
    }

    /// True if `p` should be forwarded: the first update, the completing one,
    /// or one at least `interval` after the previous forward.
    pub fn should_emit(&mut self, p: Progress) -> bool {
        self.should_emit_at(p, Instant::now())
    }

    fn should_emit_at(&mut self, p: Progress, now: Instant) -> bool {
        if self.last_sent == Some(p) {
            return false;
        }
        let due = match self.last {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        };
        if due || p.is_complete() {
            self.last = Some(now);
            self.last_sent = Some(p);
            return true;
        }
        false
    }
}
