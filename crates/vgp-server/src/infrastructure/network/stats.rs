//! Per-connection traffic counters and the timer that decides when to log them.

use std::time::{Duration, Instant};

/// Traffic seen on one connection.  Reset for every new client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Socket reads that returned data.
    pub packets: u64,
    pub bytes: u64,
    /// Time between the two most recent packets.
    pub last_interval: Option<Duration>,
    last_packet: Option<Instant>,
}

impl ConnectionStats {
    /// Counts one read of `len` bytes arriving at `now`.
    pub fn record(&mut self, len: usize, now: Instant) {
        self.packets += 1;
        self.bytes += len as u64;
        if let Some(previous) = self.last_packet {
            self.last_interval = Some(now.saturating_duration_since(previous));
        }
        self.last_packet = Some(now);
    }

    /// Milliseconds between the two most recent packets, or 0 before the second.
    pub fn last_interval_ms(&self) -> u128 {
        self.last_interval.map_or(0, |d| d.as_millis())
    }
}

/// Fires once per interval; never when the interval is `None`.
#[derive(Debug, Clone, Copy)]
pub struct ReportTimer {
    interval: Option<Duration>,
    last: Instant,
}

impl ReportTimer {
    pub fn new(interval: Option<Duration>, now: Instant) -> Self {
        Self {
            interval: interval.filter(|d| !d.is_zero()),
            last: now,
        }
    }

    /// Returns `true` (and restarts the interval) once `interval` has passed since the last report.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.interval {
            Some(interval) if now.saturating_duration_since(self.last) >= interval => {
                self.last = now;
                true
            }
            _ => false,
        }
    }
}
