//! Transfer progress reporting
//!
//! `SpeedMeter` keeps a short window of samples and derives the transfer rate
//! and remaining time that go into each `ProgressEvent`.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Snapshot of a running transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub bytes_received: u64,
    pub bytes_total: Option<u64>,
    pub bytes_per_second: f64,
    pub eta_seconds: Option<u64>,
}

impl ProgressEvent {
    /// Completed fraction in `0.0..=1.0` when the total is known
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> Option<f64> {
        self.bytes_total
            .filter(|total| *total > 0)
            .map(|total| (self.bytes_received as f64 / total as f64).min(1.0))
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    bytes: u64,
}

/// Sliding-window rate estimator
#[derive(Debug, Clone)]
pub struct SpeedMeter {
    samples: VecDeque<Sample>,
    window: Duration,
    started: Instant,
}

impl SpeedMeter {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        let now = Instant::now();
        let mut samples = VecDeque::new();
        samples.push_back(Sample { at: now, bytes: 0 });
        Self {
            samples,
            window,
            started: now,
        }
    }

    /// Record the cumulative byte count at `now`
    pub fn record(&mut self, bytes: u64, now: Instant) {
        self.samples.push_back(Sample { at: now, bytes });
        while self.samples.len() > 2 {
            match self.samples.front() {
                Some(front) if now.duration_since(front.at) > self.window => {
                    self.samples.pop_front();
                }
                _ => break,
            }
        }
    }

    /// Bytes per second over the sample window
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self) -> f64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => {
                let elapsed = last.at.duration_since(first.at).as_secs_f64();
                if elapsed <= f64::EPSILON {
                    0.0
                } else {
                    last.bytes.saturating_sub(first.bytes) as f64 / elapsed
                }
            }
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Build a progress snapshot for `received` of `total` bytes
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn snapshot(&self, received: u64, total: Option<u64>) -> ProgressEvent {
        let rate = self.rate();
        let eta_seconds = total.and_then(|total| {
            let remaining = total.saturating_sub(received);
            if remaining == 0 {
                Some(0)
            } else if rate > 0.0 {
                Some((remaining as f64 / rate).ceil() as u64)
            } else {
                None
            }
        });
        ProgressEvent {
            bytes_received: received,
            bytes_total: total,
            bytes_per_second: rate,
            eta_seconds,
        }
    }
}
