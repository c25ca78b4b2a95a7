//! Tap tempo estimation.

use std::collections::VecDeque;

/// Default number of taps kept for the estimate.
pub const DEFAULT_TAP_CAPACITY: usize = 5;

/// Gap after which a new tap starts a fresh sequence.
pub const DEFAULT_TAP_RESET_GAP_SECS: f64 = 2.0;

/// A tempo estimate derived from taps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpmEstimate {
    pub bpm: f64,
    /// Average time between taps, in seconds.
    pub interval_secs: f64,
    /// Number of taps the estimate is based on.
    pub taps: usize,
}

impl BpmEstimate {
    pub fn interval_ms(&self) -> f64 {
        self.interval_secs * 1000.0
    }
}

/// Converts user taps (monotonic wall-clock seconds) into a BPM estimate.
///
/// Tap times are real-world seconds and are never used as transport
/// positions; callers anchor the beat grid at the transport position instead.
#[derive(Debug, Clone)]
pub struct TapTempoEstimator {
    taps: VecDeque<f64>,
    capacity: usize,
    reset_gap_secs: f64,
}

impl TapTempoEstimator {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_TAP_CAPACITY, DEFAULT_TAP_RESET_GAP_SECS)
    }

    pub fn with_params(capacity: usize, reset_gap_secs: f64) -> Self {
        let capacity = capacity.max(2);
        Self {
            taps: VecDeque::with_capacity(capacity),
            capacity,
            reset_gap_secs,
        }
    }

    /// Register a tap at `now_secs`. Returns an estimate once two or more taps
    /// are buffered.
    pub fn tap(&mut self, now_secs: f64) -> Option<BpmEstimate> {
        if let Some(&last) = self.taps.back() {
            if now_secs - last > self.reset_gap_secs || now_secs < last {
                self.taps.clear();
            }
        }

        self.taps.push_back(now_secs);
        while self.taps.len() > self.capacity {
            self.taps.pop_front();
        }

        self.estimate()
    }

    /// Estimate from the taps currently buffered.
    pub fn estimate(&self) -> Option<BpmEstimate> {
        let count = self.taps.len();
        if count < 2 {
            return None;
        }

        let first = *self.taps.front()?;
        let last = *self.taps.back()?;
        let interval_secs = (last - first) / (count - 1) as f64;
        if interval_secs == 0.0 {
            return None;
        }

        Some(BpmEstimate {
            bpm: 60.0 / interval_secs,
            interval_secs,
            taps: count,
        })
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

impl Default for TapTempoEstimator {
    fn default() -> Self {
        Self::new()
    }
}
