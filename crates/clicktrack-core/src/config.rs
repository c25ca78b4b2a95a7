//! Playback and metronome configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the playback scheduler and its helpers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickTrackConfig {
    /// Wall-clock period of the scheduler poll.
    pub tick_interval: Duration,
    /// Distance covered by skip forward/backward.
    pub skip_seconds: f64,
    /// Tap buffer resets when the gap since the last tap exceeds this.
    pub tap_reset_gap_secs: f64,
    /// Maximum number of taps kept for the estimate.
    pub tap_capacity: usize,
    /// Playback rate granularity.
    pub rate_step: f64,
}

impl Default for ClickTrackConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            skip_seconds: 10.0,
            tap_reset_gap_secs: 2.0,
            tap_capacity: 5,
            rate_step: 0.1,
        }
    }
}

impl ClickTrackConfig {
    pub fn validate(&self) -> Result<()> {
        let tick_ms = self.tick_interval.as_millis();
        if !(1..=1000).contains(&tick_ms) {
            return Err(Error::InvalidConfig(format!(
                "tick_interval {tick_ms}ms out of range (1-1000 ms)"
            )));
        }
        if !(self.skip_seconds > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "skip_seconds must be positive, got {}",
                self.skip_seconds
            )));
        }
        if !(self.tap_reset_gap_secs > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "tap_reset_gap_secs must be positive, got {}",
                self.tap_reset_gap_secs
            )));
        }
        if self.tap_capacity < 2 {
            return Err(Error::InvalidConfig(format!(
                "tap_capacity must hold at least 2 taps, got {}",
                self.tap_capacity
            )));
        }
        if !(self.rate_step > 0.0 && self.rate_step <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "rate_step {} out of range (0-1]",
                self.rate_step
            )));
        }
        Ok(())
    }
}
