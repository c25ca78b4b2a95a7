//! Time sources and a software transport driven by them.

use super::media::{PlaybackRate, Transport};
use crate::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic seconds since an arbitrary origin.
pub trait TimeSource: Send + Sync {
    fn now_secs(&self) -> f64;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    micros: Arc<AtomicU64>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.micros
            .fetch_add(by.as_micros() as u64, Ordering::AcqRel);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn set_secs(&self, secs: f64) {
        self.micros
            .store((secs.max(0.0) * 1e6).round() as u64, Ordering::Release);
    }
}

impl TimeSource for ManualTime {
    fn now_secs(&self) -> f64 {
        self.micros.load(Ordering::Acquire) as f64 / 1e6
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now_secs(&self) -> f64 {
        (**self).now_secs()
    }
}

/// Software transport: position is `anchor + elapsed * rate`, clamped to the duration.
///
/// Used headless and in tests; no audio is rendered.
#[derive(Debug)]
pub struct ClockTransport<T: TimeSource> {
    time: T,
    duration_ms: u64,
    rate: PlaybackRate,
    anchor_ms: f64,
    /// Time source reading when `anchor_ms` was taken; `Some` only while rolling.
    anchor_time: Option<f64>,
    paused: bool,
}

impl<T: TimeSource> ClockTransport<T> {
    pub fn new(time: T, duration_ms: u64) -> Self {
        Self {
            time,
            duration_ms,
            rate: PlaybackRate::NORMAL,
            anchor_ms: 0.0,
            anchor_time: None,
            paused: false,
        }
    }

    fn current_ms(&self) -> f64 {
        let pos = match self.anchor_time {
            Some(started) => {
                let elapsed = (self.time.now_secs() - started).max(0.0);
                self.anchor_ms + elapsed * 1000.0 * self.rate.get()
            }
            None => self.anchor_ms,
        };
        pos.min(self.duration_ms as f64)
    }

    /// Fold elapsed time into the anchor.
    fn reanchor(&mut self) {
        self.anchor_ms = self.current_ms();
        if self.anchor_time.is_some() {
            self.anchor_time = Some(self.time.now_secs());
        }
    }
}

impl<T: TimeSource> Transport for ClockTransport<T> {
    fn play(&mut self) -> Result<()> {
        if self.anchor_time.is_none() {
            self.anchor_time = Some(self.time.now_secs());
        }
        self.paused = false;
        Ok(())
    }

    fn toggle_pause(&mut self) -> Result<()> {
        if self.paused {
            self.paused = false;
            self.anchor_time = Some(self.time.now_secs());
        } else if self.anchor_time.is_some() {
            self.anchor_ms = self.current_ms();
            self.anchor_time = None;
            self.paused = true;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.anchor_ms = 0.0;
        self.anchor_time = None;
        self.paused = false;
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.anchor_ms = position_ms.min(self.duration_ms) as f64;
        if self.anchor_time.is_some() {
            self.anchor_time = Some(self.time.now_secs());
        }
        Ok(())
    }

    fn position_ms(&self) -> Result<u64> {
        // Rounded: elapsed seconds carry binary noise (4.1 - 4.0 < 0.1)
        Ok(self.current_ms().round() as u64)
    }

    fn duration_ms(&self) -> Result<u64> {
        Ok(self.duration_ms)
    }

    fn set_rate(&mut self, rate: PlaybackRate) -> Result<()> {
        self.reanchor();
        self.rate = rate;
        Ok(())
    }

    fn rate(&self) -> PlaybackRate {
        self.rate
    }

    fn is_ended(&self) -> Result<bool> {
        Ok(self.anchor_time.is_some() && self.current_ms() >= self.duration_ms as f64)
    }

    fn is_playing(&self) -> bool {
        self.anchor_time.is_some()
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}
