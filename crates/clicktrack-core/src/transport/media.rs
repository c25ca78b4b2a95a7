//! Boundary to the media-playback engine.

use crate::{Error, Result};

/// Slowest supported playback rate.
pub const MIN_RATE: f64 = 0.5;
/// Fastest supported playback rate.
pub const MAX_RATE: f64 = 2.0;
/// Default rate granularity.
pub const DEFAULT_RATE_STEP: f64 = 0.1;

/// Playback speed multiplier, always within [`MIN_RATE`, `MAX_RATE`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PlaybackRate(f64);

impl PlaybackRate {
    pub const NORMAL: Self = Self(1.0);

    /// Round to the nearest `DEFAULT_RATE_STEP` and clamp into range.
    pub fn new(value: f64) -> Result<Self> {
        Self::with_step(value, DEFAULT_RATE_STEP)
    }

    /// Round to the nearest `step` and clamp into range. Non-finite input is rejected.
    pub fn with_step(value: f64, step: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::InvalidRate(value));
        }
        let rounded = if step > 0.0 {
            // Snap to the step grid, then trim binary noise (0.30000000000000004)
            let snapped = (value / step).round() * step;
            (snapped * 1e6).round() / 1e6
        } else {
            value
        };
        Ok(Self(rounded.clamp(MIN_RATE, MAX_RATE)))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<f64> for PlaybackRate {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

/// Snapshot of the transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportState {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub rate: PlaybackRate,
    pub playing: bool,
    pub paused: bool,
}

/// An external media-playback engine.
///
/// Implementations own their position, duration and rate. Reads and writes
/// may fail with [`Error::TransportUnavailable`] while the engine is not
/// ready; the scheduler skips such ticks. Seeks and rate changes are fire and
/// forget and are expected to take effect before the next poll.
pub trait Transport: Send {
    /// Start or resume playback.
    fn play(&mut self) -> Result<()>;

    /// Toggle between paused and playing. No-op when stopped.
    fn toggle_pause(&mut self) -> Result<()>;

    /// Stop playback and rewind to zero.
    fn stop(&mut self) -> Result<()>;

    /// Move the playhead. Positions past the end are clamped.
    fn seek(&mut self, position_ms: u64) -> Result<()>;

    fn position_ms(&self) -> Result<u64>;

    fn duration_ms(&self) -> Result<u64>;

    fn set_rate(&mut self, rate: PlaybackRate) -> Result<()>;

    fn rate(&self) -> PlaybackRate;

    /// Whether the playhead has reached the end of the media while playing.
    fn is_ended(&self) -> Result<bool>;

    fn is_playing(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Snapshot of the full transport state.
    fn state(&self) -> Result<TransportState> {
        Ok(TransportState {
            position_ms: self.position_ms()?,
            duration_ms: self.duration_ms()?,
            rate: self.rate(),
            playing: self.is_playing(),
            paused: self.is_paused(),
        })
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn play(&mut self) -> Result<()> {
        (**self).play()
    }

    fn toggle_pause(&mut self) -> Result<()> {
        (**self).toggle_pause()
    }

    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        (**self).seek(position_ms)
    }

    fn position_ms(&self) -> Result<u64> {
        (**self).position_ms()
    }

    fn duration_ms(&self) -> Result<u64> {
        (**self).duration_ms()
    }

    fn set_rate(&mut self, rate: PlaybackRate) -> Result<()> {
        (**self).set_rate(rate)
    }

    fn rate(&self) -> PlaybackRate {
        (**self).rate()
    }

    fn is_ended(&self) -> Result<bool> {
        (**self).is_ended()
    }

    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }
}
