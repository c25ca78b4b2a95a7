//! Beat grid and click scheduling.
//!
//! A [`BeatGrid`] places beat zero at `beat_offset_ms` of transport time and
//! repeats every `60000 / bpm` ms. [`BeatClock`] owns the grid and the
//! transient click schedule, and answers "should a click fire now?" once per
//! scheduler tick.
//!
//! The schedule is never advanced across a discontinuity. After a seek, a
//! loop-back or a resume, callers invoke [`BeatClock::resync`] so the next
//! click is re-derived from the grid rather than from the stale schedule.

use crate::{Error, Result};

/// Tempo and phase of the metronome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatGrid {
    bpm: f64,
    beat_offset_ms: f64,
}

impl BeatGrid {
    /// Create a grid. `bpm == 0` disables clicking; a negative or non-finite
    /// tempo and a non-finite offset are rejected.
    pub fn new(bpm: f64, beat_offset_ms: f64) -> Result<Self> {
        if !bpm.is_finite() || bpm < 0.0 {
            return Err(Error::InvalidBpm(bpm));
        }
        if !beat_offset_ms.is_finite() {
            return Err(Error::InvalidBeatOffset(beat_offset_ms));
        }
        Ok(Self {
            bpm,
            beat_offset_ms,
        })
    }

    /// Grid with no metronome.
    pub const fn disabled() -> Self {
        Self {
            bpm: 0.0,
            beat_offset_ms: 0.0,
        }
    }

    #[inline]
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    #[inline]
    pub fn beat_offset_ms(&self) -> f64 {
        self.beat_offset_ms
    }

    /// Click interval in ms, `None` when the grid is disabled.
    #[inline]
    pub fn interval_ms(&self) -> Option<f64> {
        (self.bpm > 0.0).then(|| 60000.0 / self.bpm)
    }

    /// First beat strictly after `current_ms`, or the offset itself when
    /// `current_ms` lies before beat zero.
    pub fn next_click_after(&self, current_ms: f64) -> Option<f64> {
        let interval = self.interval_ms()?;
        if current_ms < self.beat_offset_ms {
            return Some(self.beat_offset_ms);
        }
        let beats_passed = (current_ms - self.beat_offset_ms) / interval;
        let next_beat_index = beats_passed.floor() + 1.0;
        Some(self.beat_offset_ms + next_beat_index * interval)
    }

    /// Decide whether a click is due at `current_ms` given the last scheduled
    /// click time.
    ///
    /// When due, the schedule advances by one interval. If that still is not
    /// ahead of `current_ms` (a stall, a speed change, a missed poll) the
    /// schedule is re-derived from the grid instead, so a long gap produces a
    /// single click rather than a burst.
    pub fn due_click(&self, current_ms: f64, scheduled_next_ms: f64) -> DueClick {
        let Some(interval) = self.interval_ms() else {
            return DueClick {
                fire: false,
                next_click_ms: scheduled_next_ms,
            };
        };

        if current_ms < scheduled_next_ms {
            return DueClick {
                fire: false,
                next_click_ms: scheduled_next_ms,
            };
        }

        let advanced = scheduled_next_ms + interval;
        let next_click_ms = if advanced <= current_ms {
            let realigned = self.next_click_after(current_ms).unwrap_or(advanced);
            // Rounding in the floor() can land exactly on current_ms
            if realigned <= current_ms {
                realigned + interval
            } else {
                realigned
            }
        } else {
            advanced
        };

        DueClick {
            fire: true,
            next_click_ms,
        }
    }
}

impl Default for BeatGrid {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Result of [`BeatGrid::due_click`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DueClick {
    pub fire: bool,
    pub next_click_ms: f64,
}

/// Transport time of the next click to fire. Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickSchedule {
    pub next_click_ms: f64,
}

/// Owns the beat grid, the click schedule and the metronome on/off switch.
#[derive(Debug, Clone, Default)]
pub struct BeatClock {
    grid: BeatGrid,
    schedule: Option<ClickSchedule>,
    enabled: bool,
}

impl BeatClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the grid. The schedule is re-derived at the next poll or resync.
    pub fn set_grid(&mut self, bpm: f64, beat_offset_ms: f64) -> Result<()> {
        self.grid = BeatGrid::new(bpm, beat_offset_ms)?;
        self.schedule = None;
        Ok(())
    }

    /// Change tempo, keeping the current beat offset.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<()> {
        self.set_grid(bpm, self.grid.beat_offset_ms)
    }

    /// Move beat zero, keeping the tempo. A non-finite offset leaves the grid unchanged.
    pub fn set_beat_offset_ms(&mut self, beat_offset_ms: f64) -> Result<()> {
        self.set_grid(self.grid.bpm, beat_offset_ms)
    }

    pub fn grid(&self) -> BeatGrid {
        self.grid
    }

    pub fn bpm(&self) -> f64 {
        self.grid.bpm
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.enabled {
            self.enabled = enabled;
            self.schedule = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether polling can ever fire a click.
    pub fn is_active(&self) -> bool {
        self.enabled && self.grid.interval_ms().is_some()
    }

    pub fn next_click_after(&self, current_ms: f64) -> Option<f64> {
        self.grid.next_click_after(current_ms)
    }

    pub fn due_click(&self, current_ms: f64, scheduled_next_ms: f64) -> DueClick {
        self.grid.due_click(current_ms, scheduled_next_ms)
    }

    /// Scheduled time of the next click, if one has been derived.
    pub fn scheduled_click_ms(&self) -> Option<f64> {
        self.schedule.map(|s| s.next_click_ms)
    }

    /// Re-derive the schedule at `current_ms` after a discontinuity.
    pub fn resync(&mut self, current_ms: f64) {
        self.schedule = self
            .grid
            .next_click_after(current_ms)
            .map(|next_click_ms| ClickSchedule { next_click_ms });
    }

    /// Move beat zero to `current_ms` so the next click lands one interval later.
    pub fn anchor_at(&mut self, current_ms: f64) {
        self.grid.beat_offset_ms = current_ms;
        self.resync(current_ms);
    }

    /// Called once per scheduler tick. Returns `true` when a click should fire.
    pub fn poll(&mut self, current_ms: f64) -> bool {
        if !self.is_active() {
            return false;
        }

        let scheduled = match self.schedule {
            Some(schedule) => schedule.next_click_ms,
            None => {
                self.resync(current_ms);
                return false;
            }
        };

        let due = self.grid.due_click(current_ms, scheduled);
        self.schedule = Some(ClickSchedule {
            next_click_ms: due.next_click_ms,
        });
        due.fire
    }
}
