//! Loop region selection and enforcement.
//!
//! Selection is an explicit state machine:
//!
//! ```text
//! Idle --begin--> Selecting --update--> Selecting --finalize--> Selected
//!  ^                                                               |
//!  +---------------------- clear / stop / new file ----------------+
//! ```

use tracing::debug;

/// A loop region in seconds of transport time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRegion {
    pub start_sec: f64,
    pub end_sec: f64,
    /// Inactive regions are retained but not enforced.
    pub active: bool,
}

impl LoopRegion {
    /// Build an active region, swapping the bounds if reversed.
    pub fn new(a: f64, b: f64) -> Self {
        let (start_sec, end_sec) = if a <= b { (a, b) } else { (b, a) };
        Self {
            start_sec,
            end_sec,
            active: true,
        }
    }

    pub fn length_sec(&self) -> f64 {
        self.end_sec - self.start_sec
    }

    pub fn contains(&self, sec: f64) -> bool {
        sec >= self.start_sec && sec < self.end_sec
    }
}

/// Selection state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    /// A region is being dragged out; `end_sec` is `None` until the first update.
    Selecting { start_sec: f64, end_sec: Option<f64> },
    Selected(LoopRegion),
}

/// Owns the loop region and decides when the transport must jump back.
#[derive(Debug, Clone)]
pub struct LoopController {
    state: LoopState,
    /// Cleared after a jump until the head is observed inside the region again.
    armed: bool,
}

impl LoopController {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            armed: true,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// The finalized region, if any.
    pub fn region(&self) -> Option<LoopRegion> {
        match self.state {
            LoopState::Selected(region) => Some(region),
            _ => None,
        }
    }

    /// Current bounds for display: the in-progress selection or the finalized region.
    pub fn selection_bounds(&self) -> Option<(f64, f64)> {
        match self.state {
            LoopState::Idle => None,
            LoopState::Selecting { start_sec, end_sec } => {
                Some((start_sec, end_sec.unwrap_or(start_sec)))
            }
            LoopState::Selected(region) => Some((region.start_sec, region.end_sec)),
        }
    }

    /// Start a new selection. Any previous region is discarded.
    pub fn begin_selection(&mut self, start_sec: f64) {
        self.state = LoopState::Selecting {
            start_sec: start_sec.max(0.0),
            end_sec: None,
        };
    }

    /// Move the open end of the selection. Ignored unless selecting.
    pub fn update_selection(&mut self, end_sec: f64) {
        if let LoopState::Selecting { start_sec, .. } = self.state {
            self.state = LoopState::Selecting {
                start_sec,
                end_sec: Some(end_sec.max(0.0)),
            };
        }
    }

    /// Close the selection at `end_sec` and start enforcing it.
    ///
    /// Returns `None` when no selection is open, or when the selection has
    /// zero length (the controller then returns to idle).
    pub fn finalize_selection(&mut self, end_sec: f64) -> Option<LoopRegion> {
        let LoopState::Selecting { start_sec, .. } = self.state else {
            return None;
        };

        let region = LoopRegion::new(start_sec, end_sec.max(0.0));
        if region.length_sec() <= 0.0 {
            debug!("Discarding zero-length loop selection at {:.3}s", start_sec);
            self.state = LoopState::Idle;
            return None;
        }

        debug!(
            "Loop finalized: start={:.3}s end={:.3}s",
            region.start_sec, region.end_sec
        );
        self.state = LoopState::Selected(region);
        self.armed = true;
        Some(region)
    }

    /// Enable or disable enforcement of the finalized region without discarding it.
    pub fn set_active(&mut self, active: bool) {
        if let LoopState::Selected(ref mut region) = self.state {
            region.active = active;
            self.armed = true;
        }
    }

    pub fn is_active(&self) -> bool {
        self.region().is_some_and(|r| r.active)
    }

    /// Seek target when the head has crossed the end of an active region.
    ///
    /// Returns the loop start once per crossing; the caller seeks there and
    /// resyncs the beat clock at the new position.
    pub fn check_and_apply(&mut self, current_sec: f64) -> Option<f64> {
        let region = self.region().filter(|r| r.active)?;

        if current_sec < region.end_sec {
            self.armed = true;
            return None;
        }

        if !self.armed {
            return None;
        }

        self.armed = false;
        Some(region.start_sec)
    }

    /// Undo the disarm of the last `check_and_apply` when its seek failed.
    pub(crate) fn rearm(&mut self) {
        self.armed = true;
    }

    /// Deactivate and discard the region.
    pub fn clear(&mut self) {
        self.state = LoopState::Idle;
        self.armed = true;
    }
}

impl Default for LoopController {
    fn default() -> Self {
        Self::new()
    }
}
