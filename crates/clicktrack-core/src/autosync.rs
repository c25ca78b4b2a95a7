//! Automatic tempo and phase detection.
//!
//! [`AutoSyncEngine`] delegates the DSP to a [`BeatDetector`] and turns its
//! output into a tempo plus the position of the first beat. Analysis is heavy;
//! run it off the scheduling thread and apply the result with
//! [`BeatAnalysis::apply_to`] once it completes.

use crate::transport::BeatClock;
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Raw output of a beat-tracking routine.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatDetection {
    pub tempo_bpm: f64,
    /// Beat positions in seconds from the start of the audio.
    pub beat_times_sec: Vec<f64>,
}

/// Beat-tracking routine.
pub trait BeatDetector: Send + Sync {
    /// Estimate tempo and beat positions of mono `samples`.
    fn detect_beats(&self, samples: &[f32], sample_rate: u32) -> Result<BeatDetection>;
}

impl<F> BeatDetector for F
where
    F: Fn(&[f32], u32) -> Result<BeatDetection> + Send + Sync,
{
    fn detect_beats(&self, samples: &[f32], sample_rate: u32) -> Result<BeatDetection> {
        self(samples, sample_rate)
    }
}

/// Tempo and phase ready to be fed into a [`BeatClock`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatAnalysis {
    pub bpm: f64,
    pub first_beat_offset_sec: f64,
    pub beat_count: usize,
}

impl BeatAnalysis {
    pub fn first_beat_offset_ms(&self) -> f64 {
        self.first_beat_offset_sec * 1000.0
    }

    /// Install the grid, enable the metronome and resync at `current_ms`.
    ///
    /// `current_ms` is the transport position when the analysis completes,
    /// which is generally not zero.
    pub fn apply_to(&self, clock: &mut BeatClock, current_ms: f64) -> Result<()> {
        clock.set_grid(self.bpm, self.first_beat_offset_ms())?;
        clock.set_enabled(true);
        clock.resync(current_ms);
        Ok(())
    }
}

/// Derives a beat grid from decoded audio.
#[derive(Clone)]
pub struct AutoSyncEngine {
    detector: Arc<dyn BeatDetector>,
}

impl AutoSyncEngine {
    pub fn new(detector: Arc<dyn BeatDetector>) -> Self {
        Self { detector }
    }

    pub fn analyze(&self, samples: &[f32], sample_rate: u32) -> Result<BeatAnalysis> {
        let detection = self.detector.detect_beats(samples, sample_rate)?;

        let Some(&first_beat) = detection.beat_times_sec.first() else {
            return Err(Error::NoBeatsDetected);
        };

        if !detection.tempo_bpm.is_finite() || detection.tempo_bpm <= 0.0 {
            return Err(Error::InvalidTempo(detection.tempo_bpm));
        }

        info!(
            "Auto-sync: {:.1} BPM, first beat at {:.3}s ({} beats)",
            detection.tempo_bpm,
            first_beat,
            detection.beat_times_sec.len()
        );

        Ok(BeatAnalysis {
            bpm: detection.tempo_bpm,
            first_beat_offset_sec: first_beat.max(0.0),
            beat_count: detection.beat_times_sec.len(),
        })
    }
}

impl fmt::Debug for AutoSyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSyncEngine").finish_non_exhaustive()
    }
}
