//! Analysis handle for convenient API access

use crate::{
    compute_summary, decode_file, BeatTracker, BeatTrackerConfig, DecodedAudio, OnsetDetector,
    OnsetEnvelope, Result, WaveformSummary,
};
use clicktrack_core::{BeatDetection, BeatDetector};
use std::path::Path;
use std::sync::Arc;

/// Frames per waveform block used by [`AnalysisHandle::waveform_summary`]
pub const DEFAULT_SAMPLES_PER_BLOCK: usize = 512;

/// Entry point for the offline analysis tools.
///
/// Everything here works on whole decoded tracks; the handle only carries the
/// beat tracker parameters.
#[derive(Debug, Clone, Default)]
pub struct AnalysisHandle {
    tracker: BeatTracker,
}

impl AnalysisHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracker_config(config: BeatTrackerConfig) -> Self {
        Self {
            tracker: BeatTracker::with_config(config),
        }
    }

    /// Decode a file into interleaved f32 samples.
    pub fn decode(&self, path: &Path) -> Result<DecodedAudio> {
        decode_file(path)
    }

    /// Onset strength envelope of the mono mixdown.
    pub fn onset_envelope(&self, audio: &DecodedAudio) -> OnsetEnvelope {
        let mut detector = OnsetDetector::new(audio.sample_rate as f64);
        detector.compute(&audio.to_mono())
    }

    /// Tempo and beat times of the mono mixdown.
    pub fn detect_beats(&self, audio: &DecodedAudio) -> BeatDetection {
        self.tracker.track(&audio.to_mono(), audio.sample_rate)
    }

    /// Waveform overview at [`DEFAULT_SAMPLES_PER_BLOCK`] frames per block.
    pub fn waveform_summary(&self, audio: &DecodedAudio) -> WaveformSummary {
        compute_summary(&audio.samples, audio.channels, DEFAULT_SAMPLES_PER_BLOCK)
    }

    /// The beat tracker as a shareable detector for auto-sync.
    pub fn beat_detector(&self) -> Arc<dyn BeatDetector> {
        Arc::new(self.tracker.clone())
    }
}
