//! Error types for clicktrack-core.

use thiserror::Error;

/// Error type for clicktrack-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid BPM: {0}. Must be non-negative")]
    InvalidBpm(f64),

    #[error("Invalid beat offset: {0}ms")]
    InvalidBeatOffset(f64),

    #[error("Invalid tempo detected: {0:.1} BPM")]
    InvalidTempo(f64),

    #[error("No beats detected")]
    NoBeatsDetected,

    #[error("Invalid playback rate: {0}")]
    InvalidRate(f64),

    #[error("Invalid loop range: start={start}, end={end}")]
    InvalidLoopRange { start: f64, end: f64 },

    /// Transient failure against the playback engine. The scheduler skips the
    /// tick and retries on the next one.
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Click emission failed: {0}")]
    ClickEmission(String),

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[error("Beat detection failed: {0}")]
    Detection(String),

    #[cfg(feature = "audio-output")]
    #[error("Audio device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "audio-output")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "audio-output")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "audio-output")]
    #[error("Failed to enumerate devices")]
    DevicesError(#[from] cpal::DevicesError),

    #[cfg(feature = "audio-output")]
    #[error("Failed to get device name")]
    DeviceNameError(#[from] cpal::DeviceNameError),
}

impl Error {
    /// Whether the scheduler should treat this as a skipped tick rather than a failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransportUnavailable(_))
    }
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
