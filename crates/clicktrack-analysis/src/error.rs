//! Error types for clicktrack-analysis.

use thiserror::Error;

/// Error type for decoding and analysis.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("No audio track found")]
    NoAudioTrack,

    #[error("Audio contains no samples")]
    EmptyAudio,
}

impl From<Error> for clicktrack_core::Error {
    fn from(e: Error) -> Self {
        clicktrack_core::Error::Detection(e.to_string())
    }
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
