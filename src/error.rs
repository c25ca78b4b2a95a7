//! Centralized error type for the clicktrack umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate boundaries.

use crate::jobs::JobKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] clicktrack_core::Error),

    #[error("Analysis: {0}")]
    Analysis(#[from] clicktrack_analysis::Error),

    #[error("No audio file loaded")]
    NoTrackLoaded,

    #[error("Busy: {0} in progress")]
    Busy(JobKind),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
