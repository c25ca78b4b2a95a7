//! # Clicktrack - Metronome Synchronized to a Track
//!
//! Plays an audio file with a click on every beat, for practising along
//! with recordings.
//!
//! ## Architecture
//!
//! Clicktrack is an umbrella crate that coordinates:
//! - **clicktrack-core** - Beat clock, tap tempo, loop region, playback scheduler, CPAL output
//! - **clicktrack-analysis** - Decoding, onset envelope, beat tracking, waveform summary
//!
//! and adds the [`ClickTrackEngine`] control surface, background download and
//! auto-sync jobs, and the `clicktrack` binary.
//!
//! ## Quick Start
//!
//! ```ignore
//! use clicktrack::prelude::*;
//!
//! let engine = ClickTrackEngine::builder().build()?;
//! engine.load_file("song.mp3")?;
//!
//! // Either set the tempo by hand...
//! engine.set_bpm(96.0)?;
//! engine.set_metronome_enabled(true);
//!
//! // ...or detect it
//! engine.start_auto_sync()?;
//! while engine.poll_jobs().is_none() {
//!     std::thread::sleep(std::time::Duration::from_millis(50));
//! }
//!
//! engine.play()?;
//! ```
//!
//! ## Feature Flags
//!
//! - `audio-output` (default) - Play through CPAL; without it only the headless backend exists
//! - `serialization` - Serde derives on analysis types

/// Re-export of clicktrack-core for direct access
pub use clicktrack_core as core;

/// Re-export of clicktrack-analysis for direct access
pub use clicktrack_analysis as analysis;

pub use clicktrack_core::{
    BeatAnalysis, BeatClock, BeatDetection, BeatDetector, BpmEstimate, ClickCounter,
    ClickTrackConfig, LoopRegion, LoopState, ManualTime, MonotonicTime, PlaybackRate,
    TickOutcome, TimeSource, Transport,
};

pub use clicktrack_analysis::{AnalysisHandle, BeatTracker, DecodedAudio, WaveformSummary};

mod backend;
mod builder;
mod download;
mod engine;
mod error;
mod jobs;

pub use backend::{HeadlessBackend, PlaybackBackend, Player};
pub use builder::ClickTrackEngineBuilder;
pub use download::{parse_progress_line, Downloader, YtDlpDownloader};
pub use engine::{ClickTrackEngine, EngineSnapshot, JobOutcome};
pub use error::{Error, Result};
pub use jobs::{JobHandle, JobKind, JobStatus, ProgressSender};

#[cfg(feature = "audio-output")]
pub use backend::AudioBackend;

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{ClickTrackEngine, ClickTrackEngineBuilder, EngineSnapshot, JobOutcome};

    // Backends and jobs
    pub use crate::{Downloader, HeadlessBackend, JobKind, PlaybackBackend, YtDlpDownloader};

    // Time and metronome types
    pub use crate::{BpmEstimate, ClickTrackConfig, LoopRegion, ManualTime, MonotonicTime};

    #[cfg(feature = "audio-output")]
    pub use crate::AudioBackend;

    pub use crate::{Error, Result};
}
