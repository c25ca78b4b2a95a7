//! Metronome/transport synchronization kernel.
//!
//! # Primary API
//!
//! - [`BeatClock`]: beat grid plus click schedule, polled once per tick
//! - [`TapTempoEstimator`]: BPM from user taps
//! - [`LoopController`]: loop region selection and enforcement
//! - [`PlaybackScheduler`]: per-tick orchestration of the above against a [`Transport`]
//! - [`AutoSyncEngine`]: tempo and phase from a [`BeatDetector`]
//! - [`SchedulerThread`]: runs the tick on a dedicated thread
//!
//! # Feature-gated APIs
//!
//! - `"audio-output"`: [`AudioOutput`], CPAL playback with the click mixed in (enabled by default)
//!
//! # Example
//!
//! ```ignore
//! use clicktrack_core::prelude::*;
//!
//! let time = ManualTime::new();
//! let mut transport = ClockTransport::new(time.clone(), 100_000);
//! let mut beat_clock = BeatClock::new();
//! beat_clock.set_grid(60.0, 0.0)?;
//! beat_clock.set_enabled(true);
//!
//! let mut scheduler = PlaybackScheduler::new();
//! transport.play()?;
//! scheduler.start();
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::ClickTrackConfig;

pub mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag};

pub mod transport;
pub use transport::{
    BeatClock, BeatGrid, BpmEstimate, ClickCounter, ClickEmitter, ClickSchedule, ClickSound,
    ClockTransport, DueClick, LoopController, LoopRegion, LoopState, ManualTime, MonotonicTime,
    NullClick, PlaybackRate, PlaybackScheduler, PositionObserver, TapTempoEstimator, TickContext,
    TickOutcome, TimeSource, Transport, TransportState,
};

pub mod autosync;
pub use autosync::{AutoSyncEngine, BeatAnalysis, BeatDetection, BeatDetector};

mod runner;
pub use runner::SchedulerThread;

#[cfg(feature = "audio-output")]
mod output;
#[cfg(feature = "audio-output")]
pub use output::{AudioOutput, OutputClick, OutputTransport, PcmTrack};

pub mod prelude {
    pub use crate::{
        AutoSyncEngine, BeatClock, BeatDetector, ClickEmitter, ClickTrackConfig, ClockTransport,
        LoopController, ManualTime, MonotonicTime, PlaybackRate, PlaybackScheduler,
        TapTempoEstimator, TickContext, TickOutcome, Transport,
    };
    pub use crate::{Error, Result};
}
