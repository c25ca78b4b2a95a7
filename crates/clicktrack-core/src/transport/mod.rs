pub(crate) mod beat_clock;
pub(crate) mod click;
pub(crate) mod clock;
pub(crate) mod loop_region;
pub(crate) mod media;
pub(crate) mod scheduler;
pub(crate) mod tap_tempo;

pub use beat_clock::{BeatClock, BeatGrid, ClickSchedule, DueClick};
pub use click::{ClickCounter, ClickEmitter, ClickSound, NullClick};
pub use clock::{ClockTransport, ManualTime, MonotonicTime, TimeSource};
pub use loop_region::{LoopController, LoopRegion, LoopState};
pub use media::{PlaybackRate, Transport, TransportState, DEFAULT_RATE_STEP, MAX_RATE, MIN_RATE};
pub use scheduler::{PlaybackScheduler, PositionObserver, TickContext, TickOutcome};
pub use tap_tempo::{
    BpmEstimate, TapTempoEstimator, DEFAULT_TAP_CAPACITY, DEFAULT_TAP_RESET_GAP_SECS,
};
