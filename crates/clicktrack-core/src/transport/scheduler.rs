//! Per-tick orchestration of transport, loop and metronome.
//!
//! [`PlaybackScheduler`] owns none of the state it drives. Each call to
//! [`PlaybackScheduler::tick`] borrows the collaborators through a
//! [`TickContext`] and runs, in order:
//!
//! 1. read the transport position,
//! 2. stop on end of media (terminal),
//! 3. enforce the loop region, resyncing the beat clock after the jump,
//! 4. fire a click if one is due,
//! 5. report the position to the observer.
//!
//! A tick either completes or is abandoned as a whole. Transport failures
//! skip the tick and never stop the loop.

use super::beat_clock::BeatClock;
use super::click::ClickEmitter;
use super::loop_region::LoopController;
use super::media::Transport;
use crate::Result;
use tracing::{debug, info, warn};

/// Receives the playhead position once per completed tick.
pub trait PositionObserver {
    fn on_position(&mut self, position_ms: u64);
}

impl<F: FnMut(u64)> PositionObserver for F {
    fn on_position(&mut self, position_ms: u64) {
        self(position_ms)
    }
}

/// Collaborators borrowed for one tick.
pub struct TickContext<'a> {
    pub transport: &'a mut dyn Transport,
    pub beat_clock: &'a mut BeatClock,
    pub looper: &'a mut LoopController,
    pub click: &'a mut dyn ClickEmitter,
    pub observer: Option<&'a mut dyn PositionObserver>,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Scheduler stopped or transport not rolling; nothing was read.
    Idle,
    /// Tick completed.
    Continue {
        position_ms: u64,
        clicked: bool,
        /// Loop start the transport was sent to, if the loop end was crossed.
        looped_to_ms: Option<u64>,
    },
    /// Transport failed; retried next tick.
    Skipped,
    /// Media reached its end. Scheduling has stopped and the transport is reset.
    Ended,
}

impl TickOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TickOutcome::Ended)
    }
}

/// Polling scheduler. Drive it from a timer, a thread or an event loop.
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    running: bool,
    ticks: u64,
    skipped: u64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Completed ticks since creation.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Ticks abandoned because of transport failures.
    pub fn skipped_count(&self) -> u64 {
        self.skipped
    }

    pub fn tick(&mut self, ctx: TickContext<'_>) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }

        match self.run_tick(ctx) {
            Ok(outcome) => {
                if !matches!(outcome, TickOutcome::Idle) {
                    self.ticks += 1;
                }
                outcome
            }
            Err(e) => {
                self.skipped += 1;
                if e.is_transient() {
                    debug!("Skipping tick: {}", e);
                } else {
                    warn!("Skipping tick after transport error: {}", e);
                }
                TickOutcome::Skipped
            }
        }
    }

    fn run_tick(&mut self, ctx: TickContext<'_>) -> Result<TickOutcome> {
        let TickContext {
            transport,
            beat_clock,
            looper,
            click,
            observer,
        } = ctx;

        if !transport.is_playing() {
            return Ok(TickOutcome::Idle);
        }

        let mut position_ms = transport.position_ms()?;

        if transport.is_ended()? {
            info!("Playback reached end of media at {}ms", position_ms);
            self.running = false;
            if let Err(e) = transport.stop() {
                warn!("Failed to stop transport at end of media: {}", e);
            }
            if let Err(e) = click.silence() {
                warn!("Failed to silence click: {}", e);
            }
            beat_clock.resync(0.0);
            looper.clear();
            return Ok(TickOutcome::Ended);
        }

        let mut looped_to_ms = None;
        if let Some(start_sec) = looper.check_and_apply(position_ms as f64 / 1000.0) {
            let target_ms = (start_sec * 1000.0).round() as u64;
            if let Err(e) = transport.seek(target_ms) {
                // The crossing is still pending; retry it next tick
                looper.rearm();
                return Err(e);
            }
            debug!("Loop: {}ms -> {}ms", position_ms, target_ms);
            beat_clock.resync(target_ms as f64);
            position_ms = target_ms;
            looped_to_ms = Some(target_ms);
        }

        let clicked = beat_clock.poll(position_ms as f64);
        if clicked {
            if let Err(e) = click.play_click() {
                warn!("Click emission failed: {}", e);
            }
        }

        if let Some(observer) = observer {
            observer.on_position(position_ms);
        }

        Ok(TickOutcome::Continue {
            position_ms,
            clicked,
            looped_to_ms,
        })
    }
}
