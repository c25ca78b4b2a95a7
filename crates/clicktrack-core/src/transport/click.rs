//! Click sound and the emitter boundary.

use crate::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Sink for metronome clicks.
///
/// `play_click` is fire-and-forget and must not block the scheduler tick.
pub trait ClickEmitter: Send {
    fn play_click(&mut self) -> Result<()>;

    /// Cut off a click that is still ringing (pause, stop).
    fn silence(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<C: ClickEmitter + ?Sized> ClickEmitter for Box<C> {
    fn play_click(&mut self) -> Result<()> {
        (**self).play_click()
    }

    fn silence(&mut self) -> Result<()> {
        (**self).silence()
    }
}

/// Mono click buffer: 1 kHz sine, 50 ms, -10 dB, 20 ms linear fade-out.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickSound {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl ClickSound {
    pub const FREQUENCY_HZ: f64 = 1000.0;
    pub const DURATION_SECS: f64 = 0.05;
    pub const GAIN_DB: f64 = -10.0;
    pub const FADE_OUT_SECS: f64 = 0.02;

    pub fn generate(sample_rate: u32) -> Self {
        let sr = sample_rate as f64;
        let num_samples = (sr * Self::DURATION_SECS) as usize;
        let fade_samples = ((sr * Self::FADE_OUT_SECS) as usize).min(num_samples);
        let fade_start = num_samples - fade_samples;
        let gain = 10f64.powf(Self::GAIN_DB / 20.0);

        let samples = (0..num_samples)
            .map(|i| {
                let t = i as f64 / sr;
                let env = if i < fade_start || fade_samples == 0 {
                    1.0
                } else {
                    1.0 - (i - fade_start) as f64 / fade_samples as f64
                };
                let phase = 2.0 * std::f64::consts::PI * Self::FREQUENCY_HZ * t;
                (phase.sin() * gain * env) as f32
            })
            .collect();

        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Discards clicks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClick;

impl ClickEmitter for NullClick {
    fn play_click(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Counts clicks and silences. Clones share the counters.
#[derive(Debug, Clone, Default)]
pub struct ClickCounter {
    clicks: Arc<AtomicUsize>,
    silences: Arc<AtomicUsize>,
}

impl ClickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::Acquire)
    }

    pub fn silences(&self) -> usize {
        self.silences.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.clicks.store(0, Ordering::Release);
        self.silences.store(0, Ordering::Release);
    }
}

impl ClickEmitter for ClickCounter {
    fn play_click(&mut self) -> Result<()> {
        self.clicks.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn silence(&mut self) -> Result<()> {
        self.silences.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
