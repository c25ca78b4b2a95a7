//! Test helpers and fixtures for clicktrack integration tests
//!
//! Engines run headless on a hand-driven clock with the scheduler thread
//! off, so every tick happens at a position chosen by the test.

#![allow(dead_code)]

use clicktrack::core::BeatDetection;
use clicktrack::prelude::*;
use clicktrack::{BeatDetector, ClickCounter, DecodedAudio, TickOutcome};
use crossbeam_channel::Receiver;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Low rate keeps generated tracks small.
pub const TEST_SAMPLE_RATE: u32 = 8000;

/// Upper bound for background jobs to finish.
pub const JOB_TIMEOUT: Duration = Duration::from_secs(10);

/// A headless engine and the handles that drive and observe it.
pub struct Rig {
    pub engine: ClickTrackEngine,
    pub time: ManualTime,
    pub clicks: ClickCounter,
}

impl Rig {
    /// Set the clock to `clock_ms` and tick. Playback started at clock zero
    /// reads the same position until a seek or rate change.
    pub fn tick_at(&self, clock_ms: u64) -> TickOutcome {
        self.time.set_secs(clock_ms as f64 / 1000.0);
        self.engine.tick()
    }

    /// Advance the clock by `ms` and tick.
    pub fn advance_and_tick(&self, ms: u64) -> TickOutcome {
        self.time.advance_ms(ms);
        self.engine.tick()
    }
}

/// Builder wired to a shared manual clock and a click counter.
pub fn rig_builder(time: &ManualTime, clicks: &ClickCounter) -> ClickTrackEngineBuilder {
    ClickTrackEngine::builder()
        .backend(HeadlessBackend::new(time.clone()).with_click_counter(clicks.clone()))
        .tap_clock(time.clone())
        .scheduler_thread(false)
}

/// Headless engine with default parts.
pub fn test_rig() -> Rig {
    build_rig(|builder| builder)
}

/// Headless engine with extra builder settings.
pub fn build_rig(
    configure: impl FnOnce(ClickTrackEngineBuilder) -> ClickTrackEngineBuilder,
) -> Rig {
    let time = ManualTime::new();
    let clicks = ClickCounter::new();
    let engine = configure(rig_builder(&time, &clicks))
        .build()
        .expect("Failed to create test engine");
    Rig {
        engine,
        time,
        clicks,
    }
}

/// Headless engine with a silent mono track of `secs` loaded.
pub fn rig_with_track(secs: f64) -> Rig {
    let rig = test_rig();
    rig.engine
        .load_audio("test.wav", silent_track(secs))
        .expect("Failed to load test track");
    rig
}

/// Mono silence.
pub fn silent_track(secs: f64) -> DecodedAudio {
    DecodedAudio {
        samples: vec![0.0; (secs * TEST_SAMPLE_RATE as f64) as usize],
        channels: 1,
        sample_rate: TEST_SAMPLE_RATE,
    }
}

/// Mono clicks at `bpm` starting at `first_beat_sec`.
pub fn click_train(bpm: f64, first_beat_sec: f64, secs: f64, sample_rate: u32) -> Vec<f32> {
    let len = (secs * sample_rate as f64) as usize;
    let mut samples = vec![0.0f32; len];
    let interval = 60.0 / bpm;

    let mut beat = first_beat_sec;
    while beat < secs {
        let start = (beat * sample_rate as f64) as usize;
        for (i, sample) in samples.iter_mut().skip(start).take(80).enumerate() {
            *sample = 0.9 * (1.0 - i as f32 / 80.0);
        }
        beat += interval;
    }
    samples
}

/// Write mono samples as a 16-bit WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV");
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value).expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV");
}

/// Detector that always reports `bpm` with beats at `beats`.
pub fn fixed_detector(bpm: f64, beats: Vec<f64>) -> Arc<dyn BeatDetector> {
    Arc::new(
        move |_samples: &[f32], _sample_rate: u32| -> clicktrack::core::Result<BeatDetection> {
            Ok(BeatDetection {
                tempo_bpm: bpm,
                beat_times_sec: beats.clone(),
            })
        },
    )
}

/// Downloader that writes a short WAV, optionally waiting for a release
/// signal after reporting half progress.
pub struct FakeDownloader {
    pub gate: Option<Receiver<()>>,
    pub secs: f64,
}

impl FakeDownloader {
    pub fn immediate(secs: f64) -> Self {
        Self { gate: None, secs }
    }

    pub fn gated(secs: f64, gate: Receiver<()>) -> Self {
        Self {
            gate: Some(gate),
            secs,
        }
    }
}

impl Downloader for FakeDownloader {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut dyn FnMut(f32),
    ) -> clicktrack::Result<()> {
        if url.contains("missing") {
            return Err(clicktrack::Error::Download("video unavailable".into()));
        }
        progress(0.5);
        if let Some(gate) = &self.gate {
            gate.recv_timeout(JOB_TIMEOUT)
                .map_err(|e| clicktrack::Error::Download(e.to_string()))?;
        }
        let samples = click_train(120.0, 0.25, self.secs, TEST_SAMPLE_RATE);
        write_wav(dest, &samples, TEST_SAMPLE_RATE);
        progress(1.0);
        Ok(())
    }
}
