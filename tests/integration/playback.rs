//! Playback integration tests
//!
//! Load, transport control, skipping, rate and end of media.

use crate::helpers::*;
use approx::assert_relative_eq;
use clicktrack::prelude::*;
use clicktrack::TickOutcome;
use std::time::{Duration, Instant};

#[test]
fn test_load_audio_leaves_playback_stopped() {
    let rig = rig_with_track(100.0);

    assert!(rig.engine.has_track());
    assert!(!rig.engine.is_playing());
    assert_eq!(rig.engine.status(), "Loaded file: test.wav");

    let snapshot = rig.engine.snapshot();
    assert_eq!(snapshot.track.as_deref(), Some("test.wav"));
    assert_eq!(snapshot.duration_ms, 100_000);
    assert_eq!(snapshot.position_ms, 0);
    assert!(!snapshot.metronome_enabled);
    assert!(snapshot.loop_region.is_none());
}

#[test]
fn test_load_file_from_wav() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    write_wav(&path, &click_train(120.0, 0.0, 4.0, TEST_SAMPLE_RATE), TEST_SAMPLE_RATE);

    let rig = test_rig();
    rig.engine.load_file(&path).unwrap();

    assert_eq!(rig.engine.status(), "Loaded file: clip.wav");
    assert_eq!(rig.engine.snapshot().duration_ms, 4000);

    let waveform = rig.engine.waveform().unwrap();
    assert!(!waveform.is_empty());
    assert!(waveform.peak() > 0.5);
}

#[test]
fn test_load_file_missing_reports_error() {
    let rig = test_rig();
    let result = rig.engine.load_file("/nonexistent/track.mp3");

    assert!(result.is_err());
    assert!(!rig.engine.has_track());
    assert!(rig.engine.status().starts_with("Error loading file:"));
}

#[test]
fn test_controls_without_track() {
    let rig = test_rig();

    assert!(matches!(rig.engine.play(), Err(Error::NoTrackLoaded)));
    assert_eq!(rig.engine.status(), "No audio file loaded.");
    assert!(matches!(rig.engine.pause(), Err(Error::NoTrackLoaded)));
    assert!(matches!(rig.engine.rewind(), Err(Error::NoTrackLoaded)));
    assert!(matches!(rig.engine.skip_forward(), Err(Error::NoTrackLoaded)));
    assert!(matches!(
        rig.engine.begin_loop_selection(1.0),
        Err(Error::NoTrackLoaded)
    ));
    assert!(matches!(rig.engine.tick(), TickOutcome::Idle));
}

#[test]
fn test_play_pause_resume() {
    let rig = rig_with_track(100.0);

    rig.engine.play().unwrap();
    assert!(rig.engine.is_playing());
    assert_eq!(rig.engine.status(), "Playing test.wav");

    rig.tick_at(1500);
    assert_eq!(rig.engine.position_ms(), 1500);

    rig.engine.pause().unwrap();
    assert_eq!(rig.engine.status(), "Paused.");
    let snapshot = rig.engine.snapshot();
    assert!(!snapshot.playing);
    assert!(snapshot.paused);

    // Time passes while paused; no ticks advance the head
    assert!(matches!(rig.tick_at(4500), TickOutcome::Idle));
    assert_eq!(rig.engine.position_ms(), 1500);

    rig.engine.pause().unwrap();
    assert_eq!(rig.engine.status(), "Resumed.");
    assert!(rig.engine.is_playing());

    rig.advance_and_tick(500);
    assert_eq!(rig.engine.position_ms(), 2000);
}

#[test]
fn test_toggle_play_pause() {
    let rig = rig_with_track(10.0);

    rig.engine.toggle_play_pause().unwrap();
    assert!(rig.engine.is_playing());

    rig.engine.toggle_play_pause().unwrap();
    assert!(!rig.engine.is_playing());
    assert_eq!(rig.engine.status(), "Paused.");

    rig.engine.toggle_play_pause().unwrap();
    assert!(rig.engine.is_playing());
}

#[test]
fn test_stop_is_idempotent() {
    let rig = rig_with_track(100.0);
    rig.engine.play().unwrap();
    rig.tick_at(3000);

    rig.engine.stop();
    rig.engine.stop();

    assert!(!rig.engine.is_playing());
    assert_eq!(rig.engine.position_ms(), 0);
    assert_eq!(rig.engine.status(), "Stopped.");

    // Also a no-op with nothing loaded
    let empty = test_rig();
    empty.engine.stop();
    assert_eq!(empty.engine.status(), "Stopped.");
}

#[test]
fn test_play_after_stop_starts_from_zero() {
    let rig = rig_with_track(100.0);
    rig.engine.play().unwrap();
    rig.tick_at(3000);
    rig.engine.stop();

    rig.engine.play().unwrap();
    rig.advance_and_tick(250);
    assert_eq!(rig.engine.position_ms(), 250);
}

#[test]
fn test_rewind_restarts_playback() {
    let rig = rig_with_track(100.0);
    rig.engine.play().unwrap();
    rig.tick_at(5000);

    rig.engine.rewind().unwrap();
    assert_eq!(rig.engine.status(), "Rewound to beginning.");
    assert!(rig.engine.is_playing());
    assert_eq!(rig.engine.position_ms(), 0);

    rig.tick_at(5500);
    assert_eq!(rig.engine.position_ms(), 500);
}

#[test]
fn test_skip_forward_and_backward() {
    let rig = rig_with_track(100.0);
    rig.engine.play().unwrap();
    rig.tick_at(5000);

    rig.engine.skip_forward().unwrap();
    assert_eq!(rig.engine.position_ms(), 15_000);
    assert_eq!(rig.engine.status(), "Skipped to 15.0s");

    rig.engine.skip_backward().unwrap();
    assert_eq!(rig.engine.position_ms(), 5000);

    // Clamped at the start
    rig.engine.skip_backward().unwrap();
    assert_eq!(rig.engine.position_ms(), 0);
    assert_eq!(rig.engine.status(), "Skipped to 0.0s");
    assert!(rig.engine.is_playing());
}

#[test]
fn test_skip_past_end_stops() {
    let rig = rig_with_track(20.0);
    rig.engine.play().unwrap();
    rig.tick_at(15_000);

    rig.engine.skip_forward().unwrap();

    assert_eq!(rig.engine.status(), "Reached end of audio.");
    assert!(!rig.engine.is_playing());
    assert_eq!(rig.engine.position_ms(), 0);
}

#[test]
fn test_end_of_media_finishes_playback() {
    let rig = rig_with_track(3.0);
    rig.engine.play().unwrap();

    assert!(matches!(
        rig.tick_at(2000),
        TickOutcome::Continue {
            position_ms: 2000,
            ..
        }
    ));
    assert!(matches!(rig.tick_at(3000), TickOutcome::Ended));
    assert_eq!(rig.engine.status(), "Playback finished.");
    assert!(!rig.engine.is_playing());
    assert_eq!(rig.engine.position_ms(), 0);

    assert!(matches!(rig.tick_at(3500), TickOutcome::Idle));
}

#[test]
fn test_set_rate_rounds_and_clamps() {
    let rig = rig_with_track(100.0);

    assert_relative_eq!(rig.engine.set_rate(1.23).unwrap(), 1.2);
    assert_relative_eq!(rig.engine.set_rate(5.0).unwrap(), 2.0);
    assert_relative_eq!(rig.engine.set_rate(0.1).unwrap(), 0.5);
    assert_relative_eq!(rig.engine.rate(), 0.5);
    assert!(rig.engine.set_rate(f64::NAN).is_err());
    assert_relative_eq!(rig.engine.rate(), 0.5);
}

#[test]
fn test_rate_scales_transport_time() {
    let rig = rig_with_track(100.0);
    rig.engine.set_rate(2.0).unwrap();
    rig.engine.play().unwrap();

    rig.tick_at(1000);
    assert_eq!(rig.engine.position_ms(), 2000);
}

#[test]
fn test_load_resets_rate() {
    let rig = rig_with_track(100.0);
    rig.engine.set_rate(1.5).unwrap();

    rig.engine.load_audio("other.wav", silent_track(5.0)).unwrap();
    assert_relative_eq!(rig.engine.rate(), 1.0);
    assert_eq!(rig.engine.status(), "Loaded file: other.wav");
}

#[test]
fn test_scheduler_thread_runs_to_end() {
    let engine = ClickTrackEngine::builder()
        .headless()
        .tick_interval(Duration::from_millis(5))
        .build()
        .unwrap();
    engine.load_audio("short.wav", silent_track(0.2)).unwrap();
    engine.play().unwrap();

    let deadline = Instant::now() + JOB_TIMEOUT;
    while engine.is_playing() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }

    assert!(!engine.is_playing());
    assert_eq!(engine.status(), "Playback finished.");

    // A finished runner is replaced on the next play
    engine.play().unwrap();
    assert!(engine.is_playing());
    engine.stop();
}

proptest::proptest! {
    #[test]
    fn test_applied_rate_on_step_grid(value in -5.0f64..5.0) {
        let rig = rig_with_track(1.0);
        let rate = rig.engine.set_rate(value).unwrap();

        proptest::prop_assert!((0.5..=2.0).contains(&rate));
        let steps = rate * 10.0;
        proptest::prop_assert!((steps - steps.round()).abs() < 1e-6);
    }
}
