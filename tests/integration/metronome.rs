//! Metronome integration tests
//!
//! Clicks against the beat grid, offsets, tap tempo and resync after
//! transport jumps.

use crate::helpers::*;
use approx::assert_relative_eq;
use clicktrack::core::Error as CoreError;
use clicktrack::prelude::*;
use clicktrack::TickOutcome;

fn clicked(outcome: TickOutcome) -> bool {
    matches!(outcome, TickOutcome::Continue { clicked: true, .. })
}

#[test]
fn test_clicks_land_on_beat_grid() {
    let rig = rig_with_track(100.0);
    rig.engine.set_bpm(60.0).unwrap();
    rig.engine.set_beat_offset_ms(0.0).unwrap();
    rig.engine.set_metronome_enabled(true);
    rig.engine.play().unwrap();

    assert!(!clicked(rig.tick_at(0)));
    assert!(!clicked(rig.tick_at(999)));
    assert!(clicked(rig.tick_at(1000)));
    assert!(!clicked(rig.tick_at(1999)));
    assert!(clicked(rig.tick_at(2000)));

    assert_eq!(rig.clicks.clicks(), 2);
}

#[test]
fn test_beat_offset_shifts_clicks() {
    let rig = rig_with_track(100.0);
    rig.engine.set_bpm(120.0).unwrap();
    rig.engine.set_beat_offset_ms(250.0).unwrap();
    rig.engine.set_metronome_enabled(true);
    rig.engine.play().unwrap();

    assert!(!clicked(rig.tick_at(100)));
    assert!(clicked(rig.tick_at(250)));
    assert!(!clicked(rig.tick_at(500)));
    assert!(clicked(rig.tick_at(750)));
    assert_eq!(rig.clicks.clicks(), 2);

    let snapshot = rig.engine.snapshot();
    assert_relative_eq!(snapshot.bpm, 120.0);
    assert_relative_eq!(snapshot.beat_offset_ms, 250.0);
}

#[test]
fn test_disabled_metronome_is_silent() {
    let rig = rig_with_track(100.0);
    rig.engine.set_bpm(60.0).unwrap();
    rig.engine.play().unwrap();

    for ms in [500, 1000, 1500] {
        rig.tick_at(ms);
    }
    assert_eq!(rig.clicks.clicks(), 0);

    // Enabling mid-beat schedules the next grid beat, not an immediate click
    rig.engine.set_metronome_enabled(true);
    assert!(!clicked(rig.tick_at(1600)));
    assert!(clicked(rig.tick_at(2000)));
    assert_eq!(rig.clicks.clicks(), 1);
}

#[test]
fn test_long_stall_fires_single_click() {
    let rig = rig_with_track(100.0);
    rig.engine.set_bpm(120.0).unwrap();
    rig.engine.set_metronome_enabled(true);
    rig.engine.play().unwrap();

    rig.tick_at(0);
    assert!(clicked(rig.tick_at(2600)));
    assert_eq!(rig.clicks.clicks(), 1);

    assert!(!clicked(rig.tick_at(2900)));
    assert!(clicked(rig.tick_at(3000)));
    assert_eq!(rig.clicks.clicks(), 2);
}

#[test]
fn test_resume_resyncs_at_pause_point() {
    let rig = rig_with_track(100.0);
    rig.engine.set_bpm(60.0).unwrap();
    rig.engine.set_metronome_enabled(true);
    rig.engine.play().unwrap();

    assert!(clicked(rig.tick_at(1000)));
    rig.tick_at(1200);
    rig.engine.pause().unwrap();

    rig.time.set_secs(5.0);
    rig.engine.pause().unwrap();

    // Transport resumes at 1200ms; the next beat is 2000ms
    assert!(!clicked(rig.tick_at(5700)));
    assert!(clicked(rig.tick_at(5800)));
    assert_eq!(rig.engine.position_ms(), 2000);
    assert_eq!(rig.clicks.clicks(), 2);
}

#[test]
fn test_skip_resyncs_schedule() {
    let rig = rig_with_track(100.0);
    rig.engine.set_bpm(60.0).unwrap();
    rig.engine.set_metronome_enabled(true);
    rig.engine.play().unwrap();

    rig.tick_at(500);
    rig.engine.skip(10.2).unwrap();
    assert_eq!(rig.engine.position_ms(), 10_700);

    // No burst for the skipped beats; next click at 11000ms
    assert!(!clicked(rig.tick_at(600)));
    assert!(clicked(rig.tick_at(800)));
    assert_eq!(rig.clicks.clicks(), 1);
}

#[test]
fn test_tap_tempo_sets_bpm_and_clicks() {
    let rig = rig_with_track(100.0);
    rig.engine.play().unwrap();
    rig.tick_at(1000);

    assert!(rig.engine.tap().unwrap().is_none());
    assert_eq!(rig.clicks.clicks(), 0);

    rig.time.advance_ms(500);
    let estimate = rig.engine.tap().unwrap().unwrap();
    assert_relative_eq!(estimate.bpm, 120.0);
    assert_eq!(rig.engine.status(), "Tap Tempo: 120.0 BPM");
    assert_eq!(rig.clicks.clicks(), 1);

    let snapshot = rig.engine.snapshot();
    assert!(snapshot.metronome_enabled);
    assert_relative_eq!(snapshot.bpm, 120.0);
    assert_relative_eq!(snapshot.beat_offset_ms, 1500.0);

    // Beat zero is the tap; next click one interval later
    assert!(!clicked(rig.tick_at(1900)));
    assert!(clicked(rig.tick_at(2000)));
    assert_eq!(rig.clicks.clicks(), 2);
}

#[test]
fn test_tap_gap_restarts_estimate() {
    let rig = rig_with_track(100.0);

    rig.time.set_secs(1.0);
    rig.engine.tap().unwrap();
    rig.time.set_secs(1.5);
    assert!(rig.engine.tap().unwrap().is_some());

    rig.time.set_secs(4.0);
    assert!(rig.engine.tap().unwrap().is_none());

    rig.time.set_secs(4.4);
    let estimate = rig.engine.tap().unwrap().unwrap();
    assert_relative_eq!(estimate.bpm, 150.0, epsilon = 1e-6);
}

#[test]
fn test_tap_averages_recent_taps() {
    let rig = rig_with_track(100.0);

    for (i, secs) in [1.0, 1.5, 2.0, 2.6].into_iter().enumerate() {
        rig.time.set_secs(secs);
        let estimate = rig.engine.tap().unwrap();
        assert_eq!(estimate.is_some(), i > 0);
    }

    // Mean interval 1.6s / 3
    assert_relative_eq!(rig.engine.bpm(), 60.0 / (1.6 / 3.0), epsilon = 1e-6);
}

#[test]
fn test_invalid_bpm_rejected() {
    let rig = rig_with_track(100.0);
    rig.engine.set_bpm(90.0).unwrap();

    assert!(rig.engine.set_bpm(-5.0).is_err());
    assert!(rig.engine.set_bpm(f64::NAN).is_err());
    assert_relative_eq!(rig.engine.bpm(), 90.0);
}

#[test]
fn test_invalid_beat_offset_rejected() {
    let rig = rig_with_track(100.0);
    rig.engine.set_bpm(120.0).unwrap();
    rig.engine.set_beat_offset_ms(250.0).unwrap();

    assert!(matches!(
        rig.engine.set_beat_offset_ms(f64::NAN),
        Err(Error::Core(CoreError::InvalidBeatOffset(_)))
    ));
    assert!(rig.engine.set_beat_offset_ms(f64::NEG_INFINITY).is_err());
    assert_relative_eq!(rig.engine.snapshot().beat_offset_ms, 250.0);
}

#[test]
fn test_zero_bpm_disables_clicks() {
    let rig = rig_with_track(100.0);
    rig.engine.set_bpm(0.0).unwrap();
    rig.engine.set_metronome_enabled(true);
    rig.engine.play().unwrap();

    for ms in [1000, 2000, 3000] {
        rig.tick_at(ms);
    }
    assert_eq!(rig.clicks.clicks(), 0);
}
