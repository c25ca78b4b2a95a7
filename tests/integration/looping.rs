//! Loop region integration tests
//!
//! Selection lifecycle and the loop jump with its click resync.

use crate::helpers::*;
use approx::assert_relative_eq;
use clicktrack::core::Error as CoreError;
use clicktrack::prelude::*;
use clicktrack::TickOutcome;

#[test]
fn test_selection_lifecycle() {
    let rig = rig_with_track(100.0);

    rig.engine.begin_loop_selection(5.0).unwrap();
    rig.engine.update_loop_selection(7.0);
    assert!(rig.engine.loop_region().is_none());

    // Dragging backwards still yields an ordered region
    let region = rig.engine.finalize_loop_selection(3.0).unwrap();
    assert_relative_eq!(region.start_sec, 3.0);
    assert_relative_eq!(region.end_sec, 5.0);
    assert!(region.active);
    assert_eq!(rig.engine.status(), "Loop selected from 3.00s to 5.00s");
    assert_eq!(rig.engine.loop_region(), Some(region));
}

#[test]
fn test_zero_length_selection_is_discarded() {
    let rig = rig_with_track(100.0);

    rig.engine.begin_loop_selection(2.0).unwrap();
    assert!(rig.engine.finalize_loop_selection(2.0).is_none());
    assert!(rig.engine.loop_region().is_none());

    assert!(matches!(
        rig.engine.set_loop(4.0, 4.0),
        Err(Error::Core(CoreError::InvalidLoopRange { .. }))
    ));
    assert!(rig.engine.loop_region().is_none());
}

#[test]
fn test_finalize_without_selection() {
    let rig = rig_with_track(100.0);
    assert!(rig.engine.finalize_loop_selection(3.0).is_none());
}

#[test]
fn test_loop_jump_resyncs_clicks() {
    let rig = rig_with_track(100.0);
    rig.engine.set_bpm(60.0).unwrap();
    rig.engine.set_metronome_enabled(true);
    rig.engine.play().unwrap();
    rig.engine.set_loop(2.0, 4.5).unwrap();

    for ms in [1000, 2000, 3000, 4000] {
        rig.tick_at(ms);
    }
    assert_eq!(rig.clicks.clicks(), 4);

    let outcome = rig.tick_at(4500);
    assert!(matches!(
        outcome,
        TickOutcome::Continue {
            position_ms: 2000,
            clicked: false,
            looped_to_ms: Some(2000),
        }
    ));
    assert_eq!(rig.engine.position_ms(), 2000);

    // Transport is back at 2000ms; the next beat is 3000ms
    assert!(matches!(
        rig.tick_at(5500),
        TickOutcome::Continue {
            position_ms: 3000,
            clicked: true,
            looped_to_ms: None,
        }
    ));
    assert_eq!(rig.clicks.clicks(), 5);
}

#[test]
fn test_loop_repeats_every_pass() {
    let rig = rig_with_track(100.0);
    rig.engine.play().unwrap();
    rig.engine.set_loop(1.0, 2.0).unwrap();

    let mut jumps = 0;
    for step in 1..=40 {
        if let TickOutcome::Continue {
            looped_to_ms: Some(_),
            ..
        } = rig.tick_at(step * 250)
        {
            jumps += 1;
        }
    }

    // One pass to reach the end, then a jump every second
    assert_eq!(jumps, 9);
    assert!(rig.engine.position_ms() >= 1000);
    assert!(rig.engine.position_ms() < 2000);
}

#[test]
fn test_loop_to_track_end_keeps_looping() {
    let rig = rig_with_track(10.0);
    let region = rig.engine.set_loop(8.0, 10.0).unwrap();

    // Held one full-rate tick (2 x 50ms) inside the track
    assert_relative_eq!(region.start_sec, 8.0);
    assert_relative_eq!(region.end_sec, 9.9, epsilon = 1e-9);
    assert_eq!(rig.engine.status(), "Loop selected from 8.00s to 9.90s");

    rig.engine.play().unwrap();
    let mut jumps = 0;
    for step in 1..=220 {
        match rig.tick_at(step * 50) {
            TickOutcome::Continue {
                looped_to_ms: Some(target),
                ..
            } => {
                assert_eq!(target, 8000);
                jumps += 1;
            }
            TickOutcome::Continue { .. } => {}
            other => panic!("tick {step} returned {other:?}"),
        }
    }

    assert!(jumps >= 1);
    assert!(rig.engine.is_playing());
    assert!(rig.engine.loop_region().is_some());
    assert!(rig.engine.position_ms() < 10_000);
}

#[test]
fn test_selection_dragged_past_end_is_held_inside() {
    let rig = rig_with_track(10.0);

    rig.engine.begin_loop_selection(12.0).unwrap();
    let region = rig.engine.finalize_loop_selection(7.5).unwrap();
    assert_relative_eq!(region.start_sec, 7.5);
    assert_relative_eq!(region.end_sec, 9.9, epsilon = 1e-9);

    // Nothing left once both ends are held inside
    assert!(matches!(
        rig.engine.set_loop(9.95, 10.0),
        Err(Error::Core(CoreError::InvalidLoopRange { .. }))
    ));
}

#[test]
fn test_disabled_loop_does_not_jump() {
    let rig = rig_with_track(100.0);
    rig.engine.play().unwrap();
    rig.engine.set_loop(1.0, 2.0).unwrap();
    rig.engine.set_loop_enabled(false);

    assert!(matches!(
        rig.tick_at(2500),
        TickOutcome::Continue {
            position_ms: 2500,
            looped_to_ms: None,
            ..
        }
    ));
    assert!(!rig.engine.loop_region().unwrap().active);

    rig.engine.set_loop_enabled(true);
    assert!(matches!(
        rig.tick_at(2600),
        TickOutcome::Continue {
            looped_to_ms: Some(1000),
            ..
        }
    ));
}

#[test]
fn test_stop_and_load_clear_loop() {
    let rig = rig_with_track(100.0);
    rig.engine.set_loop(1.0, 2.0).unwrap();
    rig.engine.stop();
    assert!(rig.engine.loop_region().is_none());

    rig.engine.set_loop(1.0, 2.0).unwrap();
    rig.engine.load_audio("next.wav", silent_track(10.0)).unwrap();
    assert!(rig.engine.loop_region().is_none());
}

#[test]
fn test_clear_loop() {
    let rig = rig_with_track(100.0);
    rig.engine.set_loop(1.0, 2.0).unwrap();
    rig.engine.clear_loop();

    assert!(rig.engine.loop_region().is_none());
    assert!(rig.engine.snapshot().loop_region.is_none());
}
