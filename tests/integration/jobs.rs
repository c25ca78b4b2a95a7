//! Background job integration tests
//!
//! Auto-sync and download run on worker threads; results are applied when
//! the engine is polled. Only one job runs at a time.

use crate::helpers::*;
use approx::assert_relative_eq;
use clicktrack::prelude::*;
use clicktrack::TickOutcome;
use std::time::Instant;

#[test]
fn test_auto_sync_applies_grid_at_current_position() {
    let rig = build_rig(|b| b.beat_detector(fixed_detector(120.0, vec![0.25, 0.75, 1.25])));
    rig.engine.load_audio("song.wav", silent_track(10.0)).unwrap();
    rig.engine.play().unwrap();
    rig.tick_at(1000);

    rig.engine.start_auto_sync().unwrap();
    assert_eq!(rig.engine.active_job(), Some(JobKind::AutoSync));

    let outcome = rig.engine.wait_for_job(JOB_TIMEOUT).unwrap();
    let JobOutcome::Synced(analysis) = outcome else {
        panic!("expected sync, got {outcome:?}");
    };
    assert_relative_eq!(analysis.bpm, 120.0);
    assert_relative_eq!(analysis.first_beat_offset_sec, 0.25);
    assert_eq!(analysis.beat_count, 3);
    assert_eq!(
        rig.engine.status(),
        "Sync complete: 120.0 BPM, offset 0.25s"
    );
    assert!(!rig.engine.is_busy());

    let snapshot = rig.engine.snapshot();
    assert!(snapshot.metronome_enabled);
    assert_relative_eq!(snapshot.beat_offset_ms, 250.0);

    // Resynced at 1000ms on a 250 + 500n grid
    assert!(matches!(
        rig.tick_at(1200),
        TickOutcome::Continue { clicked: false, .. }
    ));
    assert!(matches!(
        rig.tick_at(1250),
        TickOutcome::Continue { clicked: true, .. }
    ));
    assert_eq!(rig.clicks.clicks(), 1);
}

#[test]
fn test_auto_sync_without_beats_leaves_grid() {
    let rig = build_rig(|b| b.beat_detector(fixed_detector(0.0, Vec::new())));
    rig.engine.load_audio("song.wav", silent_track(10.0)).unwrap();
    rig.engine.set_bpm(90.0).unwrap();

    rig.engine.start_auto_sync().unwrap();
    let outcome = rig.engine.wait_for_job(JOB_TIMEOUT).unwrap();

    assert!(matches!(
        outcome,
        JobOutcome::Failed {
            kind: JobKind::AutoSync,
            ..
        }
    ));
    assert!(rig.engine.status().starts_with("Sync Error:"));
    assert_relative_eq!(rig.engine.bpm(), 90.0);
    assert!(!rig.engine.snapshot().metronome_enabled);
}

#[test]
fn test_auto_sync_with_builtin_tracker() {
    let rig = test_rig();
    let audio = clicktrack::DecodedAudio {
        samples: click_train(120.0, 0.3, 10.0, 22050),
        channels: 1,
        sample_rate: 22050,
    };
    rig.engine.load_audio("clicks.wav", audio).unwrap();

    rig.engine.start_auto_sync().unwrap();
    let outcome = rig.engine.wait_for_job(JOB_TIMEOUT).unwrap();
    let JobOutcome::Synced(analysis) = outcome else {
        panic!("expected sync, got {outcome:?}");
    };

    assert!((analysis.bpm - 120.0).abs() < 3.0, "bpm {}", analysis.bpm);
    // First beat on the click grid, whichever click it starts from
    let beats = (analysis.first_beat_offset_sec - 0.3) / 0.5;
    assert!((beats - beats.round()).abs() * 0.5 < 0.05);
}

#[test]
fn test_auto_sync_requires_track() {
    let rig = test_rig();
    assert!(matches!(
        rig.engine.start_auto_sync(),
        Err(Error::NoTrackLoaded)
    ));
    assert!(!rig.engine.is_busy());
}

#[test]
fn test_download_loads_track() {
    let rig = build_rig(|b| b.downloader(FakeDownloader::immediate(2.0)));
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("song.wav");

    rig.engine
        .start_download("https://example.com/watch?v=1", &dest)
        .unwrap();
    assert_eq!(rig.engine.active_job(), Some(JobKind::Download));

    let outcome = rig.engine.wait_for_job(JOB_TIMEOUT).unwrap();
    assert_eq!(outcome, JobOutcome::Downloaded(dest.clone()));
    assert!(dest.exists());
    assert!(rig.engine.has_track());
    assert_eq!(rig.engine.status(), "Ready to play: song.wav");
    assert_eq!(rig.engine.snapshot().duration_ms, 2000);
}

#[test]
fn test_download_failure_reports_error() {
    let rig = build_rig(|b| b.downloader(FakeDownloader::immediate(2.0)));
    let dir = tempfile::tempdir().unwrap();

    rig.engine
        .start_download("https://example.com/missing", dir.path().join("x.wav"))
        .unwrap();
    let outcome = rig.engine.wait_for_job(JOB_TIMEOUT).unwrap();

    let JobOutcome::Failed { kind, message } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(kind, JobKind::Download);
    assert!(message.contains("video unavailable"));
    assert!(rig.engine.status().starts_with("Error:"));
    assert!(!rig.engine.has_track());
}

#[test]
fn test_download_requires_url_and_destination() {
    let rig = build_rig(|b| b.downloader(FakeDownloader::immediate(2.0)));
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        rig.engine.start_download("   ", dir.path().join("x.wav")),
        Err(Error::InvalidRequest(_))
    ));
    assert!(matches!(
        rig.engine.start_download("https://example.com/a", ""),
        Err(Error::InvalidRequest(_))
    ));
    assert!(!rig.engine.is_busy());
}

#[test]
fn test_running_job_excludes_others() {
    let (release, gate) = crossbeam_channel::bounded(1);
    let rig = build_rig(|b| b.downloader(FakeDownloader::gated(2.0, gate)));
    rig.engine.load_audio("first.wav", silent_track(5.0)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("second.wav");

    rig.engine
        .start_download("https://example.com/watch?v=2", &dest)
        .unwrap();
    assert_eq!(rig.engine.status(), "Downloading...");

    assert!(matches!(
        rig.engine.start_auto_sync(),
        Err(Error::Busy(JobKind::Download))
    ));
    assert!(matches!(
        rig.engine.start_download("https://example.com/other", &dest),
        Err(Error::Busy(JobKind::Download))
    ));
    assert!(matches!(
        rig.engine.load_audio("third.wav", silent_track(1.0)),
        Err(Error::Busy(JobKind::Download))
    ));

    // Playback controls stay available
    rig.engine.play().unwrap();
    rig.engine.stop();

    // Worker reports half progress, then waits for the gate
    let deadline = Instant::now() + JOB_TIMEOUT;
    while rig.engine.snapshot().job_progress.is_none() && Instant::now() < deadline {
        assert!(rig.engine.poll_jobs().is_none());
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    let snapshot = rig.engine.snapshot();
    assert_eq!(snapshot.busy, Some(JobKind::Download));
    assert_eq!(snapshot.job_progress, Some(0.5));
    assert_eq!(snapshot.status, "Downloading: 50.0%");
    assert_eq!(snapshot.track.as_deref(), Some("first.wav"));

    release.send(()).unwrap();
    let outcome = rig.engine.wait_for_job(JOB_TIMEOUT).unwrap();
    assert_eq!(outcome, JobOutcome::Downloaded(dest));
    assert!(!rig.engine.is_busy());
    assert_eq!(rig.engine.status(), "Ready to play: second.wav");

    rig.engine.start_auto_sync().unwrap();
    rig.engine.wait_for_job(JOB_TIMEOUT).unwrap();
}

#[test]
fn test_poll_without_job() {
    let rig = test_rig();
    assert!(rig.engine.poll_jobs().is_none());
    assert!(rig.engine.wait_for_job(JOB_TIMEOUT).is_none());
}
