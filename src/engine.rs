//! ClickTrackEngine that ties the loaded track, the metronome and the background jobs together

use crate::backend::{PlaybackBackend, Player};
use crate::download::Downloader;
use crate::jobs::{JobHandle, JobKind, JobStatus};
use crate::{Error, Result};
use clicktrack_analysis::{AnalysisHandle, DecodedAudio, WaveformSummary};
use clicktrack_core::transport::MAX_RATE;
use clicktrack_core::{
    AutoSyncEngine, BeatAnalysis, BeatClock, BpmEstimate, ClickTrackConfig, LoopController,
    LoopRegion, PlaybackRate, PlaybackScheduler, PositionObserver, SchedulerThread,
    TapTempoEstimator, TickContext, TickOutcome, TimeSource,
};
use parking_lot::Mutex;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// A decoded track and its display data.
struct LoadedTrack {
    name: String,
    audio: Arc<DecodedAudio>,
    waveform: Arc<WaveformSummary>,
}

/// Everything the scheduler tick and the control surface both touch.
///
/// Lives behind one mutex: the tick thread and the caller's thread are the
/// only two mutators.
struct Session {
    config: ClickTrackConfig,
    track: Option<LoadedTrack>,
    player: Option<Player>,
    beat_clock: BeatClock,
    looper: LoopController,
    tap: TapTempoEstimator,
    scheduler: PlaybackScheduler,
    rate: PlaybackRate,
    /// Last position observed by a tick or set by a control.
    position_ms: u64,
    status: String,
    /// A tick thread has been spawned and has not yet decided to exit.
    runner_active: bool,
}

impl Session {
    fn new(config: ClickTrackConfig) -> Self {
        let tap = TapTempoEstimator::with_params(config.tap_capacity, config.tap_reset_gap_secs);
        Self {
            config,
            track: None,
            player: None,
            beat_clock: BeatClock::new(),
            looper: LoopController::new(),
            tap,
            scheduler: PlaybackScheduler::new(),
            rate: PlaybackRate::NORMAL,
            position_ms: 0,
            status: "Ready.".into(),
            runner_active: false,
        }
    }

    fn set_status(&mut self, status: impl Into<String>) {
        let status = status.into();
        info!("{}", status);
        self.status = status;
    }

    fn track_name(&self) -> String {
        self.track
            .as_ref()
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }

    /// Transport position, falling back to the last observed one.
    fn current_ms(&self) -> u64 {
        self.player
            .as_ref()
            .and_then(|p| p.transport.position_ms().ok())
            .unwrap_or(self.position_ms)
    }

    /// True when a new tick thread must be spawned.
    fn claim_runner(&mut self) -> bool {
        if self.runner_active {
            return false;
        }
        self.runner_active = true;
        true
    }

    fn load(&mut self, track: LoadedTrack, mut player: Player) {
        self.halt();

        if let Err(e) = player.transport.set_rate(PlaybackRate::NORMAL) {
            warn!("Failed to reset playback rate: {}", e);
        }
        self.player = Some(player);
        self.rate = PlaybackRate::NORMAL;
        self.beat_clock = BeatClock::new();
        self.tap.reset();

        let name = track.name.clone();
        self.track = Some(track);
        self.set_status(format!("Loaded file: {name}"));
    }

    /// Stop transport and scheduling, silence the click and forget the loop.
    fn halt(&mut self) {
        self.scheduler.stop();
        if let Some(player) = self.player.as_mut() {
            if let Err(e) = player.transport.stop() {
                warn!("Failed to stop transport: {}", e);
            }
            if let Err(e) = player.click.silence() {
                warn!("Failed to silence click: {}", e);
            }
        }
        self.beat_clock.resync(0.0);
        self.looper.clear();
        self.position_ms = 0;
    }

    fn stop(&mut self) {
        self.halt();
        self.set_status("Stopped.");
    }

    /// Latest loop bound in seconds, or `None` without a track of known length.
    ///
    /// End of media stops playback before the loop check runs, so a bound
    /// must sit at least one tick of full-rate playback before the end.
    fn loop_limit_sec(&self) -> Option<f64> {
        let duration_ms = self.player.as_ref()?.transport.duration_ms().ok()?;
        if duration_ms == 0 {
            return None;
        }
        let margin_ms = self.config.tick_interval.as_micros() as f64 / 1000.0 * MAX_RATE;
        Some(((duration_ms as f64 - margin_ms) / 1000.0).max(0.0))
    }

    fn clamp_loop_bound(&self, sec: f64) -> f64 {
        match self.loop_limit_sec() {
            Some(limit) => sec.min(limit),
            None => sec,
        }
    }

    fn begin_loop(&mut self, start_sec: f64) -> Result<()> {
        if self.track.is_none() {
            return Err(Error::NoTrackLoaded);
        }
        let start_sec = self.clamp_loop_bound(start_sec);
        self.looper.begin_selection(start_sec);
        Ok(())
    }

    fn finalize_loop(&mut self, end_sec: f64) -> Option<LoopRegion> {
        let end_sec = self.clamp_loop_bound(end_sec);
        let region = self.looper.finalize_selection(end_sec)?;
        self.set_status(format!(
            "Loop selected from {:.2}s to {:.2}s",
            region.start_sec, region.end_sec
        ));
        Some(region)
    }

    fn play(&mut self) -> Result<()> {
        let Some(player) = self.player.as_mut() else {
            self.set_status("No audio file loaded.");
            return Err(Error::NoTrackLoaded);
        };

        if !player.transport.is_playing() {
            if player.transport.is_paused() {
                player.transport.toggle_pause()?;
            } else {
                player.transport.play()?;
            }
            // Zero after a stop, the pause point after a pause
            let position_ms = player.transport.position_ms()?;
            self.beat_clock.resync(position_ms as f64);
            self.position_ms = position_ms;
        }

        self.scheduler.start();
        let name = self.track_name();
        self.set_status(format!("Playing {name}"));
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let Some(player) = self.player.as_mut() else {
            return Err(Error::NoTrackLoaded);
        };

        if player.transport.is_playing() {
            player.transport.toggle_pause()?;
            if let Err(e) = player.click.silence() {
                warn!("Failed to silence click: {}", e);
            }
            self.position_ms = player.transport.position_ms().unwrap_or(self.position_ms);
            self.scheduler.stop();
            self.set_status("Paused.");
        } else if player.transport.is_paused() {
            player.transport.toggle_pause()?;
            let position_ms = player.transport.position_ms()?;
            self.beat_clock.resync(position_ms as f64);
            self.position_ms = position_ms;
            self.scheduler.start();
            self.set_status("Resumed.");
        }
        Ok(())
    }

    fn is_rolling(&self) -> bool {
        self.player
            .as_ref()
            .is_some_and(|p| p.transport.is_playing())
    }

    fn rewind(&mut self) -> Result<()> {
        if self.player.is_none() {
            return Err(Error::NoTrackLoaded);
        }
        self.halt();
        self.play()?;
        self.set_status("Rewound to beginning.");
        Ok(())
    }

    fn skip(&mut self, seconds: f64) -> Result<()> {
        let Some(player) = self.player.as_mut() else {
            return Err(Error::NoTrackLoaded);
        };

        let current_ms = player.transport.position_ms()? as f64;
        let duration_ms = player.transport.duration_ms()? as f64;
        let target_ms = current_ms + seconds * 1000.0;

        if duration_ms > 0.0 && target_ms >= duration_ms {
            self.halt();
            self.set_status("Reached end of audio.");
            return Ok(());
        }

        let target_ms = target_ms.max(0.0).round() as u64;
        player.transport.seek(target_ms)?;
        self.beat_clock.resync(target_ms as f64);
        self.position_ms = target_ms;
        self.set_status(format!("Skipped to {:.1}s", target_ms as f64 / 1000.0));
        Ok(())
    }

    fn set_rate(&mut self, value: f64) -> Result<f64> {
        let rate = PlaybackRate::with_step(value, self.config.rate_step)?;
        if let Some(player) = self.player.as_mut() {
            player.transport.set_rate(rate)?;
        }
        self.rate = rate;
        Ok(rate.get())
    }

    fn resync_here(&mut self) {
        let current_ms = self.current_ms();
        self.beat_clock.resync(current_ms as f64);
    }

    fn tap(&mut self, now_secs: f64) -> Result<Option<BpmEstimate>> {
        let Some(estimate) = self.tap.tap(now_secs) else {
            return Ok(None);
        };

        let current_ms = self.current_ms() as f64;
        self.beat_clock.set_bpm(estimate.bpm)?;
        self.beat_clock.set_enabled(true);
        self.beat_clock.anchor_at(current_ms);

        if let Some(player) = self.player.as_mut() {
            if let Err(e) = player.click.play_click() {
                warn!("Click emission failed: {}", e);
            }
        }
        self.set_status(format!("Tap Tempo: {:.1} BPM", estimate.bpm));
        Ok(Some(estimate))
    }

    fn apply_sync(&mut self, analysis: &BeatAnalysis) -> Result<()> {
        let current_ms = self.current_ms() as f64;
        analysis.apply_to(&mut self.beat_clock, current_ms)?;
        self.set_status(format!(
            "Sync complete: {:.1} BPM, offset {:.2}s",
            analysis.bpm, analysis.first_beat_offset_sec
        ));
        Ok(())
    }

    fn tick(&mut self) -> TickOutcome {
        let Some(player) = self.player.as_mut() else {
            return TickOutcome::Idle;
        };

        let mut observed = None;
        let mut record = |position_ms: u64| observed = Some(position_ms);
        let outcome = self.scheduler.tick(TickContext {
            transport: player.transport.as_mut(),
            beat_clock: &mut self.beat_clock,
            looper: &mut self.looper,
            click: player.click.as_mut(),
            observer: Some(&mut record as &mut dyn PositionObserver),
        });

        if outcome.is_terminal() {
            self.position_ms = 0;
            self.set_status("Playback finished.");
        } else if let Some(position_ms) = observed {
            self.position_ms = position_ms;
        }
        outcome
    }
}

enum ActiveJob {
    Download(JobHandle<PathBuf>),
    AutoSync(JobHandle<BeatAnalysis>),
}

impl ActiveJob {
    fn kind(&self) -> JobKind {
        match self {
            ActiveJob::Download(_) => JobKind::Download,
            ActiveJob::AutoSync(_) => JobKind::AutoSync,
        }
    }

    fn last_progress(&self) -> Option<f32> {
        match self {
            ActiveJob::Download(handle) => handle.last_progress(),
            ActiveJob::AutoSync(handle) => handle.last_progress(),
        }
    }
}

/// Result of a finished background job, as returned by [`ClickTrackEngine::poll_jobs`].
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The file was downloaded and is now the loaded track.
    Downloaded(PathBuf),
    /// The detected grid is installed and the metronome is on.
    Synced(BeatAnalysis),
    /// Nothing changed; the message is also the engine status.
    Failed { kind: JobKind, message: String },
}

/// Point-in-time view of the engine for display.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub status: String,
    pub track: Option<String>,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub playing: bool,
    pub paused: bool,
    pub rate: f64,
    pub bpm: f64,
    pub beat_offset_ms: f64,
    pub metronome_enabled: bool,
    pub loop_region: Option<LoopRegion>,
    pub busy: Option<JobKind>,
    pub job_progress: Option<f32>,
}

/// Click track player: a loaded track, a beat-synchronized metronome and
/// background download/auto-sync jobs.
///
/// All methods take `&self`; state sits behind a `parking_lot::Mutex` shared
/// with the scheduler thread.
///
/// # Example
///
/// ```ignore
/// use clicktrack::prelude::*;
///
/// let engine = ClickTrackEngine::builder().build()?;
/// engine.load_file("song.mp3")?;
/// engine.set_bpm(120.0)?;
/// engine.set_metronome_enabled(true);
/// engine.play()?;
/// ```
pub struct ClickTrackEngine {
    session: Arc<Mutex<Session>>,
    runner: Mutex<Option<SchedulerThread>>,
    job: Mutex<Option<ActiveJob>>,
    backend: Box<dyn PlaybackBackend>,
    downloader: Arc<dyn Downloader>,
    auto_sync: AutoSyncEngine,
    analysis: AnalysisHandle,
    tap_clock: Arc<dyn TimeSource>,
    scheduler_thread: bool,
    tick_interval: Duration,
}

impl ClickTrackEngine {
    pub fn builder() -> crate::ClickTrackEngineBuilder {
        crate::ClickTrackEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        config: ClickTrackConfig,
        backend: Box<dyn PlaybackBackend>,
        downloader: Arc<dyn Downloader>,
        auto_sync: AutoSyncEngine,
        tap_clock: Arc<dyn TimeSource>,
        scheduler_thread: bool,
    ) -> Self {
        info!(
            "Click track engine ready ({} backend, {}ms tick)",
            backend.name(),
            config.tick_interval.as_millis()
        );
        Self {
            tick_interval: config.tick_interval,
            session: Arc::new(Mutex::new(Session::new(config))),
            runner: Mutex::new(None),
            job: Mutex::new(None),
            backend,
            downloader,
            auto_sync,
            analysis: AnalysisHandle::new(),
            tap_clock,
            scheduler_thread,
        }
    }

    pub fn config(&self) -> ClickTrackConfig {
        self.session.lock().config.clone()
    }

    // ---- Loading ----

    /// Decode `path` and make it the current track.
    ///
    /// Resets beat offset, loop, rate and tempo, and leaves playback stopped.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_idle()?;
        self.load_path(path.as_ref())
    }

    /// Make already-decoded audio the current track.
    pub fn load_audio(&self, name: impl Into<String>, audio: DecodedAudio) -> Result<()> {
        self.ensure_idle()?;
        self.install(name.into(), audio)
    }

    fn load_path(&self, path: &Path) -> Result<()> {
        let audio = match self.analysis.decode(path) {
            Ok(audio) => audio,
            Err(e) => {
                self.session
                    .lock()
                    .set_status(format!("Error loading file: {e}"));
                return Err(e.into());
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.install(name, audio)
    }

    fn install(&self, name: String, audio: DecodedAudio) -> Result<()> {
        let waveform = self.analysis.waveform_summary(&audio);
        let player = self.backend.open(&audio)?;
        let track = LoadedTrack {
            name,
            audio: Arc::new(audio),
            waveform: Arc::new(waveform),
        };
        self.session.lock().load(track, player);
        Ok(())
    }

    // ---- Playback ----

    /// Start or resume playback. No-op while already playing.
    pub fn play(&self) -> Result<()> {
        self.with_playback(Session::play)
    }

    /// Toggle pause. Pausing silences the click and stops scheduling;
    /// resuming resyncs the click schedule at the current position.
    pub fn pause(&self) -> Result<()> {
        self.with_playback(Session::pause)
    }

    /// Play if not playing, otherwise pause.
    pub fn toggle_play_pause(&self) -> Result<()> {
        self.with_playback(|session| {
            if session.is_rolling() {
                session.pause()
            } else {
                session.play()
            }
        })
    }

    /// Stop and rewind. Idempotent.
    pub fn stop(&self) {
        self.session.lock().stop();
    }

    /// Stop, then play from the beginning.
    pub fn rewind(&self) -> Result<()> {
        self.with_playback(Session::rewind)
    }

    /// Move the playhead by `seconds`. Reaching the end stops playback.
    pub fn skip(&self, seconds: f64) -> Result<()> {
        self.session.lock().skip(seconds)
    }

    pub fn skip_forward(&self) -> Result<()> {
        let seconds = self.session.lock().config.skip_seconds;
        self.skip(seconds)
    }

    pub fn skip_backward(&self) -> Result<()> {
        let seconds = self.session.lock().config.skip_seconds;
        self.skip(-seconds)
    }

    /// Set the playback rate. Returns the applied (rounded, clamped) rate.
    pub fn set_rate(&self, value: f64) -> Result<f64> {
        self.session.lock().set_rate(value)
    }

    /// Run one scheduler tick on the caller's thread.
    ///
    /// For engines built without the scheduler thread.
    pub fn tick(&self) -> TickOutcome {
        self.session.lock().tick()
    }

    fn with_playback<R>(&self, op: impl FnOnce(&mut Session) -> Result<R>) -> Result<R> {
        let (result, spawn) = {
            let mut session = self.session.lock();
            let result = op(&mut session)?;
            let spawn =
                self.scheduler_thread && session.scheduler.is_running() && session.claim_runner();
            (result, spawn)
        };
        if spawn {
            self.spawn_runner();
        }
        Ok(result)
    }

    fn spawn_runner(&self) {
        let session = Arc::clone(&self.session);
        let thread = SchedulerThread::spawn(self.tick_interval, move || {
            let mut session = session.lock();
            session.tick();
            if session.scheduler.is_running() {
                ControlFlow::Continue(())
            } else {
                session.runner_active = false;
                ControlFlow::Break(())
            }
        });

        // A replaced thread has already released its claim and is exiting
        if let Some(mut previous) = self.runner.lock().replace(thread) {
            previous.stop();
        }
    }

    // ---- Metronome ----

    pub fn set_bpm(&self, bpm: f64) -> Result<()> {
        let mut session = self.session.lock();
        session.beat_clock.set_bpm(bpm)?;
        session.resync_here();
        Ok(())
    }

    pub fn set_beat_offset_ms(&self, beat_offset_ms: f64) -> Result<()> {
        let mut session = self.session.lock();
        session.beat_clock.set_beat_offset_ms(beat_offset_ms)?;
        session.resync_here();
        Ok(())
    }

    pub fn set_metronome_enabled(&self, enabled: bool) {
        let mut session = self.session.lock();
        session.beat_clock.set_enabled(enabled);
        if enabled {
            session.resync_here();
        }
    }

    /// Register a tap. Once two taps are buffered the estimate becomes the
    /// tempo, beat zero moves to the current position and a click fires.
    pub fn tap(&self) -> Result<Option<BpmEstimate>> {
        let now_secs = self.tap_clock.now_secs();
        self.session.lock().tap(now_secs)
    }

    // ---- Loop ----

    /// Selection bounds are held one full-rate tick inside the track.
    pub fn begin_loop_selection(&self, start_sec: f64) -> Result<()> {
        self.session.lock().begin_loop(start_sec)
    }

    pub fn update_loop_selection(&self, end_sec: f64) {
        let mut session = self.session.lock();
        let end_sec = session.clamp_loop_bound(end_sec);
        session.looper.update_selection(end_sec);
    }

    /// Close the selection and start looping it. `None` for a zero-length selection.
    pub fn finalize_loop_selection(&self, end_sec: f64) -> Option<LoopRegion> {
        self.session.lock().finalize_loop(end_sec)
    }

    /// Select and activate `start_sec..end_sec` in one step.
    ///
    /// Fails with `InvalidLoopRange` when the range is empty once held inside the track.
    pub fn set_loop(&self, start_sec: f64, end_sec: f64) -> Result<LoopRegion> {
        let mut session = self.session.lock();
        session.begin_loop(start_sec)?;
        session.finalize_loop(end_sec).ok_or(Error::Core(
            clicktrack_core::Error::InvalidLoopRange {
                start: start_sec,
                end: end_sec,
            },
        ))
    }

    pub fn set_loop_enabled(&self, enabled: bool) {
        self.session.lock().looper.set_active(enabled);
    }

    pub fn clear_loop(&self) {
        self.session.lock().looper.clear();
    }

    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.session.lock().looper.region()
    }

    // ---- Jobs ----

    /// Download `url` to `dest` in the background, then load it.
    pub fn start_download(&self, url: &str, dest: impl AsRef<Path>) -> Result<()> {
        let url = url.trim().to_string();
        let dest = dest.as_ref().to_path_buf();
        if url.is_empty() || dest.as_os_str().is_empty() {
            return Err(Error::InvalidRequest(
                "a URL and a save location are required".into(),
            ));
        }

        let mut job = self.job.lock();
        if let Some(active) = job.as_ref() {
            return Err(Error::Busy(active.kind()));
        }

        let downloader = Arc::clone(&self.downloader);
        let handle = JobHandle::spawn(JobKind::Download, move |progress| {
            downloader
                .download(&url, &dest, &mut |p| progress.report(p))
                .map_err(|e| e.to_string())?;
            Ok(dest)
        });
        *job = Some(ActiveJob::Download(handle));

        self.session.lock().set_status("Downloading...");
        Ok(())
    }

    /// Detect tempo and first beat of the loaded track in the background.
    pub fn start_auto_sync(&self) -> Result<()> {
        let mut job = self.job.lock();
        if let Some(active) = job.as_ref() {
            return Err(Error::Busy(active.kind()));
        }

        let audio = {
            let mut session = self.session.lock();
            let Some(track) = session.track.as_ref() else {
                return Err(Error::NoTrackLoaded);
            };
            let audio = Arc::clone(&track.audio);
            session.set_status("Analyzing beats...");
            audio
        };

        let auto_sync = self.auto_sync.clone();
        let handle = JobHandle::spawn(JobKind::AutoSync, move |progress| {
            let mono = audio.to_mono();
            progress.report(0.5);
            auto_sync
                .analyze(&mono, audio.sample_rate)
                .map_err(|e| e.to_string())
        });
        *job = Some(ActiveJob::AutoSync(handle));
        Ok(())
    }

    /// Drain job progress and apply a finished job. Call from the
    /// orchestrating thread; never blocks on the worker.
    pub fn poll_jobs(&self) -> Option<JobOutcome> {
        let mut job = self.job.lock();
        let finished = match job.as_mut()? {
            ActiveJob::Download(handle) => match handle.poll() {
                JobStatus::Pending => return None,
                JobStatus::Running(p) => {
                    let status = format!("Downloading: {:.1}%", p * 100.0);
                    let mut session = self.session.lock();
                    if session.status != status {
                        session.set_status(status);
                    }
                    return None;
                }
                JobStatus::Complete(path) => Finished::Downloaded(path),
                JobStatus::Failed(message) => Finished::Failed(JobKind::Download, message),
            },
            ActiveJob::AutoSync(handle) => match handle.poll() {
                JobStatus::Pending | JobStatus::Running(_) => return None,
                JobStatus::Complete(analysis) => Finished::Synced(analysis),
                JobStatus::Failed(message) => Finished::Failed(JobKind::AutoSync, message),
            },
        };
        *job = None;
        drop(job);

        Some(self.apply_finished(finished))
    }

    fn apply_finished(&self, finished: Finished) -> JobOutcome {
        match finished {
            Finished::Downloaded(path) => match self.load_path(&path) {
                Ok(()) => {
                    let name = self.session.lock().track_name();
                    self.session
                        .lock()
                        .set_status(format!("Ready to play: {name}"));
                    JobOutcome::Downloaded(path)
                }
                Err(e) => JobOutcome::Failed {
                    kind: JobKind::Download,
                    message: e.to_string(),
                },
            },
            Finished::Synced(analysis) => {
                let mut session = self.session.lock();
                match session.apply_sync(&analysis) {
                    Ok(()) => JobOutcome::Synced(analysis),
                    Err(e) => {
                        session.set_status(format!("Error applying sync: {e}"));
                        JobOutcome::Failed {
                            kind: JobKind::AutoSync,
                            message: e.to_string(),
                        }
                    }
                }
            }
            Finished::Failed(kind, message) => {
                let status = match kind {
                    JobKind::Download => format!("Error: {message}"),
                    JobKind::AutoSync => format!("Sync Error: {message}"),
                };
                self.session.lock().set_status(status);
                JobOutcome::Failed { kind, message }
            }
        }
    }

    /// Poll until the running job finishes or `timeout` passes.
    pub fn wait_for_job(&self, timeout: Duration) -> Option<JobOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(outcome) = self.poll_jobs() {
                return Some(outcome);
            }
            if !self.is_busy() || Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Whether a download or auto-sync is running. Controls that start jobs
    /// or load files are refused meanwhile.
    pub fn is_busy(&self) -> bool {
        self.job.lock().is_some()
    }

    pub fn active_job(&self) -> Option<JobKind> {
        self.job.lock().as_ref().map(ActiveJob::kind)
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.active_job() {
            Some(kind) => Err(Error::Busy(kind)),
            None => Ok(()),
        }
    }

    // ---- State ----

    pub fn status(&self) -> String {
        self.session.lock().status.clone()
    }

    /// Last observed playhead position.
    pub fn position_ms(&self) -> u64 {
        self.session.lock().position_ms
    }

    pub fn is_playing(&self) -> bool {
        self.session.lock().is_rolling()
    }

    pub fn has_track(&self) -> bool {
        self.session.lock().track.is_some()
    }

    pub fn bpm(&self) -> f64 {
        self.session.lock().beat_clock.bpm()
    }

    pub fn rate(&self) -> f64 {
        self.session.lock().rate.get()
    }

    pub fn waveform(&self) -> Option<Arc<WaveformSummary>> {
        self.session
            .lock()
            .track
            .as_ref()
            .map(|t| Arc::clone(&t.waveform))
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let (busy, job_progress) = {
            let job = self.job.lock();
            (
                job.as_ref().map(ActiveJob::kind),
                job.as_ref().and_then(ActiveJob::last_progress),
            )
        };

        let session = self.session.lock();
        let transport = session.player.as_ref().map(|p| &p.transport);
        let grid = session.beat_clock.grid();
        EngineSnapshot {
            status: session.status.clone(),
            track: session.track.as_ref().map(|t| t.name.clone()),
            position_ms: session.position_ms,
            duration_ms: transport
                .and_then(|t| t.duration_ms().ok())
                .unwrap_or(0),
            playing: transport.is_some_and(|t| t.is_playing()),
            paused: transport.is_some_and(|t| t.is_paused()),
            rate: session.rate.get(),
            bpm: grid.bpm(),
            beat_offset_ms: grid.beat_offset_ms(),
            metronome_enabled: session.beat_clock.is_enabled(),
            loop_region: session.looper.region(),
            busy,
            job_progress,
        }
    }
}

enum Finished {
    Downloaded(PathBuf),
    Synced(BeatAnalysis),
    Failed(JobKind, String),
}

impl Drop for ClickTrackEngine {
    fn drop(&mut self) {
        self.session.lock().halt();
        if let Some(mut runner) = self.runner.get_mut().take() {
            runner.stop();
        }
    }
}
