//! Builder for configuring and constructing a `ClickTrackEngine`.

use crate::backend::{HeadlessBackend, PlaybackBackend};
use crate::download::{Downloader, YtDlpDownloader};
use crate::{ClickTrackEngine, Result};
use clicktrack_analysis::AnalysisHandle;
use clicktrack_core::{AutoSyncEngine, BeatDetector, ClickTrackConfig, MonotonicTime, TimeSource};
use std::sync::Arc;
use std::time::Duration;

/// Unset parts fall back to: audio output on the default device (headless
/// without the `audio-output` feature), `yt-dlp` for downloads, the built-in
/// beat tracker for auto-sync and the monotonic clock for tap tempo.
///
/// # Example
///
/// ```ignore
/// use clicktrack::prelude::*;
///
/// let time = ManualTime::new();
/// let engine = ClickTrackEngine::builder()
///     .backend(HeadlessBackend::new(time.clone()))
///     .tap_clock(time)
///     .scheduler_thread(false)
///     .build()?;
/// ```
pub struct ClickTrackEngineBuilder {
    config: ClickTrackConfig,
    backend: Option<Box<dyn PlaybackBackend>>,
    downloader: Option<Arc<dyn Downloader>>,
    beat_detector: Option<Arc<dyn BeatDetector>>,
    tap_clock: Option<Arc<dyn TimeSource>>,
    scheduler_thread: bool,
}

impl Default for ClickTrackEngineBuilder {
    fn default() -> Self {
        Self {
            config: ClickTrackConfig::default(),
            backend: None,
            downloader: None,
            beat_detector: None,
            tap_clock: None,
            scheduler_thread: true,
        }
    }
}

impl ClickTrackEngineBuilder {
    pub fn config(mut self, config: ClickTrackConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 50ms
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    pub fn backend(mut self, backend: impl PlaybackBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Software transport on the wall clock; no audio is produced.
    pub fn headless(self) -> Self {
        self.backend(HeadlessBackend::new(MonotonicTime::new()))
    }

    #[cfg(feature = "audio-output")]
    pub fn output_device(self, index: usize) -> Self {
        self.backend(crate::backend::AudioBackend::new(Some(index)))
    }

    pub fn downloader(mut self, downloader: impl Downloader + 'static) -> Self {
        self.downloader = Some(Arc::new(downloader));
        self
    }

    pub fn beat_detector(mut self, detector: Arc<dyn BeatDetector>) -> Self {
        self.beat_detector = Some(detector);
        self
    }

    pub fn tap_clock(mut self, clock: impl TimeSource + 'static) -> Self {
        self.tap_clock = Some(Arc::new(clock));
        self
    }

    /// Drive the scheduler from a dedicated thread (default). When off, the
    /// caller drives it with [`ClickTrackEngine::tick`].
    pub fn scheduler_thread(mut self, enabled: bool) -> Self {
        self.scheduler_thread = enabled;
        self
    }

    pub fn build(self) -> Result<ClickTrackEngine> {
        self.config.validate()?;

        let backend = self.backend.unwrap_or_else(default_backend);
        let downloader = self
            .downloader
            .unwrap_or_else(|| Arc::new(YtDlpDownloader::new()));
        let detector = self
            .beat_detector
            .unwrap_or_else(|| AnalysisHandle::new().beat_detector());
        let tap_clock = self
            .tap_clock
            .unwrap_or_else(|| Arc::new(MonotonicTime::new()));

        Ok(ClickTrackEngine::from_parts(
            self.config,
            backend,
            downloader,
            AutoSyncEngine::new(detector),
            tap_clock,
            self.scheduler_thread,
        ))
    }
}

#[cfg(feature = "audio-output")]
fn default_backend() -> Box<dyn PlaybackBackend> {
    Box::new(crate::backend::AudioBackend::default())
}

#[cfg(not(feature = "audio-output"))]
fn default_backend() -> Box<dyn PlaybackBackend> {
    Box::new(HeadlessBackend::new(MonotonicTime::new()))
}
