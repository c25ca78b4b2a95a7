//! Playback backends: where a loaded track is actually played.

use crate::Result;
use clicktrack_analysis::DecodedAudio;
use clicktrack_core::{ClickCounter, ClickEmitter, ClockTransport, NullClick, TimeSource, Transport};
use std::sync::Arc;

/// Transport plus click sink for one loaded track.
pub struct Player {
    pub transport: Box<dyn Transport>,
    pub click: Box<dyn ClickEmitter>,
}

/// Opens a [`Player`] for decoded audio.
pub trait PlaybackBackend: Send + Sync {
    fn open(&self, audio: &DecodedAudio) -> Result<Player>;

    fn name(&self) -> &'static str;
}

/// Software transport with no audio output.
///
/// Position follows the supplied time source, so tests can drive it with
/// [`clicktrack_core::ManualTime`].
pub struct HeadlessBackend {
    time: Arc<dyn TimeSource>,
    clicks: Option<ClickCounter>,
}

impl HeadlessBackend {
    pub fn new(time: impl TimeSource + 'static) -> Self {
        Self {
            time: Arc::new(time),
            clicks: None,
        }
    }

    /// Count clicks and silences instead of discarding them.
    pub fn with_click_counter(mut self, counter: ClickCounter) -> Self {
        self.clicks = Some(counter);
        self
    }
}

impl PlaybackBackend for HeadlessBackend {
    fn open(&self, audio: &DecodedAudio) -> Result<Player> {
        let transport = ClockTransport::new(Arc::clone(&self.time), audio.duration_ms());
        let click: Box<dyn ClickEmitter> = match &self.clicks {
            Some(counter) => Box::new(counter.clone()),
            None => Box::new(NullClick),
        };
        Ok(Player {
            transport: Box::new(transport),
            click,
        })
    }

    fn name(&self) -> &'static str {
        "headless"
    }
}

/// Plays through a CPAL output device with the click mixed in.
#[cfg(feature = "audio-output")]
#[derive(Debug, Clone, Default)]
pub struct AudioBackend {
    output: clicktrack_core::AudioOutput,
}

#[cfg(feature = "audio-output")]
impl AudioBackend {
    pub fn new(device_index: Option<usize>) -> Self {
        Self {
            output: clicktrack_core::AudioOutput::new(device_index),
        }
    }
}

#[cfg(feature = "audio-output")]
impl PlaybackBackend for AudioBackend {
    fn open(&self, audio: &DecodedAudio) -> Result<Player> {
        let track = clicktrack_core::PcmTrack::new(
            audio.samples.clone(),
            audio.channels,
            audio.sample_rate,
        )?;
        let (transport, click) = self.output.open(track)?;
        Ok(Player {
            transport: Box::new(transport),
            click: Box::new(click),
        })
    }

    fn name(&self) -> &'static str {
        "audio"
    }
}
