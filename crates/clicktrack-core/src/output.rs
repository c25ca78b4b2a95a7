//! CPAL audio output: plays a decoded track at variable rate and mixes in the click.
//!
//! [`AudioOutput::open`] starts a stream and hands back an [`OutputTransport`]
//! (the playhead) and an [`OutputClick`] (the click trigger). Both talk to the
//! audio callback through lock-free atomics only.

use crate::lockfree::{AtomicDouble, AtomicFlag};
use crate::transport::{ClickEmitter, ClickSound, PlaybackRate, Transport};
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use tracing::{debug, error};

/// Interleaved PCM ready for playback.
#[derive(Debug, Clone)]
pub struct PcmTrack {
    samples: Arc<Vec<f32>>,
    channels: usize,
    sample_rate: u32,
}

impl PcmTrack {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 || sample_rate == 0 {
            return Err(Error::InvalidConfig(format!(
                "PCM track needs channels > 0 and sample_rate > 0 (got {channels}, {sample_rate})"
            )));
        }
        Ok(Self {
            samples: Arc::new(samples),
            channels,
            sample_rate,
        })
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_ms(&self) -> u64 {
        (self.frames() as f64 / self.sample_rate as f64 * 1000.0) as u64
    }

    #[inline]
    fn sample(&self, frame: usize, channel: usize) -> f32 {
        self.samples
            .get(frame * self.channels + channel.min(self.channels - 1))
            .copied()
            .unwrap_or(0.0)
    }
}

/// State shared between the control side and the audio callback.
struct PlaybackShared {
    track: PcmTrack,
    /// Playhead in (fractional) source frames.
    position_frames: AtomicDouble,
    /// Seek target picked up by the next callback.
    seek_frames: AtomicDouble,
    seek_pending: AtomicFlag,
    rate: AtomicDouble,
    playing: AtomicFlag,
    paused: AtomicFlag,
    click_trigger: AtomicFlag,
    click_silence: AtomicFlag,
}

impl PlaybackShared {
    fn total_frames(&self) -> f64 {
        self.track.frames() as f64
    }

    fn frames_per_ms(&self) -> f64 {
        self.track.sample_rate as f64 / 1000.0
    }

    /// Move the playhead without racing the callback's own position update.
    fn request_seek(&self, frames: f64) {
        self.seek_frames.set(frames);
        self.position_frames.set(frames);
        self.seek_pending.set(true);
    }
}

/// Wrapper to hold `cpal::Stream` in a `Send` context.
///
/// # Safety
/// `cpal::Stream` is `!Send` due to platform internals. The stream is only
/// created, held and dropped by the [`OutputTransport`] that owns it, which
/// the engine keeps behind a mutex.
struct StreamHandle(#[allow(dead_code)] cpal::Stream);

unsafe impl Send for StreamHandle {}

/// Output device selection.
#[derive(Debug, Clone, Default)]
pub struct AudioOutput {
    device_index: Option<usize>,
}

impl AudioOutput {
    pub fn new(device_index: Option<usize>) -> Self {
        Self { device_index }
    }

    pub fn device_name(&self) -> Result<String> {
        Ok(get_device(self.device_index)?.name()?)
    }

    pub fn list_devices() -> Result<Vec<String>> {
        cpal::default_host()
            .output_devices()?
            .enumerate()
            .map(|(i, d)| Ok(format!("{i}: {}", d.name()?)))
            .collect()
    }

    /// Start a stream for `track`. Playback begins stopped at position zero.
    pub fn open(&self, track: PcmTrack) -> Result<(OutputTransport, OutputClick)> {
        let device = get_device(self.device_index)?;
        let config = device.default_output_config()?;
        let device_rate = config.sample_rate().0;

        let shared = Arc::new(PlaybackShared {
            track,
            position_frames: AtomicDouble::new(0.0),
            seek_frames: AtomicDouble::new(0.0),
            seek_pending: AtomicFlag::new(false),
            rate: AtomicDouble::new(1.0),
            playing: AtomicFlag::new(false),
            paused: AtomicFlag::new(false),
            click_trigger: AtomicFlag::new(false),
            click_silence: AtomicFlag::new(false),
        });
        let click = ClickSound::generate(device_rate);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &config.into(), Arc::clone(&shared), click)?
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config.into(), Arc::clone(&shared), click)?
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &config.into(), Arc::clone(&shared), click)?
            }
            format => {
                return Err(Error::InvalidConfig(format!(
                    "Unsupported sample format: {format:?}"
                )));
            }
        };

        stream.play()?;
        debug!(
            "Audio output started: device rate {} Hz, track {} Hz x{}",
            device_rate, shared.track.sample_rate, shared.track.channels
        );

        Ok((
            OutputTransport {
                shared: Arc::clone(&shared),
                _stream: StreamHandle(stream),
            },
            OutputClick { shared },
        ))
    }
}

/// Playhead of an open output stream. Dropping it closes the stream.
pub struct OutputTransport {
    shared: Arc<PlaybackShared>,
    _stream: StreamHandle,
}

impl Transport for OutputTransport {
    fn play(&mut self) -> Result<()> {
        self.shared.paused.set(false);
        self.shared.playing.set(true);
        Ok(())
    }

    fn toggle_pause(&mut self) -> Result<()> {
        if self.shared.paused.get() {
            self.shared.paused.set(false);
            self.shared.playing.set(true);
        } else if self.shared.playing.get() {
            self.shared.playing.set(false);
            self.shared.paused.set(true);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.shared.playing.set(false);
        self.shared.paused.set(false);
        self.shared.request_seek(0.0);
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        let frames =
            (position_ms as f64 * self.shared.frames_per_ms()).min(self.shared.total_frames());
        self.shared.request_seek(frames);
        Ok(())
    }

    fn position_ms(&self) -> Result<u64> {
        let frames = self.shared.position_frames.get();
        Ok((frames / self.shared.frames_per_ms()) as u64)
    }

    fn duration_ms(&self) -> Result<u64> {
        Ok(self.shared.track.duration_ms())
    }

    fn set_rate(&mut self, rate: PlaybackRate) -> Result<()> {
        self.shared.rate.set(rate.get());
        Ok(())
    }

    fn rate(&self) -> PlaybackRate {
        PlaybackRate::new(self.shared.rate.get()).unwrap_or_default()
    }

    fn is_ended(&self) -> Result<bool> {
        Ok(self.shared.playing.get()
            && self.shared.position_frames.get() >= self.shared.total_frames())
    }

    fn is_playing(&self) -> bool {
        self.shared.playing.get()
    }

    fn is_paused(&self) -> bool {
        self.shared.paused.get()
    }
}

/// Click trigger mixed into the output stream.
#[derive(Clone)]
pub struct OutputClick {
    shared: Arc<PlaybackShared>,
}

impl ClickEmitter for OutputClick {
    fn play_click(&mut self) -> Result<()> {
        self.shared.click_trigger.set(true);
        Ok(())
    }

    fn silence(&mut self) -> Result<()> {
        self.shared.click_silence.set(true);
        Ok(())
    }
}

fn get_device(index: Option<usize>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    match index {
        Some(i) => {
            let devices: Vec<_> = host.output_devices()?.collect();
            let count = devices.len();
            devices.into_iter().nth(i).ok_or_else(|| {
                Error::InvalidDevice(format!("Device index {i} out of range ({count} available)"))
            })
        }
        None => host
            .default_output_device()
            .ok_or_else(|| Error::InvalidDevice("No output device available".into())),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: Arc<PlaybackShared>,
    click: ClickSound,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let step_scale = shared.track.sample_rate as f64 / config.sample_rate.0 as f64;
    // Start past the end so nothing sounds until the first trigger
    let mut click_pos = click.len();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                if shared.click_silence.take() {
                    click_pos = click.len();
                }
                if shared.click_trigger.take() {
                    click_pos = 0;
                }
                render(data, channels, step_scale, &shared, &click, &mut click_pos);
            }));

            if result.is_err() {
                output_silence(data);
            }
        },
        |err| error!("Audio stream error: {}", err),
        None,
    )?;

    Ok(stream)
}

/// Varispeed track playback with linear interpolation, plus the click.
#[inline]
fn render<T: cpal::SizedSample + cpal::FromSample<f32>>(
    data: &mut [T],
    channels: usize,
    step_scale: f64,
    shared: &PlaybackShared,
    click: &ClickSound,
    click_pos: &mut usize,
) {
    let playing = shared.playing.get();
    let total = shared.total_frames();
    let step = shared.rate.get() * step_scale;
    let mut pos = if shared.seek_pending.take() {
        shared.seek_frames.get()
    } else {
        shared.position_frames.get()
    };

    for frame in data.chunks_mut(channels) {
        let (index, frac) = (pos.floor() as usize, (pos - pos.floor()) as f32);
        let audible = playing && pos < total;

        let click_sample = if *click_pos < click.len() {
            let s = click.samples()[*click_pos];
            *click_pos += 1;
            s
        } else {
            0.0
        };

        for (ch, out) in frame.iter_mut().enumerate() {
            let track_sample = if audible {
                let a = shared.track.sample(index, ch);
                let b = shared.track.sample(index + 1, ch);
                a + (b - a) * frac
            } else {
                0.0
            };
            *out = T::from_sample((track_sample + click_sample).clamp(-1.0, 1.0));
        }

        if audible {
            pos = (pos + step).min(total);
        }
    }

    // A seek that landed mid-buffer wins over this buffer's advance
    if playing && !shared.seek_pending.get() {
        shared.position_frames.set(pos);
    }
}

/// Output silence (panic recovery).
#[inline]
fn output_silence<T: cpal::SizedSample + cpal::FromSample<f32>>(data: &mut [T]) {
    for sample in data.iter_mut() {
        *sample = T::from_sample(0.0);
    }
}
