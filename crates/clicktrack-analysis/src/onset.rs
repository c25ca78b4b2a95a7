//! Onset strength envelope.
//!
//! Spectral flux over log-compressed magnitude spectra: for every hop the
//! positive spectral change is averaged across bins. Frames are centered,
//! so frame `i` describes the audio around sample `i * hop_size`.

use rustfft::{num_complex::Complex, FftPlanner};

/// Default FFT size for analysis
const DEFAULT_FFT_SIZE: usize = 2048;

/// Default hop size (samples between analysis frames)
const DEFAULT_HOP_SIZE: usize = 512;

/// Magnitude compression factor for `ln(1 + C * |X|)`
const LOG_COMPRESSION: f32 = 100.0;

/// Onset strength per analysis frame.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct OnsetEnvelope {
    pub values: Vec<f32>,
    pub hop_size: usize,
    pub sample_rate: f64,
}

impl OnsetEnvelope {
    /// Envelope frames per second.
    pub fn frame_rate(&self) -> f64 {
        if self.hop_size == 0 {
            return 0.0;
        }
        self.sample_rate / self.hop_size as f64
    }

    pub fn frame_to_secs(&self, frame: f64) -> f64 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        frame * self.hop_size as f64 / self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the envelope carries any energy at all.
    pub fn is_silent(&self) -> bool {
        self.values.iter().all(|v| *v <= f32::EPSILON)
    }
}

/// Spectral-flux onset detector.
pub struct OnsetDetector {
    sample_rate: f64,
    fft_size: usize,
    hop_size: usize,
    fft_planner: FftPlanner<f32>,
    window: Vec<f32>,
    prev_spectrum: Vec<f32>,
}

impl OnsetDetector {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_params(sample_rate, DEFAULT_FFT_SIZE, DEFAULT_HOP_SIZE)
    }

    /// Create with custom FFT and hop size
    pub fn with_params(sample_rate: f64, fft_size: usize, hop_size: usize) -> Self {
        let fft_size = fft_size.max(2).next_power_of_two();
        let window = Self::create_hann_window(fft_size);

        Self {
            sample_rate,
            fft_size,
            hop_size: hop_size.max(1),
            fft_planner: FftPlanner::new(),
            window,
            prev_spectrum: vec![0.0; fft_size / 2],
        }
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Create Hann window
    fn create_hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let angle = 2.0 * core::f32::consts::PI * i as f32 / (size - 1) as f32;
                0.5 * (1.0 - angle.cos())
            })
            .collect()
    }

    /// Compute the onset envelope of mono `samples`.
    pub fn compute(&mut self, samples: &[f32]) -> OnsetEnvelope {
        let mut envelope = OnsetEnvelope {
            values: Vec::new(),
            hop_size: self.hop_size,
            sample_rate: self.sample_rate,
        };
        if samples.is_empty() {
            return envelope;
        }

        // Center frames by padding half a window on each side
        let pad = self.fft_size / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let num_frames = samples.len() / self.hop_size + 1;
        envelope.values.reserve(num_frames);
        self.prev_spectrum.fill(0.0);

        let fft = self.fft_planner.plan_fft_forward(self.fft_size);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_size];
        let bins = self.fft_size / 2;

        for frame_idx in 0..num_frames {
            let start = frame_idx * self.hop_size;
            let frame = &padded[start..start + self.fft_size];

            for ((slot, s), w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(s * w, 0.0);
            }
            fft.process(&mut buffer);

            let mut flux = 0.0f32;
            for (bin, c) in buffer[..bins].iter().enumerate() {
                let mag = (1.0 + LOG_COMPRESSION * c.norm()).ln();
                let diff = mag - self.prev_spectrum[bin];
                if diff > 0.0 {
                    flux += diff;
                }
                self.prev_spectrum[bin] = mag;
            }

            // The first frame has no predecessor
            let value = if frame_idx == 0 { 0.0 } else { flux / bins as f32 };
            envelope.values.push(value);
        }

        envelope
    }
}
