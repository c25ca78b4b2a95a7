//! Tempo estimation and beat tracking.
//!
//! Tempo comes from the autocorrelation of the onset envelope weighted by a
//! log-normal prior around `start_bpm`. Beats are then placed by dynamic
//! programming (Ellis 2007): each frame's score is its onset strength plus the
//! best predecessor score, penalised by how far the gap strays from the tempo
//! period.

use crate::onset::{OnsetDetector, OnsetEnvelope};
use clicktrack_core::{BeatDetection, BeatDetector};
use tracing::debug;

/// Beat tracker parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BeatTrackerConfig {
    /// Center of the tempo prior.
    pub start_bpm: f64,
    /// Width of the tempo prior in octaves.
    pub std_bpm: f64,
    /// Upper bound on detected tempo.
    pub max_bpm: f64,
    /// How strictly beats follow the tempo period.
    pub tightness: f64,
    /// Longest autocorrelation lag considered, in seconds.
    pub ac_window_secs: f64,
}

impl Default for BeatTrackerConfig {
    fn default() -> Self {
        Self {
            start_bpm: 120.0,
            std_bpm: 1.0,
            max_bpm: 320.0,
            tightness: 100.0,
            ac_window_secs: 8.0,
        }
    }
}

/// Offline beat tracker over mono audio.
#[derive(Debug, Clone, Default)]
pub struct BeatTracker {
    config: BeatTrackerConfig,
}

impl BeatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BeatTrackerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BeatTrackerConfig {
        &self.config
    }

    /// Track beats in mono `samples`. Silent or too-short input yields no beats.
    pub fn track(&self, samples: &[f32], sample_rate: u32) -> BeatDetection {
        let mut detector = OnsetDetector::new(sample_rate as f64);
        let envelope = detector.compute(samples);
        self.track_envelope(&envelope)
    }

    /// Track beats on a precomputed onset envelope.
    pub fn track_envelope(&self, envelope: &OnsetEnvelope) -> BeatDetection {
        let none = BeatDetection {
            tempo_bpm: 0.0,
            beat_times_sec: Vec::new(),
        };
        if envelope.len() < 3 || envelope.is_silent() {
            return none;
        }

        let frame_rate = envelope.frame_rate();
        let Some(tempo_bpm) = self.estimate_tempo(&envelope.values, frame_rate) else {
            return none;
        };

        let period = 60.0 * frame_rate / tempo_bpm;
        let beats = self.track_beats(&envelope.values, period);
        let beat_times_sec: Vec<f64> = beats
            .iter()
            .map(|&frame| envelope.frame_to_secs(frame as f64))
            .collect();

        debug!(
            "Beat tracker: {:.2} BPM, {} beats over {} frames",
            tempo_bpm,
            beat_times_sec.len(),
            envelope.len()
        );

        BeatDetection {
            tempo_bpm,
            beat_times_sec,
        }
    }

    /// Tempo in BPM from the prior-weighted autocorrelation of `onset`.
    pub fn estimate_tempo(&self, onset: &[f32], frame_rate: f64) -> Option<f64> {
        if onset.len() < 3 || frame_rate <= 0.0 {
            return None;
        }

        let max_lag = ((self.config.ac_window_secs * frame_rate).round() as usize)
            .min(onset.len() - 1)
            .max(2);
        let min_lag = ((60.0 * frame_rate / self.config.max_bpm).floor() as usize).max(1);
        if min_lag + 1 >= max_lag {
            return None;
        }

        let ac = autocorrelate(onset, max_lag + 1);
        let weighted: Vec<f64> = (0..=max_lag)
            .map(|lag| {
                if lag < min_lag {
                    return 0.0;
                }
                let bpm = 60.0 * frame_rate / lag as f64;
                ac[lag] * self.prior(bpm)
            })
            .collect();

        let (best_lag, best) = weighted
            .iter()
            .enumerate()
            .skip(min_lag)
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        if *best <= 0.0 {
            return None;
        }

        let lag = refine_peak(&weighted, best_lag);
        Some(60.0 * frame_rate / lag)
    }

    /// Log-normal tempo prior.
    fn prior(&self, bpm: f64) -> f64 {
        let octaves = (bpm / self.config.start_bpm).log2() / self.config.std_bpm;
        (-0.5 * octaves * octaves).exp()
    }

    /// Beat frames by dynamic programming over the onset envelope.
    pub fn track_beats(&self, onset: &[f32], period: f64) -> Vec<usize> {
        if onset.is_empty() || !(period > 1.0) {
            return Vec::new();
        }

        let local_score = local_score(onset, period);
        let n = local_score.len();

        let mut cumulative = vec![0.0f64; n];
        let mut backlink: Vec<Option<usize>> = vec![None; n];

        let window_start = (2.0 * period).round() as usize;
        let window_end = (period / 2.0).round().max(1.0) as usize;

        for i in 0..n {
            let lo = i.saturating_sub(window_start);
            let hi = i.saturating_sub(window_end);

            let mut best: Option<(usize, f64)> = None;
            if i >= window_end {
                for prev in lo..=hi {
                    let gap = (i - prev) as f64;
                    let penalty = -self.config.tightness * (gap / period).ln().powi(2);
                    let score = cumulative[prev] + penalty;
                    match best {
                        Some((_, b)) if b >= score => {}
                        _ => best = Some((prev, score)),
                    }
                }
            }

            match best {
                Some((prev, score)) if score > 0.0 => {
                    cumulative[i] = local_score[i] + score;
                    backlink[i] = Some(prev);
                }
                _ => cumulative[i] = local_score[i],
            }
        }

        let Some(last) = last_beat(&cumulative) else {
            return Vec::new();
        };

        let mut beats = vec![last];
        let mut cursor = last;
        while let Some(prev) = backlink[cursor] {
            beats.push(prev);
            cursor = prev;
        }
        beats.reverse();

        trim_weak_beats(&mut beats, &local_score);
        beats
    }
}

impl BeatDetector for BeatTracker {
    fn detect_beats(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> clicktrack_core::Result<BeatDetection> {
        if sample_rate == 0 {
            return Err(clicktrack_core::Error::Detection(
                "sample rate must be positive".into(),
            ));
        }
        Ok(self.track(samples, sample_rate))
    }
}

/// Unnormalised autocorrelation for lags `0..max_lag`.
fn autocorrelate(signal: &[f32], max_lag: usize) -> Vec<f64> {
    (0..max_lag.min(signal.len()))
        .map(|lag| {
            signal[lag..]
                .iter()
                .zip(signal)
                .map(|(a, b)| *a as f64 * *b as f64)
                .sum()
        })
        .collect()
}

/// Parabolic interpolation of a peak index.
fn refine_peak(values: &[f64], index: usize) -> f64 {
    if index == 0 || index + 1 >= values.len() {
        return index as f64;
    }
    let (a, b, c) = (values[index - 1], values[index], values[index + 1]);
    let denom = a - 2.0 * b + c;
    if denom.abs() < f64::EPSILON {
        return index as f64;
    }
    let shift = 0.5 * (a - c) / denom;
    index as f64 + shift.clamp(-0.5, 0.5)
}

/// Onset envelope normalised by its standard deviation and smoothed with a
/// Gaussian whose width follows the beat period.
fn local_score(onset: &[f32], period: f64) -> Vec<f64> {
    let n = onset.len() as f64;
    let mean = onset.iter().map(|v| *v as f64).sum::<f64>() / n;
    let var = onset
        .iter()
        .map(|v| (*v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std = var.sqrt();
    let norm: Vec<f64> = onset
        .iter()
        .map(|v| if std > 0.0 { *v as f64 / std } else { *v as f64 })
        .collect();

    let half = period.round() as isize;
    let kernel: Vec<f64> = (-half..=half)
        .map(|t| (-0.5 * (t as f64 * 32.0 / period).powi(2)).exp())
        .collect();

    (0..norm.len() as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, w)| {
                    let j = i + k as isize - half;
                    (j >= 0 && (j as usize) < norm.len()).then(|| w * norm[j as usize])
                })
                .sum()
        })
        .collect()
}

/// Last local maximum of the cumulative score that is at least half the median of
/// all local maxima.
fn last_beat(cumulative: &[f64]) -> Option<usize> {
    let n = cumulative.len();
    if n == 0 {
        return None;
    }
    let is_max = |i: usize| {
        let left = if i == 0 { f64::MIN } else { cumulative[i - 1] };
        let right = if i + 1 == n { f64::MIN } else { cumulative[i + 1] };
        cumulative[i] > left && cumulative[i] >= right
    };

    let mut maxima: Vec<f64> = (0..n).filter(|&i| is_max(i)).map(|i| cumulative[i]).collect();
    if maxima.is_empty() {
        return Some(n - 1);
    }
    maxima.sort_by(|a, b| a.total_cmp(b));
    let threshold = 0.5 * maxima[maxima.len() / 2];

    (0..n).rev().find(|&i| is_max(i) && cumulative[i] >= threshold)
}

/// Drop leading and trailing beats whose local score is below half the RMS of
/// all beat scores.
fn trim_weak_beats(beats: &mut Vec<usize>, local_score: &[f64]) {
    if beats.is_empty() {
        return;
    }
    let rms = (beats
        .iter()
        .map(|&b| local_score[b].powi(2))
        .sum::<f64>()
        / beats.len() as f64)
        .sqrt();
    let threshold = 0.5 * rms;

    let first = beats.iter().position(|&b| local_score[b] >= threshold);
    let last = beats.iter().rposition(|&b| local_score[b] >= threshold);
    match (first, last) {
        (Some(first), Some(last)) => {
            beats.truncate(last + 1);
            beats.drain(..first);
        }
        _ => beats.clear(),
    }
}
