//! Waveform overview for the transport display.
//!
//! Blocks hold min/max/RMS over all channels of a fixed number of frames.
//! [`WaveformSummary::resample`] folds the blocks into a fixed column count.

/// A single block of waveform summary data
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct WaveformBlock {
    pub min: f32,
    pub max: f32,
    pub rms: f32,
}

impl WaveformBlock {
    fn merge(blocks: &[WaveformBlock]) -> WaveformBlock {
        if blocks.is_empty() {
            return WaveformBlock::default();
        }
        let min = blocks.iter().map(|b| b.min).fold(f32::MAX, f32::min);
        let max = blocks.iter().map(|b| b.max).fold(f32::MIN, f32::max);
        let power = blocks.iter().map(|b| b.rms * b.rms).sum::<f32>() / blocks.len() as f32;
        WaveformBlock {
            min,
            max,
            rms: power.sqrt(),
        }
    }
}

/// Waveform summary of a whole track
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct WaveformSummary {
    pub blocks: Vec<WaveformBlock>,
    /// Frames per block
    pub samples_per_block: usize,
    /// Frames summarized
    pub total_samples: usize,
}

impl WaveformSummary {
    pub fn new(samples_per_block: usize) -> Self {
        Self {
            blocks: Vec::new(),
            samples_per_block,
            total_samples: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Overall peak level
    pub fn peak(&self) -> f32 {
        self.blocks
            .iter()
            .map(|b| b.min.abs().max(b.max.abs()))
            .fold(0.0f32, f32::max)
    }

    /// Fold the summary into `width` columns.
    ///
    /// Each column covers a contiguous range of blocks. When there are fewer
    /// blocks than columns the blocks are returned unchanged.
    pub fn resample(&self, width: usize) -> Vec<WaveformBlock> {
        if width == 0 || self.blocks.is_empty() {
            return Vec::new();
        }
        if self.blocks.len() <= width {
            return self.blocks.clone();
        }

        let n = self.blocks.len();
        (0..width)
            .map(|col| {
                let start = col * n / width;
                let end = ((col + 1) * n / width).max(start + 1);
                WaveformBlock::merge(&self.blocks[start..end])
            })
            .collect()
    }
}

/// Summarize interleaved `samples` in blocks of `samples_per_block` frames.
pub fn compute_summary(
    samples: &[f32],
    channels: usize,
    samples_per_block: usize,
) -> WaveformSummary {
    if samples.is_empty() || samples_per_block == 0 || channels == 0 {
        return WaveformSummary::new(samples_per_block);
    }

    let frames = samples.len() / channels;
    let mut summary = WaveformSummary {
        blocks: Vec::with_capacity(frames.div_ceil(samples_per_block)),
        samples_per_block,
        total_samples: frames,
    };

    for block in samples[..frames * channels].chunks(samples_per_block * channels) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut sum_sq = 0.0f32;
        for &sample in block {
            min = min.min(sample);
            max = max.max(sample);
            sum_sq += sample * sample;
        }
        summary.blocks.push(WaveformBlock {
            min,
            max,
            rms: (sum_sq / block.len() as f32).sqrt(),
        });
    }

    summary
}
