//! # Clicktrack Analysis
//!
//! Offline analysis of whole tracks for the click track engine:
//! - **Decoding**: any format Symphonia understands, to interleaved f32
//! - **Onset envelope**: spectral flux over log-compressed spectra
//! - **Beat tracking**: autocorrelation tempo plus dynamic-programming beats
//! - **Waveform**: min/max/RMS blocks for the transport display
//!
//! ## Example
//!
//! ```rust
//! use clicktrack_analysis::{compute_summary, BeatTracker};
//!
//! let samples: Vec<f32> = vec![0.0; 44100];
//!
//! let summary = compute_summary(&samples, 1, 512);
//! let detection = BeatTracker::new().track(&samples, 44100);
//! assert!(detection.beat_times_sec.is_empty());
//! # let _ = summary;
//! ```

pub mod decode;
pub mod error;
pub mod onset;
pub mod tempo;
pub mod waveform;

mod handle;


pub use decode::{decode_file, DecodedAudio};
pub use error::{Error, Result};
pub use handle::{AnalysisHandle, DEFAULT_SAMPLES_PER_BLOCK};
pub use onset::{OnsetDetector, OnsetEnvelope};
pub use tempo::{BeatTracker, BeatTrackerConfig};
pub use waveform::{compute_summary, WaveformBlock, WaveformSummary};
