pub mod beat;
pub mod decode;
pub mod dsp;
pub mod features;

use std::path::Path;

use thiserror::Error;

pub use decode::{AudioSignal, DecodeError, load_audio};
pub use features::AudioFeatures;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("No beats detected in signal")]
    NoBeats,
}

/// Audio feature extractor for a single song.
///
/// Construction loads and decodes the file; it fails when the path does
/// not resolve to readable audio, so a constructed analyzer is always
/// usable.
pub struct AudioAnalyzer {
    signal: AudioSignal,
}

impl AudioAnalyzer {
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let signal = load_audio(path)?;
        log::debug!(
            "Loaded {} ({:.1}s at {} Hz)",
            path.display(),
            signal.duration_secs(),
            signal.sample_rate
        );
        Ok(Self { signal })
    }

    pub fn signal(&self) -> &AudioSignal {
        &self.signal
    }

    /// Extract the fixed-order feature vector. Deterministic for a fixed
    /// input signal.
    pub fn extract_features(&self) -> Result<AudioFeatures, AnalyzeError> {
        features::extract(&self.signal)
    }
}

/// Convenience: open and analyze in one step.
pub fn analyze_file(path: &Path) -> Result<AudioFeatures, AnalyzeError> {
    AudioAnalyzer::open(path)?.extract_features()
}
