//! The fixed-order audio feature vector.

use serde::{Deserialize, Serialize};

use super::AnalyzeError;
use super::beat;
use super::decode::AudioSignal;
use super::dsp;

/// CQT tuning: 84 bins, 12 per octave, from A1.
const CQT_FMIN_HZ: f64 = 55.0;
const CQT_N_BINS: usize = 84;

/// Audio feature vector for one song.
///
/// Field order IS the vector order — downstream code concatenates this
/// vector positionally with the lyric features, so the order here is a
/// published contract:
///
/// 1. `tempo` 2. `first_beat` 3. `max_volume(PW)` 4. `volume_sd(PW)`
/// 5. `zcr` 6. `mean_fit_coefficient0` 7. `mean_fit_coefficient1`
/// 8. `mean_fit_coefficient2` 9. `mean_flatness` 10. `mean_harmonic_flatness`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// Estimated tempo in beats per minute.
    pub tempo: f64,
    /// Time of the first detected beat, in seconds.
    pub first_beat: f64,
    /// Maximum of the perceptually weighted CQT, in dB.
    #[serde(rename = "max_volume(PW)")]
    pub max_volume_pw: f64,
    /// Standard deviation of the perceptually weighted CQT, in dB.
    #[serde(rename = "volume_sd(PW)")]
    pub volume_sd_pw: f64,
    /// Whole-signal single-frame zero-crossing rate.
    pub zcr: f64,
    /// Mean constant coefficient of the per-frame spectral polynomial fit.
    pub mean_fit_coefficient0: f64,
    /// Mean linear coefficient.
    pub mean_fit_coefficient1: f64,
    /// Mean quadratic coefficient.
    pub mean_fit_coefficient2: f64,
    /// Mean spectral flatness of the full signal.
    pub mean_flatness: f64,
    /// Mean spectral flatness of the harmonic component.
    pub mean_harmonic_flatness: f64,
}

impl AudioFeatures {
    /// Feature labels, in vector order.
    pub const LABELS: [&'static str; 10] = [
        "tempo",
        "first_beat",
        "max_volume(PW)",
        "volume_sd(PW)",
        "zcr",
        "mean_fit_coefficient0",
        "mean_fit_coefficient1",
        "mean_fit_coefficient2",
        "mean_flatness",
        "mean_harmonic_flatness",
    ];

    /// The feature values, in label order.
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.tempo,
            self.first_beat,
            self.max_volume_pw,
            self.volume_sd_pw,
            self.zcr,
            self.mean_fit_coefficient0,
            self.mean_fit_coefficient1,
            self.mean_fit_coefficient2,
            self.mean_flatness,
            self.mean_harmonic_flatness,
        ]
    }
}

/// Run the five sub-computations in fixed order and assemble the vector.
pub fn extract(signal: &AudioSignal) -> Result<AudioFeatures, AnalyzeError> {
    let sr = signal.sample_rate;
    let spec = dsp::stft_magnitude(&signal.samples, sr);

    // 1. Harmonic/percussive split, beat tracking on the percussive part
    let (harmonic, percussive) = dsp::hpss(&spec);
    let onset_env = dsp::onset_strength(&percussive);
    let tempo = beat::estimate_tempo(&onset_env, sr).ok_or(AnalyzeError::NoBeats)?;
    let beats = beat::detect_beats(&onset_env, tempo, sr);
    let first_beat = *beats.first().ok_or(AnalyzeError::NoBeats)?;

    // 2. Perceptually weighted constant-Q loudness statistics
    let cqt = dsp::cqt_magnitude(&signal.samples, sr, CQT_FMIN_HZ, CQT_N_BINS);
    let freqs: Vec<f64> = (0..CQT_N_BINS)
        .map(|k| CQT_FMIN_HZ * 2.0f64.powf(k as f64 / 12.0))
        .collect();
    let pw = dsp::perceptual_weighting(&cqt, &freqs);
    let flat: Vec<f64> = pw.into_iter().flatten().collect();
    let max_volume_pw = flat.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let volume_sd_pw = dsp::std_dev(&flat);

    // 3. Zero-crossing rate over the entire signal as one frame
    let zcr = dsp::zero_crossing_rate_whole(&signal.samples);

    // 4. Per-frame degree-2 spectral polynomial fit
    let (c0, c1, c2) = dsp::poly_fit_means(&spec);

    // 5. Spectral flatness: full signal and harmonic component
    let mean_flatness = dsp::spectral_flatness_mean(&spec);
    let mean_harmonic_flatness = dsp::spectral_flatness_mean(&harmonic);

    Ok(AudioFeatures {
        tempo,
        first_beat,
        max_volume_pw,
        volume_sd_pw,
        zcr,
        mean_fit_coefficient0: c0,
        mean_fit_coefficient1: c1,
        mean_fit_coefficient2: c2,
        mean_flatness,
        mean_harmonic_flatness,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signal() -> AudioSignal {
        // Two seconds: 440 Hz tone with clicks every half second
        let sr = 22_050u32;
        let mut samples: Vec<f32> = (0..(2 * sr) as usize)
            .map(|i| 0.4 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr as f32).sin())
            .collect();
        for start in (0..samples.len()).step_by(sr as usize / 2) {
            for j in start..(start + 64).min(samples.len()) {
                samples[j] += if j % 2 == 0 { 0.6 } else { -0.6 };
            }
        }
        AudioSignal {
            samples,
            sample_rate: sr,
        }
    }

    #[test]
    fn test_labels_match_vector_order() {
        let f = AudioFeatures {
            tempo: 1.0,
            first_beat: 2.0,
            max_volume_pw: 3.0,
            volume_sd_pw: 4.0,
            zcr: 5.0,
            mean_fit_coefficient0: 6.0,
            mean_fit_coefficient1: 7.0,
            mean_fit_coefficient2: 8.0,
            mean_flatness: 9.0,
            mean_harmonic_flatness: 10.0,
        };
        let v = f.to_vec();
        assert_eq!(v.len(), AudioFeatures::LABELS.len());
        assert_eq!(v, (1..=10).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_extract_is_deterministic() {
        let signal = test_signal();
        let a = extract(&signal).unwrap();
        let b = extract(&signal).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extract_feature_ranges() {
        let signal = test_signal();
        let f = extract(&signal).unwrap();
        assert!(f.tempo >= 30.0 && f.tempo <= 240.0, "tempo {}", f.tempo);
        assert!(f.first_beat >= 0.0 && f.first_beat < 2.0);
        assert!(f.zcr > 0.0 && f.zcr < 1.0);
        assert!(f.mean_flatness > 0.0 && f.mean_flatness <= 1.0);
        assert!(f.mean_harmonic_flatness > 0.0 && f.mean_harmonic_flatness <= 1.0);
        assert!(f.volume_sd_pw > 0.0);
    }

    #[test]
    fn test_silence_has_no_beats() {
        let signal = AudioSignal {
            samples: vec![0.0f32; 22_050],
            sample_rate: 22_050,
        };
        assert!(matches!(extract(&signal), Err(AnalyzeError::NoBeats)));
    }

    #[test]
    fn test_serde_key_names() {
        let signal = test_signal();
        let f = extract(&signal).unwrap();
        let json = serde_json::to_value(&f).unwrap();
        for label in AudioFeatures::LABELS {
            assert!(json.get(label).is_some(), "missing key {label}");
        }
    }
}
