//! Tempo estimation and beat picking on an onset-strength envelope.

use super::dsp::HOP_LENGTH;

/// Tempo search range in BPM.
const MIN_BPM: f64 = 30.0;
const MAX_BPM: f64 = 240.0;

/// Frames per minute at the analysis hop.
fn frames_per_minute(sample_rate: u32) -> f64 {
    60.0 * sample_rate as f64 / HOP_LENGTH as f64
}

/// Estimate tempo from the onset envelope by autocorrelation over the
/// lag range corresponding to 30–240 BPM. Returns `None` when the
/// envelope carries no energy.
pub fn estimate_tempo(onset_env: &[f32], sample_rate: u32) -> Option<f64> {
    let fpm = frames_per_minute(sample_rate);
    let min_lag = ((fpm / MAX_BPM).floor() as usize).max(1);
    let max_lag = (fpm / MIN_BPM).ceil() as usize;

    if onset_env.len() <= min_lag + 1 {
        return None;
    }
    let total: f64 = onset_env.iter().map(|&v| v as f64).sum();
    if total <= 0.0 {
        return None;
    }

    // Detrend so short lags don't dominate the correlation
    let mean = total / onset_env.len() as f64;
    let env: Vec<f64> = onset_env.iter().map(|&v| v as f64 - mean).collect();

    let max_lag = max_lag.min(env.len() - 1);
    let mut best_lag = 0usize;
    let mut best_corr = f64::NEG_INFINITY;
    for lag in min_lag..=max_lag {
        let mut corr = 0.0f64;
        for i in 0..(env.len() - lag) {
            corr += env[i] * env[i + lag];
        }
        // Normalize by overlap length so long lags aren't penalized
        corr /= (env.len() - lag) as f64;
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    if best_lag == 0 || best_corr <= 0.0 {
        return None;
    }
    Some(fpm / best_lag as f64)
}

/// Pick beat times (seconds) from the onset envelope: local maxima above
/// an adaptive threshold, separated by at least half the tempo period.
pub fn detect_beats(onset_env: &[f32], tempo: f64, sample_rate: u32) -> Vec<f64> {
    if onset_env.len() < 3 || tempo <= 0.0 {
        return Vec::new();
    }
    let n = onset_env.len() as f64;
    let mean = onset_env.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = onset_env
        .iter()
        .map(|&v| (v as f64 - mean) * (v as f64 - mean))
        .sum::<f64>()
        / n;
    let threshold = mean + 0.5 * var.sqrt();

    let period_frames = frames_per_minute(sample_rate) / tempo;
    let min_gap = (period_frames / 2.0).max(1.0) as usize;

    let mut beats = Vec::new();
    let mut last_beat: Option<usize> = None;
    for t in 1..onset_env.len() - 1 {
        let v = onset_env[t];
        if (v as f64) <= threshold {
            continue;
        }
        if v < onset_env[t - 1] || v < onset_env[t + 1] {
            continue;
        }
        if let Some(prev) = last_beat {
            if t - prev < min_gap {
                continue;
            }
        }
        beats.push(t as f64 * HOP_LENGTH as f64 / sample_rate as f64);
        last_beat = Some(t);
    }
    beats
}
