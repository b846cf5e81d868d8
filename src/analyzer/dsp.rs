//! Spectral kernels used by the feature extractor: STFT, spectrogram-domain
//! harmonic/percussive separation, constant-Q transform, perceptual
//! weighting, flatness, and per-frame polynomial fits.

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

/// STFT window size in samples.
pub const N_FFT: usize = 2048;
/// Hop between analysis frames in samples.
pub const HOP_LENGTH: usize = 512;
/// Floor applied before logs and ratios.
pub const AMIN: f64 = 1e-10;

/// Magnitude spectrogram: `frames[t][k]` is the magnitude of bin `k`
/// at frame `t`. Bin spacing is `sample_rate / n_fft`.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub n_fft: usize,
}

impl Spectrogram {
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn n_bins(&self) -> usize {
        self.frames.first().map(|f| f.len()).unwrap_or(0)
    }

    /// Center frequency of FFT bin `k` in Hz.
    pub fn bin_freq(&self, k: usize) -> f64 {
        k as f64 * self.sample_rate as f64 / self.n_fft as f64
    }
}

/// Reflect an out-of-range index back into `[0, len)`.
fn reflect_index(i: isize, len: usize) -> usize {
    let len = len as isize;
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * (len - 1) - i;
        } else {
            return i as usize;
        }
    }
}

/// Magnitude STFT with a periodic Hann window and centered,
/// reflection-padded frames.
pub fn stft_magnitude(samples: &[f32], sample_rate: u32) -> Spectrogram {
    let n_bins = N_FFT / 2 + 1;
    let window: Vec<f32> = (0..N_FFT)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / N_FFT as f32).cos()))
        .collect();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(N_FFT);

    let n_frames = 1 + samples.len() / HOP_LENGTH;
    let half = (N_FFT / 2) as isize;
    let mut frames = Vec::with_capacity(n_frames);
    let mut buf = vec![Complex::new(0.0f32, 0.0f32); N_FFT];

    for t in 0..n_frames {
        let center = (t * HOP_LENGTH) as isize;
        for (i, b) in buf.iter_mut().enumerate() {
            let idx = reflect_index(center - half + i as isize, samples.len());
            *b = Complex::new(samples[idx] * window[i], 0.0);
        }
        fft.process(&mut buf);
        frames.push(buf[..n_bins].iter().map(|c| c.norm()).collect());
    }

    Spectrogram {
        frames,
        sample_rate,
        n_fft: N_FFT,
    }
}

/// Median of a small scratch slice. Sorts in place.
fn median_in_place(scratch: &mut [f32]) -> f32 {
    scratch.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    scratch[scratch.len() / 2]
}

/// Harmonic/percussive separation on the magnitude spectrogram.
///
/// Harmonic content is smooth across time, percussive content is smooth
/// across frequency; each is enhanced with a median filter along its axis
/// and the spectrogram is split with binary masks.
pub fn hpss(spec: &Spectrogram) -> (Spectrogram, Spectrogram) {
    const KERNEL: usize = 31;
    let half = KERNEL / 2;
    let n_frames = spec.n_frames();
    let n_bins = spec.n_bins();

    let mut harmonic_enh = vec![vec![0.0f32; n_bins]; n_frames];
    let mut percussive_enh = vec![vec![0.0f32; n_bins]; n_frames];
    let mut scratch = Vec::with_capacity(KERNEL);

    // Median across time (per bin) enhances harmonics
    for k in 0..n_bins {
        for t in 0..n_frames {
            scratch.clear();
            for dt in 0..KERNEL {
                let i = reflect_index(t as isize + dt as isize - half as isize, n_frames);
                scratch.push(spec.frames[i][k]);
            }
            harmonic_enh[t][k] = median_in_place(&mut scratch);
        }
    }

    // Median across frequency (per frame) enhances percussives
    for t in 0..n_frames {
        for k in 0..n_bins {
            scratch.clear();
            for dk in 0..KERNEL {
                let i = reflect_index(k as isize + dk as isize - half as isize, n_bins);
                scratch.push(spec.frames[t][i]);
            }
            percussive_enh[t][k] = median_in_place(&mut scratch);
        }
    }

    let mut harmonic = vec![vec![0.0f32; n_bins]; n_frames];
    let mut percussive = vec![vec![0.0f32; n_bins]; n_frames];
    for t in 0..n_frames {
        for k in 0..n_bins {
            if harmonic_enh[t][k] >= percussive_enh[t][k] {
                harmonic[t][k] = spec.frames[t][k];
            } else {
                percussive[t][k] = spec.frames[t][k];
            }
        }
    }

    (
        Spectrogram {
            frames: harmonic,
            sample_rate: spec.sample_rate,
            n_fft: spec.n_fft,
        },
        Spectrogram {
            frames: percussive,
            sample_rate: spec.sample_rate,
            n_fft: spec.n_fft,
        },
    )
}

/// Spectral-flux onset strength: positive magnitude increase per frame,
/// summed across bins.
pub fn onset_strength(spec: &Spectrogram) -> Vec<f32> {
    let n_frames = spec.n_frames();
    let mut env = vec![0.0f32; n_frames];
    for t in 1..n_frames {
        let mut flux = 0.0f32;
        for k in 0..spec.n_bins() {
            let diff = spec.frames[t][k] - spec.frames[t - 1][k];
            if diff > 0.0 {
                flux += diff;
            }
        }
        env[t] = flux;
    }
    env
}

/// Mean spectral flatness: per frame, geometric mean over arithmetic mean
/// of the power spectrum, averaged across frames. 1.0 for white noise,
/// near 0 for a pure tone.
pub fn spectral_flatness_mean(spec: &Spectrogram) -> f64 {
    if spec.n_frames() == 0 || spec.n_bins() == 0 {
        return 0.0;
    }
    let mut total = 0.0f64;
    for frame in &spec.frames {
        let n = frame.len() as f64;
        let mut log_sum = 0.0f64;
        let mut sum = 0.0f64;
        for &m in frame {
            let p = (m as f64 * m as f64).max(AMIN);
            log_sum += p.ln();
            sum += p;
        }
        let gmean = (log_sum / n).exp();
        let amean = sum / n;
        total += gmean / amean;
    }
    total / spec.n_frames() as f64
}

/// Zero-crossing rate of the entire signal taken as a single frame
/// (frame length = signal length). Collapses the rate series to one
/// value; kept for parity with historical output.
pub fn zero_crossing_rate_whole(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut crossings = 0usize;
    for w in samples.windows(2) {
        if (w[0] >= 0.0) != (w[1] >= 0.0) {
            crossings += 1;
        }
    }
    crossings as f64 / samples.len() as f64
}

/// Per-frame least-squares fit of magnitude against bin frequency with a
/// degree-2 polynomial; returns the mean constant, linear, and quadratic
/// coefficients across frames.
pub fn poly_fit_means(spec: &Spectrogram) -> (f64, f64, f64) {
    let n_frames = spec.n_frames();
    if n_frames == 0 {
        return (0.0, 0.0, 0.0);
    }
    let freqs: Vec<f64> = (0..spec.n_bins()).map(|k| spec.bin_freq(k)).collect();

    let mut sums = (0.0f64, 0.0f64, 0.0f64);
    for frame in &spec.frames {
        let (c0, c1, c2) = polyfit2(&freqs, frame);
        sums.0 += c0;
        sums.1 += c1;
        sums.2 += c2;
    }
    let n = n_frames as f64;
    (sums.0 / n, sums.1 / n, sums.2 / n)
}

/// Degree-2 polynomial least squares via the normal equations.
/// Returns (constant, linear, quadratic).
fn polyfit2(x: &[f64], y: &[f32]) -> (f64, f64, f64) {
    let n = x.len().min(y.len());
    if n < 3 {
        return (0.0, 0.0, 0.0);
    }
    let (mut s1, mut s2, mut s3, mut s4) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    let (mut t0, mut t1, mut t2) = (0.0f64, 0.0f64, 0.0f64);
    for i in 0..n {
        let xi = x[i];
        let yi = y[i] as f64;
        let xi2 = xi * xi;
        s1 += xi;
        s2 += xi2;
        s3 += xi2 * xi;
        s4 += xi2 * xi2;
        t0 += yi;
        t1 += xi * yi;
        t2 += xi2 * yi;
    }
    let s0 = n as f64;

    // Solve the symmetric 3x3 system
    // | s0 s1 s2 | |c0|   |t0|
    // | s1 s2 s3 | |c1| = |t1|
    // | s2 s3 s4 | |c2|   |t2|
    let det = s0 * (s2 * s4 - s3 * s3) - s1 * (s1 * s4 - s3 * s2) + s2 * (s1 * s3 - s2 * s2);
    if det.abs() < 1e-30 {
        return (0.0, 0.0, 0.0);
    }
    let d0 = t0 * (s2 * s4 - s3 * s3) - s1 * (t1 * s4 - s3 * t2) + s2 * (t1 * s3 - s2 * t2);
    let d1 = s0 * (t1 * s4 - t2 * s3) - t0 * (s1 * s4 - s3 * s2) + s2 * (s1 * t2 - s2 * t1);
    let d2 = s0 * (s2 * t2 - s3 * t1) - s1 * (s1 * t2 - s3 * t0) + t0 * (s1 * s3 - s2 * s2);
    (d0 / det, d1 / det, d2 / det)
}

/// Constant-Q magnitude spectrogram: `frames[t][k]`, 12 bins per octave
/// from `fmin`, hop of [`HOP_LENGTH`]. Each bin is a Hann-windowed complex
/// correlation whose window length scales inversely with frequency.
pub fn cqt_magnitude(samples: &[f32], sample_rate: u32, fmin: f64, n_bins: usize) -> Vec<Vec<f32>> {
    const BINS_PER_OCTAVE: f64 = 12.0;
    let q = 1.0 / (2.0f64.powf(1.0 / BINS_PER_OCTAVE) - 1.0);
    let sr = sample_rate as f64;

    // Precompute per-bin kernels: frequency and window length
    let bins: Vec<(f64, usize)> = (0..n_bins)
        .map(|k| {
            let f = fmin * 2.0f64.powf(k as f64 / BINS_PER_OCTAVE);
            let len = ((sr * q / f).ceil() as usize).max(2).min(samples.len().max(2));
            (f, len)
        })
        .collect();

    let n_frames = 1 + samples.len() / HOP_LENGTH;
    let mut frames = Vec::with_capacity(n_frames);

    for t in 0..n_frames {
        let center = (t * HOP_LENGTH) as isize;
        let mut row = Vec::with_capacity(n_bins);
        for &(f, len) in &bins {
            let half = (len / 2) as isize;
            let omega = 2.0 * std::f64::consts::PI * f / sr;
            let mut re = 0.0f64;
            let mut im = 0.0f64;
            let mut wsum = 0.0f64;
            for i in 0..len {
                let idx = reflect_index(center - half + i as isize, samples.len());
                let w = 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / len as f64).cos());
                let s = samples[idx] as f64 * w;
                let phase = omega * i as f64;
                re += s * phase.cos();
                im -= s * phase.sin();
                wsum += w;
            }
            row.push(((re * re + im * im).sqrt() / wsum.max(1.0)) as f32);
        }
        frames.push(row);
    }

    frames
}

/// A-weighting in dB for a frequency in Hz (IEC 61672 approximation).
pub fn a_weighting_db(freq: f64) -> f64 {
    let f2 = freq * freq;
    let num = 12194.0f64.powi(2) * f2 * f2;
    let den = (f2 + 20.6f64.powi(2))
        * ((f2 + 107.7f64.powi(2)) * (f2 + 737.9f64.powi(2))).sqrt()
        * (f2 + 12194.0f64.powi(2));
    20.0 * (num / den.max(AMIN)).log10() + 2.0
}

/// Perceptually weighted log-power CQT: A-weighting offset per bin plus
/// power-to-dB relative to the spectrogram maximum, floored 80 dB below
/// the peak.
pub fn perceptual_weighting(cqt: &[Vec<f32>], freqs: &[f64]) -> Vec<Vec<f64>> {
    const TOP_DB: f64 = 80.0;

    let mut max_power = AMIN;
    for row in cqt {
        for &m in row {
            let p = m as f64 * m as f64;
            if p > max_power {
                max_power = p;
            }
        }
    }

    let offsets: Vec<f64> = freqs.iter().map(|&f| a_weighting_db(f)).collect();
    let mut out: Vec<Vec<f64>> = cqt
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(k, &m)| {
                    let p = (m as f64 * m as f64).max(AMIN);
                    offsets[k] + 10.0 * (p / max_power).log10()
                })
                .collect()
        })
        .collect();

    // Clamp the floor relative to the weighted maximum
    let peak = out
        .iter()
        .flatten()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    for row in &mut out {
        for v in row.iter_mut() {
            if *v < peak - TOP_DB {
                *v = peak - TOP_DB;
            }
        }
    }
    out
}

/// Mean of a value set.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, secs: f32, sr: u32) -> Vec<f32> {
        (0..(secs * sr as f32) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    // Deterministic pseudo-noise, no RNG dependency
    fn noise(n: usize) -> Vec<f32> {
        let mut state = 0x2545_f491u32;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 10), 1);
        assert_eq!(reflect_index(0, 10), 0);
        assert_eq!(reflect_index(9, 10), 9);
        assert_eq!(reflect_index(10, 10), 8);
        assert_eq!(reflect_index(-3, 4), 3);
    }

    #[test]
    fn test_stft_shape() {
        let samples = sine(440.0, 1.0, 22_050);
        let spec = stft_magnitude(&samples, 22_050);
        assert_eq!(spec.n_bins(), N_FFT / 2 + 1);
        assert_eq!(spec.n_frames(), 1 + samples.len() / HOP_LENGTH);
    }

    #[test]
    fn test_stft_peak_bin_matches_frequency() {
        let samples = sine(1000.0, 1.0, 22_050);
        let spec = stft_magnitude(&samples, 22_050);
        let mid = &spec.frames[spec.n_frames() / 2];
        let peak_bin = mid
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        let peak_freq = spec.bin_freq(peak_bin);
        assert!((peak_freq - 1000.0).abs() < 30.0, "peak at {peak_freq} Hz");
    }

    #[test]
    fn test_flatness_tone_vs_noise() {
        let tone = stft_magnitude(&sine(880.0, 1.0, 22_050), 22_050);
        let noisy = stft_magnitude(&noise(22_050), 22_050);
        let tone_flatness = spectral_flatness_mean(&tone);
        let noise_flatness = spectral_flatness_mean(&noisy);
        assert!(tone_flatness < 0.1, "tone flatness {tone_flatness}");
        assert!(noise_flatness > 0.2, "noise flatness {noise_flatness}");
        assert!(noise_flatness <= 1.0);
    }

    #[test]
    fn test_zcr_whole_alternating() {
        // Strictly alternating signal crosses zero at every step
        let samples: Vec<f32> = (0..1000).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let zcr = zero_crossing_rate_whole(&samples);
        assert!((zcr - 0.999).abs() < 1e-3);
    }

    #[test]
    fn test_zcr_whole_constant_signal() {
        let samples = vec![0.7f32; 512];
        assert_eq!(zero_crossing_rate_whole(&samples), 0.0);
    }

    #[test]
    fn test_polyfit_recovers_parabola() {
        let x: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let y: Vec<f32> = x.iter().map(|&v| (3.0 + 0.5 * v - 0.02 * v * v) as f32).collect();
        let (c0, c1, c2) = polyfit2(&x, &y);
        assert!((c0 - 3.0).abs() < 1e-3);
        assert!((c1 - 0.5).abs() < 1e-4);
        assert!((c2 + 0.02).abs() < 1e-5);
    }

    #[test]
    fn test_hpss_masks_partition_energy() {
        let mut samples = sine(440.0, 1.0, 22_050);
        // Add clicks for percussive content
        for i in (0..samples.len()).step_by(11_025) {
            for j in i..(i + 64).min(samples.len()) {
                samples[j] += if j % 2 == 0 { 0.8 } else { -0.8 };
            }
        }
        let spec = stft_magnitude(&samples, 22_050);
        let (h, p) = hpss(&spec);
        for t in 0..spec.n_frames() {
            for k in 0..spec.n_bins() {
                let sum = h.frames[t][k] + p.frames[t][k];
                assert!((sum - spec.frames[t][k]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_onset_strength_spikes_on_clicks() {
        let mut samples = vec![0.0f32; 22_050];
        for i in (2048..samples.len()).step_by(5512) {
            for j in i..(i + 32).min(samples.len()) {
                samples[j] = if j % 2 == 0 { 0.9 } else { -0.9 };
            }
        }
        let spec = stft_magnitude(&samples, 22_050);
        let env = onset_strength(&spec);
        let peak = env.iter().cloned().fold(0.0f32, f32::max);
        let avg = env.iter().sum::<f32>() / env.len() as f32;
        assert!(peak > 4.0 * avg, "peak {peak} avg {avg}");
    }

    #[test]
    fn test_a_weighting_reference_points() {
        // A-weighting is 0 dB at 1 kHz by construction
        assert!(a_weighting_db(1000.0).abs() < 0.2);
        // Strong attenuation at low frequencies
        assert!(a_weighting_db(55.0) < -25.0);
    }

    #[test]
    fn test_cqt_peak_bin() {
        // 220 Hz is exactly 2 octaves above fmin = 55 Hz → bin 24
        let samples = sine(220.0, 1.0, 22_050);
        let cqt = cqt_magnitude(&samples, 22_050, 55.0, 48);
        let mid = &cqt[cqt.len() / 2];
        let peak_bin = mid
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert!((peak_bin as i64 - 24).abs() <= 1, "peak bin {peak_bin}");
    }

    #[test]
    fn test_perceptual_weighting_range() {
        let samples = sine(440.0, 0.5, 22_050);
        let cqt = cqt_magnitude(&samples, 22_050, 55.0, 48);
        let freqs: Vec<f64> = (0..48).map(|k| 55.0 * 2.0f64.powf(k as f64 / 12.0)).collect();
        let pw = perceptual_weighting(&cqt, &freqs);
        let max = pw.iter().flatten().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = pw.iter().flatten().cloned().fold(f64::INFINITY, f64::min);
        assert!(max > min);
        assert!(max - min <= 80.0 + 1e-6);
    }

    #[test]
    fn test_mean_std() {
        let vals = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&vals) - 5.0).abs() < 1e-12);
        assert!((std_dev(&vals) - 2.0).abs() < 1e-12);
    }
}
