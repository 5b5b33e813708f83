//! Small numeric helpers shared by the quality analyzer and the rate estimators.
//!
//! All statistics are population-style (divide by `n`), matching how the
//! buffers are analysed as a complete window rather than a sample of a larger
//! process. Empty inputs yield `0.0` instead of `NaN`.
use std::f64::consts::PI;
/// Floor applied to both power terms of the SNR so silent signals do not produce `-inf`.
pub const POWER_FLOOR: f64 = 0.1;
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}
pub fn variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    data.iter()
        .map(|v| {
            let delta = v - m;
            delta * delta
        })
        .sum::<f64>()
        / data.len() as f64
}
pub fn std_dev(data: &[f64]) -> f64 {
    variance(data).sqrt()
}
/// Subtract the mean from every sample.
pub fn demean(data: &[f64]) -> Vec<f64> {
    let m = mean(data);
    data.iter().map(|v| v - m).collect()
}
/// Mean absolute first difference, used as the per-channel "variation" / motion estimate.
pub fn mean_abs_diff(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let total: f64 = data.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    total / (data.len() - 1) as f64
}
/// Moving average over `[i - radius, i + radius]`, truncated at the edges.
pub fn centered_moving_average(data: &[f64], radius: usize) -> Vec<f64> {
    let n = data.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(n - 1);
            let slice = &data[lo..=hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}
/// Moving-average smoothing with a window of `window` samples (radius `window / 2`).
pub fn smooth(data: &[f64], window: usize) -> Vec<f64> {
    centered_moving_average(data, window / 2)
}
/// Detrend with a centered moving average, then compare the residual's power to its variance.
pub fn detrended_snr_db(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let trend = centered_moving_average(data, data.len().min(10));
    let detrended: Vec<f64> = data.iter().zip(&trend).map(|(v, t)| v - t).collect();
    let signal_power = detrended.iter().map(|v| v * v).sum::<f64>() / detrended.len() as f64;
    let noise_power = variance(&detrended);
    10.0 * (signal_power.max(POWER_FLOOR) / noise_power.max(POWER_FLOOR)).log10()
}
/// Multiply by a Hann window `0.5 * (1 - cos(2πi / (N - 1)))`.
pub fn apply_hann(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n < 2 {
        return data.to_vec();
    }
    let denom = (n - 1) as f64;
    data.iter()
        .enumerate()
        .map(|(i, v)| v * 0.5 * (1.0 - (2.0 * PI * i as f64 / denom).cos()))
        .collect()
}
/// Pearson correlation; `0.0` when either input has zero variance or the lengths differ.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mean_a = mean(a);
    let mean_b = mean(b);
    let mut num = 0.0;
    let mut den_a = 0.0;
    let mut den_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        num += da * db;
        den_a += da * da;
        den_b += db * db;
    }
    if den_a == 0.0 || den_b == 0.0 {
        return 0.0;
    }
    num / (den_a * den_b).sqrt()
}
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
