use log::debug;
use crate::drivers::dsp;
use crate::drivers::estimate::{EstimationMethod, RawEstimate, VitalKind};
use crate::drivers::fft::SpectralChain;
/// Breathing is much slower than the pulse, so the trace is smoothed harder.
const PRE_SMOOTH_WINDOW: usize = 10;
/// Minimum height of a breath peak in the detrended trace.
const PEAK_THRESHOLD: f64 = 0.2;
/// Respiratory rate from the red channel.
pub struct RespiratoryRateEstimator {
    sample_rate_hz: f64,
    spectral: SpectralChain,
}
impl RespiratoryRateEstimator {
    pub fn new(sample_rate_hz: f64, spectral: SpectralChain) -> Self {
        Self {
            sample_rate_hz,
            spectral,
        }
    }
    pub fn estimate(&mut self, red: &[f64]) -> Option<RawEstimate> {
        if red.len() < 4 {
            return None;
        }
        let band = VitalKind::RespiratoryRate.plausible_range();
        if !self.spectral.is_empty() {
            let smoothed = dsp::smooth(red, PRE_SMOOTH_WINDOW);
            let windowed = dsp::apply_hann(&dsp::demean(&smoothed));
            if let Some(peak) = self.spectral.dominant_peak(&windowed, self.sample_rate_hz, band) {
                let value = peak.rate_per_minute();
                if band.contains_rate(value) {
                    return Some(RawEstimate {
                        value,
                        method: EstimationMethod::Spectral,
                    });
                }
            }
        }
        respiratory_rate_time_domain(red, self.sample_rate_hz)
    }
}
/// Breath counting: local maxima above a fixed threshold, mean interval between them.
pub fn respiratory_rate_time_domain(signal: &[f64], sample_rate_hz: f64) -> Option<RawEstimate> {
    let detrended = dsp::demean(&dsp::smooth(signal, PRE_SMOOTH_WINDOW));
    if detrended.len() < 3 {
        return None;
    }
    let peaks: Vec<usize> = (1..detrended.len() - 1)
        .filter(|&i| {
            detrended[i] > detrended[i - 1]
                && detrended[i] > detrended[i + 1]
                && detrended[i] > PEAK_THRESHOLD
        })
        .collect();
    if peaks.len() < 2 {
        debug!("respiration fallback: {} breath peaks", peaks.len());
        return None;
    }
    let min_interval = sample_rate_hz * 1.5;
    let max_interval = sample_rate_hz * 7.5;
    let valid: Vec<f64> = peaks
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64)
        .filter(|&interval| interval >= min_interval && interval <= max_interval)
        .collect();
    if valid.is_empty() {
        return None;
    }
    let value = (60.0 * sample_rate_hz / dsp::mean(&valid)).round() as u32;
    if VitalKind::RespiratoryRate.plausible_range().contains_rate(value) {
        Some(RawEstimate {
            value,
            method: EstimationMethod::TimeDomain,
        })
    } else {
        debug!("respiration fallback: implausible rate {value}");
        None
    }
}
