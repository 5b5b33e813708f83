use log::debug;
use crate::drivers::dsp;
use crate::drivers::estimate::{EstimationMethod, RawEstimate, VitalKind};
use crate::drivers::fft::{FrequencySpectrum, SpectralChain};
/// Below this the window is too flat to carry a pulse.
const MIN_STD_DEV: f64 = 0.5;
/// Above this the window is dominated by motion or lighting changes.
const MAX_STD_DEV: f64 = 50.0;
const PRE_SMOOTH_WINDOW: usize = 5;
/// Heart rate from the green channel: spectral peak first, beat-interval fallback second.
pub struct HeartRateEstimator {
    sample_rate_hz: f64,
    spectral: SpectralChain,
}
impl HeartRateEstimator {
    pub fn new(sample_rate_hz: f64, spectral: SpectralChain) -> Self {
        Self {
            sample_rate_hz,
            spectral,
        }
    }
    pub fn estimate(&mut self, green: &[f64]) -> Option<RawEstimate> {
        if green.len() < 4 {
            return None;
        }
        if self.spectral.is_empty() {
            return heart_rate_time_domain(green, self.sample_rate_hz);
        }
        let normalized = dsp::demean(green);
        let std_dev = (normalized.iter().map(|v| v * v).sum::<f64>() / normalized.len() as f64).sqrt();
        if !(MIN_STD_DEV..=MAX_STD_DEV).contains(&std_dev) {
            debug!("heart rate: window std dev {std_dev:.2} outside usable range");
            return None;
        }
        let windowed = dsp::apply_hann(&normalized);
        let band = VitalKind::HeartRate.plausible_range();
        match self.spectral.dominant_peak(&windowed, self.sample_rate_hz, band) {
            Some(peak) if band.contains_rate(peak.rate_per_minute()) => Some(RawEstimate {
                value: peak.rate_per_minute(),
                method: EstimationMethod::Spectral,
            }),
            Some(peak) => {
                debug!(
                    "heart rate: spectral result {} implausible, retrying in time domain",
                    peak.rate_per_minute()
                );
                heart_rate_time_domain(green, self.sample_rate_hz)
            }
            None => heart_rate_time_domain(green, self.sample_rate_hz),
        }
    }
    /// Windowed spectrum of the green trace, for display.
    pub fn spectrum(&mut self, green: &[f64]) -> Option<FrequencySpectrum> {
        if green.len() < 4 {
            return None;
        }
        let windowed = dsp::apply_hann(&dsp::demean(green));
        self.spectral.spectrum(&windowed, self.sample_rate_hz)
    }
}
/// Beat counting on the smoothed trace: each negative-to-non-negative turn of the
/// derivative is a beat, the median beat interval gives the rate.
pub fn heart_rate_time_domain(signal: &[f64], sample_rate_hz: f64) -> Option<RawEstimate> {
    let smoothed = dsp::smooth(signal, PRE_SMOOTH_WINDOW);
    let normalized = dsp::demean(&smoothed);
    let derivative: Vec<f64> = normalized.windows(2).map(|w| w[1] - w[0]).collect();
    let crossings: Vec<usize> = (1..derivative.len())
        .filter(|&i| derivative[i - 1] < 0.0 && derivative[i] >= 0.0)
        .collect();
    if crossings.len() < 3 {
        debug!("heart rate fallback: only {} beats found", crossings.len());
        return None;
    }
    let min_interval = sample_rate_hz * 0.25;
    let max_interval = sample_rate_hz * 2.0;
    let valid: Vec<f64> = crossings
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64)
        .filter(|&interval| interval >= min_interval && interval <= max_interval)
        .collect();
    if valid.len() < 2 {
        debug!("heart rate fallback: not enough valid beat intervals");
        return None;
    }
    let median = dsp::median(&valid)?;
    let rate = (60.0 * sample_rate_hz / median).round() as u32;
    if VitalKind::HeartRate.plausible_range().contains_rate(rate) {
        Some(RawEstimate {
            value: rate,
            method: EstimationMethod::TimeDomain,
        })
    } else {
        debug!("heart rate fallback: implausible rate {rate}");
        None
    }
}
