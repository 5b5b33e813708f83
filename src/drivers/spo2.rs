//! Ratio-of-ratios oxygen saturation heuristic.
//!
//! A webcam has no infrared channel, so blue stands in for it. The result is a
//! rough indicator for display, NOT a clinical SpO2 measurement.
use crate::drivers::dsp;
use crate::drivers::estimate::{EstimationMethod, RawEstimate};
const BASELINE_WINDOW: usize = 10;
const MIN_SPO2: f64 = 70.0;
const MAX_SPO2: f64 = 100.0;
/// Pulsatile (AC) and baseline (DC) level of one channel, both averaged over the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcDc {
    pub ac: f64,
    pub dc: f64,
}
pub fn ac_dc(signal: &[f64]) -> AcDc {
    let baseline = dsp::smooth(signal, BASELINE_WINDOW);
    let ac: Vec<f64> = signal
        .iter()
        .zip(&baseline)
        .map(|(v, b)| (v - b).abs())
        .collect();
    AcDc {
        ac: dsp::mean(&ac),
        dc: dsp::mean(&baseline),
    }
}
#[derive(Clone, Copy, Debug, Default)]
pub struct Spo2Estimator;
impl Spo2Estimator {
    /// `110 - 25 R` clamped to 70..=100, with `R = (AC_red/DC_red) / (AC_blue/DC_blue)`.
    pub fn estimate(&self, red: &[f64], blue: &[f64]) -> Option<RawEstimate> {
        if red.is_empty() || blue.is_empty() {
            return None;
        }
        let red = ac_dc(red);
        let blue = ac_dc(blue);
        if red.dc <= 0.0 || blue.dc <= 0.0 || blue.ac <= 0.0 {
            return None;
        }
        let ratio = (red.ac / red.dc) / (blue.ac / blue.dc);
        if !ratio.is_finite() {
            return None;
        }
        let spo2 = (110.0 - 25.0 * ratio).clamp(MIN_SPO2, MAX_SPO2).round();
        Some(RawEstimate {
            value: spo2 as u32,
            method: EstimationMethod::RatioOfRatios,
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    fn channel(level: f64, amplitude: f64) -> Vec<f64> {
        (0..300)
            .map(|i| level + amplitude * (2.0 * PI * 1.2 * i as f64 / 30.0).sin())
            .collect()
    }
    #[test]
    fn equal_relative_pulsatility_gives_85() {
        // R = 1 -> 110 - 25 = 85
        let est = Spo2Estimator.estimate(&channel(150.0, 3.0), &channel(100.0, 2.0)).unwrap();
        assert_eq!(est.value, 85);
        assert_eq!(est.method, EstimationMethod::RatioOfRatios);
    }
    #[test]
    fn output_is_clamped_to_range() {
        let low = Spo2Estimator.estimate(&channel(100.0, 8.0), &channel(100.0, 1.0)).unwrap();
        assert_eq!(low.value, 70);
        let high = Spo2Estimator.estimate(&channel(150.0, 0.0), &channel(100.0, 2.0)).unwrap();
        assert_eq!(high.value, 100);
    }
    #[test]
    fn flat_blue_channel_is_undefined() {
        assert!(Spo2Estimator.estimate(&channel(150.0, 3.0), &[100.0; 300]).is_none());
        assert!(Spo2Estimator.estimate(&[], &[]).is_none());
    }
}
