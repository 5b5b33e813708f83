//! Signal quality gate for the buffered ROI channels.
//!
//! Two paths:
//! - Multi-channel: per-channel variation (mean absolute first difference),
//!   mean absolute pairwise Pearson correlation, and a detrended SNR on green
//!   with a +3 dB bonus when the channels move together.
//! - Single-channel: variance-over-mean-squared SNR and mean absolute
//!   difference as motion, for callers that only have the green trace.
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use crate::drivers::buffer::ChannelSnapshot;
use crate::drivers::dsp::{self, POWER_FLOOR};
pub const MIN_SNR_DB: f64 = 5.0;
pub const MAX_MOTION_RGB: f64 = 10.0;
pub const MAX_MOTION_SINGLE: f64 = 8.0;
pub const MIN_CHANNEL_CORRELATION: f64 = 0.4;
/// Channels correlated above this earn the SNR bonus.
pub const CORRELATION_BONUS_THRESHOLD: f64 = 0.5;
pub const CORRELATION_BONUS_DB: f64 = 3.0;
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub snr: f64,
    pub motion: f64,
    pub channel_correlation: Option<f64>,
    pub is_good: bool,
}
impl QualityVerdict {
    pub fn multi_channel(snr: f64, motion: f64, channel_correlation: f64) -> Self {
        Self {
            snr,
            motion,
            channel_correlation: Some(channel_correlation),
            is_good: snr > MIN_SNR_DB
                && motion < MAX_MOTION_RGB
                && channel_correlation > MIN_CHANNEL_CORRELATION,
        }
    }
    pub fn single_channel(snr: f64, motion: f64) -> Self {
        Self {
            snr,
            motion,
            channel_correlation: None,
            is_good: snr > MIN_SNR_DB && motion < MAX_MOTION_SINGLE,
        }
    }
    /// Confidence shown to the user, never below 20%.
    pub fn confidence(&self) -> f64 {
        (self.snr / 20.0).clamp(0.2, 1.0)
    }
}
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalQualityAnalyzer;
impl SignalQualityAnalyzer {
    pub fn analyze(&self, snapshot: &ChannelSnapshot) -> QualityVerdict {
        if snapshot.has_rgb() && snapshot.len() >= 2 {
            self.analyze_rgb(&snapshot.to_matrix())
        } else {
            self.analyze_single(&snapshot.green)
        }
    }
    /// `rgb` is `samples x 3` with columns red, green, blue.
    pub fn analyze_rgb(&self, rgb: &Array2<f64>) -> QualityVerdict {
        let channels: Vec<Vec<f64>> = rgb.axis_iter(Axis(1)).map(|c| c.to_vec()).collect();
        let (red, green, blue) = (&channels[0], &channels[1], &channels[2]);
        let avg_correlation = (dsp::pearson(red, green).abs()
            + dsp::pearson(red, blue).abs()
            + dsp::pearson(green, blue).abs())
            / 3.0;
        let mut snr = dsp::detrended_snr_db(green);
        if avg_correlation > CORRELATION_BONUS_THRESHOLD {
            snr += CORRELATION_BONUS_DB;
        }
        let motion = channels
            .iter()
            .map(|c| dsp::mean_abs_diff(c))
            .fold(0.0, f64::max);
        QualityVerdict::multi_channel(snr, motion, avg_correlation)
    }
    pub fn analyze_single(&self, signal: &[f64]) -> QualityVerdict {
        let mean = dsp::mean(signal);
        let signal_power = dsp::variance(signal).max(POWER_FLOOR);
        let noise_power = (mean * mean).max(POWER_FLOOR);
        let snr = 10.0 * (signal_power / noise_power).log10();
        QualityVerdict::single_channel(snr, dsp::mean_abs_diff(signal))
    }
}
