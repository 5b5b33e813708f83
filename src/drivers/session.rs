//! Per-session histories, live statistics and the final report.
use log::info;
use serde::{Deserialize, Serialize};
use crate::drivers::buffer::SignalBuffer;
use crate::drivers::estimate::{Estimate, VitalKind};
use crate::drivers::quality::QualityVerdict;
use crate::drivers::VitalsError;
/// A report needs more than this many heart-rate readings.
pub const MIN_REPORT_READINGS: usize = 2;
/// Live min/max/avg over the history entries inside the vital's history range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalStats {
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub avg: Option<u32>,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveStats {
    pub heart_rate: VitalStats,
    pub respiratory_rate: VitalStats,
    pub oxygen_level: VitalStats,
    pub sample_count: usize,
    pub duration_secs: u64,
}
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSummary {
    pub average: Option<f64>,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub readings: Vec<u32>,
}
impl VitalSummary {
    fn from_readings(readings: Vec<u32>) -> Self {
        let average = if readings.is_empty() {
            None
        } else {
            Some(readings.iter().map(|&v| v as f64).sum::<f64>() / readings.len() as f64)
        };
        Self {
            average,
            min: readings.iter().copied().min(),
            max: readings.iter().copied().max(),
            readings,
        }
    }
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub avg_snr: f64,
    pub avg_motion: f64,
}
/// Immutable summary of one monitoring session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub timestamp_ms: u64,
    pub heart_rate: VitalSummary,
    pub respiratory_rate: VitalSummary,
    pub oxygen_level: VitalSummary,
    pub duration_secs: u64,
    pub signal_quality: QualitySummary,
}
/// Persistence collaborator for finished reports.
pub trait ReportSink: Send {
    fn save(&mut self, report: &Report) -> Result<(), VitalsError>;
}
#[derive(Clone, Debug)]
pub struct SessionAggregator {
    heart_rate: SignalBuffer<Estimate>,
    respiratory_rate: SignalBuffer<Estimate>,
    oxygen_level: SignalBuffer<Estimate>,
    first_frame_ms: Option<u64>,
    last_frame_ms: Option<u64>,
    snr_sum: f64,
    motion_sum: f64,
    verdicts: usize,
}
impl Default for SessionAggregator {
    fn default() -> Self {
        Self::new()
    }
}
impl SessionAggregator {
    pub fn new() -> Self {
        Self {
            heart_rate: SignalBuffer::new(VitalKind::HeartRate.history_capacity()),
            respiratory_rate: SignalBuffer::new(VitalKind::RespiratoryRate.history_capacity()),
            oxygen_level: SignalBuffer::new(VitalKind::OxygenSaturation.history_capacity()),
            first_frame_ms: None,
            last_frame_ms: None,
            snr_sum: 0.0,
            motion_sum: 0.0,
            verdicts: 0,
        }
    }
    pub fn observe_frame(&mut self, timestamp_ms: u64) {
        if self.first_frame_ms.is_none() {
            self.first_frame_ms = Some(timestamp_ms);
        }
        self.last_frame_ms = Some(timestamp_ms);
    }
    pub fn record_quality(&mut self, verdict: &QualityVerdict) {
        if verdict.snr.is_finite() && verdict.motion.is_finite() {
            self.snr_sum += verdict.snr;
            self.motion_sum += verdict.motion;
            self.verdicts += 1;
        }
    }
    pub fn record(&mut self, estimate: Estimate) {
        self.history_mut(estimate.kind).push(estimate);
    }
    pub fn history(&self, kind: VitalKind) -> &SignalBuffer<Estimate> {
        match kind {
            VitalKind::HeartRate => &self.heart_rate,
            VitalKind::RespiratoryRate => &self.respiratory_rate,
            VitalKind::OxygenSaturation => &self.oxygen_level,
        }
    }
    fn history_mut(&mut self, kind: VitalKind) -> &mut SignalBuffer<Estimate> {
        match kind {
            VitalKind::HeartRate => &mut self.heart_rate,
            VitalKind::RespiratoryRate => &mut self.respiratory_rate,
            VitalKind::OxygenSaturation => &mut self.oxygen_level,
        }
    }
    /// History values inside the kind's history range, oldest first.
    pub fn filtered_readings(&self, kind: VitalKind) -> Vec<u32> {
        let range = kind.history_range();
        self.history(kind)
            .iter()
            .map(|e| e.value)
            .filter(|&v| range.contains_rate(v))
            .collect()
    }
    fn stats(&self, kind: VitalKind) -> VitalStats {
        let summary = VitalSummary::from_readings(self.filtered_readings(kind));
        VitalStats {
            min: summary.min,
            max: summary.max,
            avg: summary.average.map(|a| a.round() as u32),
        }
    }
    pub fn duration_secs(&self) -> u64 {
        match (self.first_frame_ms, self.last_frame_ms) {
            (Some(first), Some(last)) => last.saturating_sub(first) / 1000,
            _ => 0,
        }
    }
    pub fn live_stats(&self) -> LiveStats {
        LiveStats {
            heart_rate: self.stats(VitalKind::HeartRate),
            respiratory_rate: self.stats(VitalKind::RespiratoryRate),
            oxygen_level: self.stats(VitalKind::OxygenSaturation),
            sample_count: self.heart_rate.len(),
            duration_secs: self.duration_secs(),
        }
    }
    /// Builds the report, or `None` when there are too few heart-rate readings.
    pub fn finish(&self, timestamp_ms: u64) -> Option<Report> {
        if self.heart_rate.len() <= MIN_REPORT_READINGS {
            info!(
                "session ended with {} heart rate readings, no report",
                self.heart_rate.len()
            );
            return None;
        }
        let signal_quality = if self.verdicts == 0 {
            QualitySummary::default()
        } else {
            QualitySummary {
                avg_snr: self.snr_sum / self.verdicts as f64,
                avg_motion: self.motion_sum / self.verdicts as f64,
            }
        };
        Some(Report {
            timestamp_ms,
            heart_rate: VitalSummary::from_readings(self.filtered_readings(VitalKind::HeartRate)),
            respiratory_rate: VitalSummary::from_readings(
                self.filtered_readings(VitalKind::RespiratoryRate),
            ),
            oxygen_level: VitalSummary::from_readings(
                self.filtered_readings(VitalKind::OxygenSaturation),
            ),
            duration_secs: self.duration_secs(),
            signal_quality,
        })
    }
}
