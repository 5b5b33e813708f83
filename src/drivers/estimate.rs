use serde::{Deserialize, Serialize};
use crate::drivers::fft::PassBand;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalKind {
    HeartRate,
    RespiratoryRate,
    OxygenSaturation,
}
impl VitalKind {
    /// Range an estimator must hit before its result is accepted.
    pub fn plausible_range(self) -> PassBand {
        match self {
            VitalKind::HeartRate => PassBand::per_minute(45.0, 150.0),
            VitalKind::RespiratoryRate => PassBand::per_minute(8.0, 40.0),
            VitalKind::OxygenSaturation => PassBand::per_minute(70.0, 100.0),
        }
    }
    /// Wider range used when filtering histories for statistics and reports.
    pub fn history_range(self) -> PassBand {
        match self {
            VitalKind::HeartRate => PassBand::per_minute(45.0, 200.0),
            VitalKind::RespiratoryRate => PassBand::per_minute(8.0, 40.0),
            VitalKind::OxygenSaturation => PassBand::per_minute(70.0, 100.0),
        }
    }
    pub fn history_capacity(self) -> usize {
        match self {
            VitalKind::HeartRate => 60,
            VitalKind::RespiratoryRate | VitalKind::OxygenSaturation => 30,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    Spectral,
    TimeDomain,
    RatioOfRatios,
}
/// Raw estimator output before temporal smoothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawEstimate {
    pub value: u32,
    pub method: EstimationMethod,
}
/// An accepted, smoothed reading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub kind: VitalKind,
    pub value: u32,
    pub confidence: f64,
    pub timestamp_ms: u64,
}
