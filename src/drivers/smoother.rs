use log::warn;
use serde::{Deserialize, Serialize};
use crate::drivers::estimate::VitalKind;
pub const DEFAULT_ALPHA: f64 = 0.2;
/// Jumps larger than this are treated as sensor glitches and dropped.
pub const REJECT_JUMP: f64 = 50.0;
/// Jumps larger than this (but not rejected) are damped with `DAMPED_ALPHA`.
pub const DAMP_JUMP: f64 = 30.0;
pub const DAMPED_ALPHA: f64 = 0.1;
/// Above this rate the heart-rate alpha is doubled.
pub const FAST_RATE: f64 = 100.0;
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SmootherState {
    pub last_smoothed: Option<f64>,
    pub last_raw: Option<f64>,
}
/// What happened to one raw value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmoothOutcome {
    Seeded(u32),
    Smoothed(u32),
    /// Raw value was dropped; carries the unchanged previous output.
    Rejected(u32),
}
impl SmoothOutcome {
    pub fn value(self) -> u32 {
        match self {
            SmoothOutcome::Seeded(v) | SmoothOutcome::Smoothed(v) | SmoothOutcome::Rejected(v) => v,
        }
    }
    pub fn is_rejected(self) -> bool {
        matches!(self, SmoothOutcome::Rejected(_))
    }
}
/// Exponential smoother for one vital sign. Heart rate gets jump rejection on top.
#[derive(Clone, Debug)]
pub struct TemporalSmoother {
    kind: VitalKind,
    alpha: f64,
    state: SmootherState,
}
impl TemporalSmoother {
    pub fn new(kind: VitalKind, alpha: f64) -> Self {
        Self {
            kind,
            alpha,
            state: SmootherState::default(),
        }
    }
    pub fn kind(&self) -> VitalKind {
        self.kind
    }
    pub fn state(&self) -> SmootherState {
        self.state
    }
    pub fn reset(&mut self) {
        self.state = SmootherState::default();
    }
    /// Puts back a state taken with `state()`, undoing a value the caller discarded.
    pub fn restore(&mut self, state: SmootherState) {
        self.state = state;
    }
    pub fn smooth(&mut self, raw: f64) -> SmoothOutcome {
        let previous = match self.state.last_smoothed {
            None => {
                self.state = SmootherState {
                    last_smoothed: Some(raw),
                    last_raw: Some(raw),
                };
                return SmoothOutcome::Seeded(raw.round() as u32);
            }
            Some(previous) => previous,
        };
        let mut alpha = self.alpha;
        if self.kind == VitalKind::HeartRate {
            // Jump rules take precedence over the fast-rate rule.
            let jump = (raw - previous).abs();
            if jump > REJECT_JUMP {
                warn!("heart rate jump rejected: {raw:.0} vs {previous:.1}");
                return SmoothOutcome::Rejected(previous.round() as u32);
            } else if jump > DAMP_JUMP {
                warn!("heart rate jump damped: {raw:.0} vs {previous:.1}");
                alpha = DAMPED_ALPHA;
            } else if raw > FAST_RATE {
                alpha = (self.alpha * 2.0).min(1.0);
            }
        }
        let smoothed = alpha * raw + (1.0 - alpha) * previous;
        self.state = SmootherState {
            last_smoothed: Some(smoothed),
            last_raw: Some(raw),
        };
        SmoothOutcome::Smoothed(smoothed.round() as u32)
    }
}
