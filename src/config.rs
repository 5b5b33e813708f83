// src/config.rs
use std::fs;
use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::drivers::{RoiMode, SpectralBackendKind, VitalsError};

// 摄像头请求的分辨率与帧率
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { width: 640, height: 480, fps: 30.0 }
    }
}

/// Tunables for one monitoring pipeline. Every field has a default, so a JSON
/// file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub sample_rate_hz: f64,
    pub window_seconds: f64,
    /// Fraction of the signal window that must be filled before analysis starts.
    pub analysis_fill_fraction: f64,
    pub smoothing_alpha: f64,
    pub roi_smoothing_window: usize,
    pub detector_timeout_ms: u64,
    pub min_face_score: f64,
    pub history_interval_ms: u64,
    pub respiratory_min_samples: usize,
    pub max_consecutive_errors: u32,
    pub auto_exposure: bool,
    pub roi_mode: RoiMode,
    /// Tried in order; an empty list means time-domain estimation only.
    pub spectral_backends: Vec<SpectralBackendKind>,
    pub trace_length: usize,
    pub roi_preview_scale: u32,
    pub camera: CameraConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 30.0,
            window_seconds: 10.0,
            analysis_fill_fraction: 0.4,
            smoothing_alpha: 0.2,
            roi_smoothing_window: 5,
            detector_timeout_ms: 8000,
            min_face_score: 0.5,
            history_interval_ms: 1000,
            respiratory_min_samples: 150,
            max_consecutive_errors: 5,
            auto_exposure: true,
            roi_mode: RoiMode::Auto,
            spectral_backends: vec![SpectralBackendKind::RustFft, SpectralBackendKind::RustFftPadded],
            trace_length: 150,
            roi_preview_scale: 3,
            camera: CameraConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, VitalsError> {
        let text = fs::read_to_string(path)?;
        let config: MonitorConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), VitalsError> {
        if !(self.sample_rate_hz > 0.0) {
            return Err(VitalsError::InvalidSampleRate);
        }
        if self.buffer_capacity() == 0 {
            return Err(VitalsError::InvalidConfig("signal window holds no samples".into()));
        }
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(VitalsError::InvalidConfig(format!(
                "smoothing alpha {} outside (0, 1]",
                self.smoothing_alpha
            )));
        }
        if !(self.analysis_fill_fraction > 0.0 && self.analysis_fill_fraction <= 1.0) {
            return Err(VitalsError::InvalidConfig(format!(
                "analysis fill fraction {} outside (0, 1]",
                self.analysis_fill_fraction
            )));
        }
        if self.roi_smoothing_window == 0 {
            return Err(VitalsError::InvalidConfig("ROI smoothing window must be at least 1".into()));
        }
        if self.camera.width == 0 || self.camera.height == 0 || !(self.camera.fps > 0.0) {
            return Err(VitalsError::InvalidConfig("camera mode must be non-zero".into()));
        }
        Ok(())
    }

    pub fn buffer_capacity(&self) -> usize {
        let capacity = self.sample_rate_hz * self.window_seconds;
        if capacity.is_finite() && capacity > 0.0 { capacity.ceil() as usize } else { 0 }
    }

    /// Samples needed before quality analysis and estimation start (120 by default).
    pub fn analysis_threshold(&self) -> usize {
        ((self.buffer_capacity() as f64 * self.analysis_fill_fraction).floor() as usize).max(1)
    }

    pub fn detector_timeout(&self) -> Duration {
        Duration::from_millis(self.detector_timeout_ms)
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.camera.fps.max(1.0))
    }
}
