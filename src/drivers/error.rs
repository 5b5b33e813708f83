use thiserror::Error;
#[derive(Debug, Error)]
pub enum VitalsError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("unusable frame: {0}")]
    Frame(String),
    #[error("face detector failed: {0}")]
    Detector(String),
    #[error("no detector model could be loaded from {attempted} source(s)")]
    DetectorModelUnavailable { attempted: usize },
    #[error("detector model load from {source_name} timed out after {timeout_ms} ms")]
    DetectorTimeout { source_name: String, timeout_ms: u64 },
    #[error("spectral backend {backend} failed: {reason}")]
    Spectral { backend: &'static str, reason: String },
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("monitoring session is already running")]
    AlreadyMonitoring,
    #[error("no monitoring session is running")]
    NotMonitoring,
    #[error("failed to persist report: {0}")]
    Persistence(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
impl VitalsError {
    /// Acquisition failures end the session; everything else is recovered locally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VitalsError::CameraUnavailable(_))
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for VitalsError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        VitalsError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for VitalsError {
    fn from(value: image::ImageError) -> Self {
        VitalsError::Plot(value.to_string())
    }
}
