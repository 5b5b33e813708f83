// src/drivers/mod.rs
// 声明同级目录下的子模块文件
pub mod buffer;
pub mod detector;
pub mod dsp;
pub mod error;
pub mod estimate;
pub mod fft;
pub mod frame;
pub mod heart_rate;
pub mod pipeline;
pub mod plot;
pub mod quality;
pub mod respiration;
pub mod roi;
pub mod sampler;
pub mod session;
pub mod smoother;
pub mod source;
pub mod spo2;
// 公开导出这些模块里的结构体，方便外部调用
pub use buffer::{ChannelBuffers, ChannelSample, ChannelSnapshot, SignalBuffer};
pub use detector::{
    BoundingBox, DetectorModelSource, DetectorSlot, DetectorStatus, FaceDetection,
    LandmarkDetector, Point,
};
pub use error::VitalsError;
pub use estimate::{Estimate, EstimationMethod, RawEstimate, VitalKind};
pub use fft::{FrequencySpectrum, PassBand, SpectralBackend, SpectralBackendKind, SpectralChain};
pub use frame::Frame;
pub use heart_rate::HeartRateEstimator;
pub use pipeline::{StopOutcome, TickOutcome, VitalSignsPipeline, VitalsUpdate};
pub use plot::{render_channels_png, render_spectrum_png, render_trace_png, roi_preview_png, PlotStyle};
pub use quality::{QualityVerdict, SignalQualityAnalyzer};
pub use respiration::RespiratoryRateEstimator;
pub use roi::{Region, RoiFix, RoiLocator, RoiMode};
pub use sampler::ChannelSampler;
pub use session::{LiveStats, Report, ReportSink, SessionAggregator, VitalStats, VitalSummary};
pub use smoother::{SmoothOutcome, TemporalSmoother};
pub use source::{FrameSource, ManualSource, SyntheticCamera, SyntheticSubject};
pub use spo2::Spo2Estimator;
