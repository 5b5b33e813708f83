// src/lib.rs
// 摄像头生命体征 (rPPG): 心率、呼吸频率、非临床血氧估计
pub mod config;
pub mod drivers;
pub mod engine;
pub mod recorder;
pub mod types;

pub use config::{CameraConfig, MonitorConfig};
pub use drivers::{VitalSignsPipeline, VitalsError};
pub use types::{MonitorCommand, MonitorEvent};
