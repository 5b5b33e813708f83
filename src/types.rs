// src/types.rs
use crate::drivers::{DetectorStatus, LiveStats, QualityVerdict, Report, RoiMode, VitalsUpdate};

// 调用方发给后台引擎的命令
#[derive(Clone, Debug, PartialEq)]
pub enum MonitorCommand {
    Start,
    Stop,
    SetRoiMode(RoiMode),
    Shutdown,
}

// 后台引擎发给调用方的消息
#[derive(Clone, Debug)]
pub enum MonitorEvent {
    // 新的心率结果 (附带最新呼吸/血氧) 与实时统计
    Update { update: VitalsUpdate, stats: LiveStats },
    // 会话状态: 是否正在监测, 人脸检测器状态
    Status { monitoring: bool, detector: DetectorStatus },
    // 缓冲区填充进度 (0..100)
    Calibrating { progress: u8 },
    // 信号太差, 提示用户调整光线
    PoorSignal(QualityVerdict),
    // 会话结束时生成的报告
    Report(Report),
    // ROI 放大预览 (PNG)
    RoiPreview(Vec<u8>),
    // 非致命提示 (报告保存失败等)
    Notice(String),
    // 致命错误: 摄像头不可用
    Fatal(String),
}
