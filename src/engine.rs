// src/engine.rs
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use log::{info, warn};
use crate::drivers::{DetectorStatus, TickOutcome, VitalSignsPipeline};
use crate::types::{MonitorCommand, MonitorEvent};

// 空闲时的轮询间隔
const IDLE_SLEEP: Duration = Duration::from_millis(50);

pub fn spawn_thread(
    mut pipeline: VitalSignsPipeline,
    tx: Sender<MonitorEvent>,
    rx_cmd: Receiver<MonitorCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        info!("vital signs engine ready");
        let frame_period = pipeline.config().frame_period();
        let mut detector = pipeline.detector_status();
        tx.send(MonitorEvent::Status { monitoring: false, detector }).ok();

        'engine: loop {
            let started = Instant::now();

            // ============================================================
            // 1. 命令处理
            // ============================================================
            for _ in 0..10 {
                let cmd = match rx_cmd.try_recv() {
                    Ok(cmd) => cmd,
                    Err(TryRecvError::Empty) => break,
                    // 调用方已经退出
                    Err(TryRecvError::Disconnected) => {
                        stop_session(&mut pipeline, &tx);
                        break 'engine;
                    }
                };
                match cmd {
                    MonitorCommand::Start => match pipeline.start_monitoring() {
                        Ok(()) => {
                            detector = pipeline.detector_status();
                            tx.send(MonitorEvent::Status { monitoring: true, detector }).ok();
                        }
                        Err(err) if err.is_fatal() => {
                            tx.send(MonitorEvent::Fatal(err.to_string())).ok();
                        }
                        Err(err) => {
                            tx.send(MonitorEvent::Notice(err.to_string())).ok();
                        }
                    },
                    MonitorCommand::Stop => stop_session(&mut pipeline, &tx),
                    MonitorCommand::SetRoiMode(mode) => pipeline.set_roi_mode(mode),
                    MonitorCommand::Shutdown => {
                        stop_session(&mut pipeline, &tx);
                        break 'engine;
                    }
                }
            }

            if !pipeline.is_monitoring() {
                thread::sleep(IDLE_SLEEP);
                continue;
            }

            // ============================================================
            // 2. 处理一帧
            // ============================================================
            match pipeline.tick() {
                Ok(TickOutcome::Update { update, .. }) => {
                    let stats = pipeline.live_stats().unwrap_or_default();
                    tx.send(MonitorEvent::Update { update, stats }).ok();
                }
                Ok(TickOutcome::Calibrating { progress, .. }) => {
                    tx.send(MonitorEvent::Calibrating { progress }).ok();
                }
                Ok(TickOutcome::PoorSignal { verdict }) => {
                    tx.send(MonitorEvent::PoorSignal(verdict)).ok();
                }
                Ok(TickOutcome::StreamEnded) => {
                    info!("frame source ended");
                    stop_session(&mut pipeline, &tx);
                    continue;
                }
                Ok(TickOutcome::NoEstimate { .. } | TickOutcome::Recovered { .. } | TickOutcome::Idle) => {}
                Err(err) => {
                    tx.send(MonitorEvent::Fatal(err.to_string())).ok();
                    tx.send(MonitorEvent::Status { monitoring: false, detector }).ok();
                    continue;
                }
            }

            // 检测器加载完成或失败时通知
            let status = pipeline.detector_status();
            if status != detector {
                detector = status;
                if detector == DetectorStatus::Unavailable {
                    tx.send(MonitorEvent::Notice("face detector unavailable, using default region".into())).ok();
                }
                tx.send(MonitorEvent::Status { monitoring: true, detector }).ok();
            }

            // ============================================================
            // 3. ROI 预览 (每帧一次, 独立于测量结果)
            // ============================================================
            match pipeline.render_roi_preview() {
                Some(Ok(png)) => {
                    tx.send(MonitorEvent::RoiPreview(png)).ok();
                }
                Some(Err(err)) => warn!("ROI preview failed: {err}"),
                None => {}
            }

            // 4. 按帧率节流
            if let Some(rest) = frame_period.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
        info!("vital signs engine stopped");
    })
}

fn stop_session(pipeline: &mut VitalSignsPipeline, tx: &Sender<MonitorEvent>) {
    if !pipeline.is_monitoring() {
        return;
    }
    match pipeline.stop_monitoring() {
        Ok(outcome) => {
            if let Some(err) = outcome.persistence_error {
                tx.send(MonitorEvent::Notice(format!("report not saved: {err}"))).ok();
            }
            match outcome.report {
                Some(report) => {
                    tx.send(MonitorEvent::Report(report)).ok();
                }
                None => {
                    tx.send(MonitorEvent::Notice("not enough readings for a report".into())).ok();
                }
            }
        }
        Err(err) => warn!("stop failed: {err}"),
    }
    let detector = pipeline.detector_status();
    tx.send(MonitorEvent::Status { monitoring: false, detector }).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::drivers::{DetectorSlot, ManualSource, SyntheticCamera, SyntheticSubject};
    use crate::recorder::MemorySink;
    use std::sync::mpsc;

    fn fast_config() -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.camera.width = 160;
        config.camera.height = 120;
        // 测试里不需要真实帧率
        config.camera.fps = 1000.0;
        config
    }

    #[test]
    fn session_runs_to_report_when_stream_ends() {
        let camera = SyntheticCamera::new(160, 120, 30.0, SyntheticSubject::default(), 5).with_frame_limit(300);
        let sink = MemorySink::new();
        let pipeline = VitalSignsPipeline::new(fast_config(), Box::new(camera), DetectorSlot::unavailable())
            .unwrap()
            .with_report_sink(Box::new(sink.clone()));
        let (tx, rx) = mpsc::channel();
        let (tx_cmd, rx_cmd) = mpsc::channel();
        let handle = spawn_thread(pipeline, tx, rx_cmd);
        tx_cmd.send(MonitorCommand::Start).unwrap();

        let deadline = Instant::now() + Duration::from_secs(60);
        let (mut calibrating, mut updates, mut previews, mut report) = (false, 0, 0, None);
        while report.is_none() && Instant::now() < deadline {
            match rx.recv_timeout(Duration::from_secs(1)) {
                Ok(MonitorEvent::Calibrating { .. }) => calibrating = true,
                Ok(MonitorEvent::Update { update, .. }) => {
                    assert!((45..=150).contains(&update.heart_rate));
                    updates += 1;
                }
                Ok(MonitorEvent::RoiPreview(png)) => {
                    assert!(!png.is_empty());
                    previews += 1;
                }
                Ok(MonitorEvent::Report(r)) => report = Some(r),
                Ok(_) | Err(_) => {}
            }
        }
        tx_cmd.send(MonitorCommand::Shutdown).unwrap();
        handle.join().unwrap();

        assert!(calibrating);
        assert!(updates > 0);
        // one preview per processed frame
        assert_eq!(previews, 300);
        let report = report.expect("report");
        assert!(report.heart_rate.readings.len() > 2);
        assert_eq!(sink.reports().len(), 1);
    }

    #[test]
    fn camera_failure_is_reported_as_fatal() {
        let pipeline = VitalSignsPipeline::new(
            fast_config(),
            Box::new(ManualSource::unavailable("permission denied")),
            DetectorSlot::unavailable(),
        )
        .unwrap();
        let (tx, rx) = mpsc::channel();
        let (tx_cmd, rx_cmd) = mpsc::channel();
        let handle = spawn_thread(pipeline, tx, rx_cmd);
        tx_cmd.send(MonitorCommand::Start).unwrap();
        let fatal = loop {
            match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                MonitorEvent::Fatal(msg) => break msg,
                _ => continue,
            }
        };
        assert!(fatal.contains("permission denied"));
        drop(tx_cmd);
        handle.join().unwrap();
    }
}
