// src/main.rs
use std::env;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use anyhow::Context;
use pulsecam::drivers::{DetectorSlot, SyntheticCamera, SyntheticSubject, VitalSignsPipeline};
use pulsecam::recorder::JsonLinesSink;
use pulsecam::{engine, MonitorCommand, MonitorConfig, MonitorEvent};

// 演示: 合成摄像头 -> 后台引擎 -> 终端输出
// 用法: pulsecam [config.json] [seconds]
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    let config = match args.first() {
        Some(path) if path != "-" => {
            MonitorConfig::from_json_file(path).with_context(|| format!("loading config {path}"))?
        }
        _ => MonitorConfig::default(),
    };
    let seconds: u64 = match args.get(1) {
        Some(s) => s.parse().with_context(|| format!("invalid duration {s:?}"))?,
        None => 20,
    };

    let camera = SyntheticCamera::new(
        config.camera.width,
        config.camera.height,
        config.camera.fps,
        SyntheticSubject::default(),
        42,
    );
    let sink = JsonLinesSink::open("pulsecam_reports.jsonl")?;
    // 合成摄像头没有人脸检测模型, 直接用默认区域
    let pipeline = VitalSignsPipeline::new(config, Box::new(camera), DetectorSlot::unavailable())
        .context("building pipeline")?
        .with_report_sink(Box::new(sink));

    let (tx, rx) = mpsc::channel();
    let (tx_cmd, rx_cmd) = mpsc::channel();
    let handle = engine::spawn_thread(pipeline, tx, rx_cmd);
    tx_cmd.send(MonitorCommand::Start).context("engine not running")?;

    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut stop_sent = false;
    loop {
        if !stop_sent && Instant::now() >= deadline {
            tx_cmd.send(MonitorCommand::Stop).ok();
            stop_sent = true;
        }
        let event = match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(event) => event,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        match event {
            MonitorEvent::Update { update, stats } => println!(
                "HR {:>3} bpm  RR {:>4}  SpO2 {:>4}  conf {:.2}  (min {:?} max {:?} avg {:?})",
                update.heart_rate,
                update.respiratory_rate.map_or("-".to_string(), |v| v.to_string()),
                update.oxygen_level.map_or("-".to_string(), |v| format!("{v}%")),
                update.confidence,
                stats.heart_rate.min,
                stats.heart_rate.max,
                stats.heart_rate.avg,
            ),
            MonitorEvent::Calibrating { progress } if progress % 10 == 0 => println!("calibrating {progress}%"),
            MonitorEvent::PoorSignal(verdict) => {
                println!("poor signal ({:.1} dB), try adjusting lighting", verdict.snr)
            }
            MonitorEvent::Report(report) => {
                println!("{}", serde_json::to_string_pretty(&report)?);
                break;
            }
            MonitorEvent::Notice(msg) => println!("note: {msg}"),
            MonitorEvent::Fatal(msg) => anyhow::bail!("monitoring failed: {msg}"),
            MonitorEvent::Status { monitoring: false, .. } if stop_sent => break,
            _ => {}
        }
    }
    tx_cmd.send(MonitorCommand::Shutdown).ok();
    handle.join().map_err(|_| anyhow::anyhow!("engine thread panicked"))?;
    Ok(())
}
