use std::f64::consts::PI;
use image::RgbImage;
use pulsecam::config::MonitorConfig;
use pulsecam::drivers::{
    BoundingBox, ChannelSnapshot, DetectorSlot, Estimate, FaceDetection, Frame, HeartRateEstimator,
    LandmarkDetector, Point, Region, RoiLocator, RoiMode, SessionAggregator, SignalQualityAnalyzer,
    SpectralBackendKind, SpectralChain, SyntheticCamera, SyntheticSubject, TemporalSmoother,
    TickOutcome, VitalKind, VitalSignsPipeline, VitalsError,
};
use pulsecam::recorder::MemorySink;

struct NoFaces;
impl LandmarkDetector for NoFaces {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceDetection>, VitalsError> {
        Ok(Vec::new())
    }
}

/// A face whose forehead box lands on the synthetic camera's pulsing patch (160x120 frames).
struct FixedFace;
impl LandmarkDetector for FixedFace {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceDetection>, VitalsError> {
        let mut landmarks = vec![Point { x: 72.0, y: 80.0 }; 68];
        for (i, p) in landmarks[0..17].iter_mut().enumerate() {
            *p = Point { x: 40.0 + i as f64 * 4.0, y: 60.0 + i as f64 * 2.5 };
        }
        for (i, p) in landmarks[17..27].iter_mut().enumerate() {
            *p = Point { x: 48.0 + i as f64 * 64.0 / 9.0, y: if i == 0 { 42.0 } else { 46.0 } };
        }
        Ok(vec![FaceDetection {
            bounding_box: BoundingBox { x: 35.0, y: 30.0, width: 75.0, height: 80.0 },
            score: 0.9,
            landmarks,
        }])
    }
}

fn green_wave(freq_hz: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| 128.0 + 10.0 * (2.0 * PI * freq_hz * i as f64 / 30.0).sin()).collect()
}

fn config_160() -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.camera.width = 160;
    config.camera.height = 120;
    config
}

#[test]
fn clean_pulse_reads_72_bpm() {
    let chain = SpectralChain::from_kinds(&[SpectralBackendKind::RustFft, SpectralBackendKind::RustFftPadded]);
    let mut heart = HeartRateEstimator::new(30.0, chain);
    let estimate = heart.estimate(&green_wave(1.2, 300)).unwrap();
    assert!((estimate.value as i64 - 72).abs() <= 3);
}

#[test]
fn flat_signal_is_poor_and_yields_no_rate() {
    let flat = vec![128.0; 300];
    let snapshot = ChannelSnapshot {
        sample_rate_hz: 30.0,
        timestamps_ms: (0..300).map(|i| i * 33).collect(),
        red: flat.clone(),
        green: flat.clone(),
        blue: flat.clone(),
    };
    assert!(!SignalQualityAnalyzer.analyze(&snapshot).is_good);
    let mut heart = HeartRateEstimator::new(30.0, SpectralChain::from_kinds(&[SpectralBackendKind::RustFft]));
    assert!(heart.estimate(&flat).is_none());
    let mut time_domain_only = HeartRateEstimator::new(30.0, SpectralChain::empty());
    assert!(time_domain_only.estimate(&flat).is_none());
}

#[test]
fn smoother_ignores_a_sudden_jump() {
    let mut smoother = TemporalSmoother::new(VitalKind::HeartRate, 0.2);
    assert_eq!(smoother.smooth(70.0).value(), 70);
    assert_eq!(smoother.smooth(71.0).value(), 70);
    let third = smoother.smooth(130.0);
    assert!(third.is_rejected());
    assert_eq!(third.value(), 70);
    assert!((smoother.state().last_smoothed.unwrap() - 70.2).abs() < 1e-9);
}

#[test]
fn two_readings_are_not_enough_for_a_report() {
    let mut session = SessionAggregator::new();
    for (i, value) in [72, 74].into_iter().enumerate() {
        session.record(Estimate { kind: VitalKind::HeartRate, value, confidence: 0.6, timestamp_ms: i as u64 * 1000 });
    }
    assert!(session.finish(5_000).is_none());
    session.record(Estimate { kind: VitalKind::HeartRate, value: 76, confidence: 0.6, timestamp_ms: 2000 });
    let report = session.finish(5_000).unwrap();
    assert_eq!(report.heart_rate.average, Some(74.0));
}

#[test]
fn no_faces_means_default_region() {
    let mut locator = RoiLocator::new(DetectorSlot::ready(Box::new(NoFaces)), RoiMode::Auto, 5, 0.5);
    let expected = Region::default_for(640, 480);
    for i in 0..10 {
        let fix = locator.locate(&Frame::new(RgbImage::new(640, 480), i * 33));
        assert!(!fix.face_detected);
        assert_eq!(fix.region, expected);
    }
}

#[test]
fn tracked_face_drives_a_full_session() {
    let camera = SyntheticCamera::new(160, 120, 30.0, SyntheticSubject::default(), 3).with_frame_limit(420);
    let sink = MemorySink::new();
    let mut pipeline = VitalSignsPipeline::new(config_160(), Box::new(camera), DetectorSlot::ready(Box::new(FixedFace)))
        .unwrap()
        .with_report_sink(Box::new(sink.clone()));
    pipeline.start_monitoring().unwrap();
    let first = pipeline.tick().unwrap();
    assert_eq!(first, TickOutcome::Calibrating { progress: 0, face_detected: true });
    let mut last_rate = None;
    loop {
        match pipeline.tick().unwrap() {
            TickOutcome::StreamEnded => break,
            TickOutcome::Update { update, .. } => last_rate = Some(update.heart_rate),
            _ => {}
        }
    }
    let rate = last_rate.expect("at least one heart rate");
    assert!((rate as i64 - 72).abs() <= 3, "heart rate {rate}");
    let stop = pipeline.stop_monitoring().unwrap();
    assert!(stop.persistence_error.is_none());
    let report = stop.report.unwrap();
    let saved = sink.reports();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0], report);
    let readings = &report.heart_rate.readings;
    let mean = readings.iter().map(|&v| v as f64).sum::<f64>() / readings.len() as f64;
    assert!((report.heart_rate.average.unwrap() - mean).abs() < 1e-9);
    for r in readings {
        assert!(*r >= report.heart_rate.min.unwrap() && *r <= report.heart_rate.max.unwrap());
    }
    assert!(!report.respiratory_rate.readings.is_empty());
    for r in &report.oxygen_level.readings {
        assert!((70..=100).contains(r));
    }
}

#[test]
fn time_domain_only_session_still_measures() {
    let mut config = config_160();
    config.spectral_backends.clear();
    let camera = SyntheticCamera::new(160, 120, 30.0, SyntheticSubject::default(), 9).with_frame_limit(360);
    let mut pipeline = VitalSignsPipeline::new(config, Box::new(camera), DetectorSlot::unavailable()).unwrap();
    pipeline.start_monitoring().unwrap();
    let mut rates = Vec::new();
    loop {
        match pipeline.tick().unwrap() {
            TickOutcome::StreamEnded => break,
            TickOutcome::Update { update, .. } => rates.push(update.heart_rate),
            _ => {}
        }
    }
    assert!(!rates.is_empty());
    assert!(rates.iter().all(|r| (45..=150).contains(r)));
}
