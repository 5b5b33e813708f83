use std::time::{SystemTime, UNIX_EPOCH};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use crate::config::MonitorConfig;
use crate::drivers::buffer::ChannelBuffers;
use crate::drivers::detector::{DetectorSlot, DetectorStatus};
use crate::drivers::estimate::{Estimate, VitalKind};
use crate::drivers::fft::{FrequencySpectrum, SpectralChain};
use crate::drivers::heart_rate::HeartRateEstimator;
use crate::drivers::plot;
use crate::drivers::quality::{QualityVerdict, SignalQualityAnalyzer};
use crate::drivers::respiration::RespiratoryRateEstimator;
use crate::drivers::roi::{RoiFix, RoiLocator, RoiMode};
use crate::drivers::sampler::ChannelSampler;
use crate::drivers::session::{LiveStats, Report, ReportSink, SessionAggregator};
use crate::drivers::smoother::TemporalSmoother;
use crate::drivers::source::FrameSource;
use crate::drivers::spo2::Spo2Estimator;
use crate::drivers::{Frame, Region, VitalsError};
/// Estimation is skipped entirely below this SNR.
pub const MIN_ESTIMATION_SNR_DB: f64 = -5.0;
/// Smoothed heart rates above this need at least `HIGH_RATE_MIN_SNR_DB`.
pub const HIGH_RATE_BPM: u32 = 140;
pub const HIGH_RATE_MIN_SNR_DB: f64 = 2.0;
/// A raw heart rate this far from the last emitted rate is logged as a jump.
pub const JUMP_LOG_BPM: f64 = 20.0;
/// Payload of the per-update callback, produced on every accepted heart rate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VitalsUpdate {
    pub heart_rate: u32,
    pub respiratory_rate: Option<u32>,
    pub oxygen_level: Option<u32>,
    pub confidence: f64,
    pub timestamp_ms: u64,
}
pub type UpdateCallback = Box<dyn FnMut(&VitalsUpdate) + Send>;
/// Result of one processing step.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// No session is running.
    Idle,
    /// The frame source has no more frames.
    StreamEnded,
    /// Still filling the signal window.
    Calibrating { progress: u8, face_detected: bool },
    /// Signal too weak to attempt estimation.
    PoorSignal { verdict: QualityVerdict },
    /// Estimation ran but nothing was accepted this frame.
    NoEstimate { verdict: QualityVerdict },
    Update { update: VitalsUpdate, verdict: QualityVerdict },
    /// The iteration failed and was skipped.
    Recovered { error: String, consecutive_errors: u32 },
}
/// Returned by `stop_monitoring`. The report is kept even when persistence fails.
#[derive(Debug)]
pub struct StopOutcome {
    pub report: Option<Report>,
    pub persistence_error: Option<VitalsError>,
}
/// Everything owned by one monitoring session. Built at start, dropped at stop.
struct Session {
    buffers: ChannelBuffers,
    heart: HeartRateEstimator,
    respiration: RespiratoryRateEstimator,
    spo2: Spo2Estimator,
    heart_smoother: TemporalSmoother,
    respiration_smoother: TemporalSmoother,
    spo2_smoother: TemporalSmoother,
    aggregator: SessionAggregator,
    last_history_ms: Option<u64>,
    /// Last heart rate handed to the caller.
    last_heart_rate: Option<u32>,
    latest_respiration: Option<u32>,
    latest_spo2: Option<u32>,
    latest_verdict: Option<QualityVerdict>,
    consecutive_errors: u32,
}
impl Session {
    fn new(config: &MonitorConfig) -> Result<Self, VitalsError> {
        let sr = config.sample_rate_hz;
        Ok(Self {
            buffers: ChannelBuffers::with_history_seconds(sr, config.window_seconds)?,
            heart: HeartRateEstimator::new(sr, SpectralChain::from_kinds(&config.spectral_backends)),
            respiration: RespiratoryRateEstimator::new(
                sr,
                SpectralChain::from_kinds(&config.spectral_backends),
            ),
            spo2: Spo2Estimator,
            heart_smoother: TemporalSmoother::new(VitalKind::HeartRate, config.smoothing_alpha),
            respiration_smoother: TemporalSmoother::new(
                VitalKind::RespiratoryRate,
                config.smoothing_alpha,
            ),
            spo2_smoother: TemporalSmoother::new(VitalKind::OxygenSaturation, config.smoothing_alpha),
            aggregator: SessionAggregator::new(),
            last_history_ms: None,
            last_heart_rate: None,
            latest_respiration: None,
            latest_spo2: None,
            latest_verdict: None,
            consecutive_errors: 0,
        })
    }
}
/// Pipeline controller: frame source, ROI locator, sampler, quality gate,
/// estimators, smoothers and the session aggregator, driven one tick at a time.
pub struct VitalSignsPipeline {
    config: MonitorConfig,
    source: Box<dyn FrameSource>,
    locator: RoiLocator,
    analyzer: SignalQualityAnalyzer,
    sink: Option<Box<dyn ReportSink>>,
    on_update: Option<UpdateCallback>,
    session: Option<Session>,
    last_frame: Option<Frame>,
    render_region: Option<Region>,
}
impl VitalSignsPipeline {
    pub fn new(
        config: MonitorConfig,
        source: Box<dyn FrameSource>,
        detector: DetectorSlot,
    ) -> Result<Self, VitalsError> {
        config.validate()?;
        let locator = RoiLocator::new(
            detector,
            config.roi_mode,
            config.roi_smoothing_window,
            config.min_face_score,
        );
        Ok(Self {
            config,
            source,
            locator,
            analyzer: SignalQualityAnalyzer,
            sink: None,
            on_update: None,
            session: None,
            last_frame: None,
            render_region: None,
        })
    }
    pub fn with_report_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }
    pub fn on_update(mut self, callback: impl FnMut(&VitalsUpdate) + Send + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
    pub fn is_monitoring(&self) -> bool {
        self.session.is_some()
    }
    pub fn detector_status(&mut self) -> DetectorStatus {
        self.locator.detector_status()
    }
    pub fn roi_mode(&self) -> RoiMode {
        self.locator.mode()
    }
    /// Caller-facing toggle between face tracking, the fixed region and the search sweep.
    pub fn set_roi_mode(&mut self, mode: RoiMode) {
        self.locator.set_mode(mode);
    }
    pub fn start_monitoring(&mut self) -> Result<(), VitalsError> {
        if self.session.is_some() {
            return Err(VitalsError::AlreadyMonitoring);
        }
        let session = Session::new(&self.config)?;
        if let Err(err) = self.source.open() {
            error!("camera unavailable: {err}");
            return Err(err);
        }
        self.locator.reset();
        self.locator.set_mode(self.config.roi_mode);
        self.last_frame = None;
        self.render_region = None;
        self.session = Some(session);
        info!(
            "monitoring started ({} sample window, detector {:?})",
            self.config.buffer_capacity(),
            self.locator.detector_status()
        );
        Ok(())
    }
    /// Releases the camera first, then finalises the report and hands it to the sink.
    pub fn stop_monitoring(&mut self) -> Result<StopOutcome, VitalsError> {
        let session = self.session.take().ok_or(VitalsError::NotMonitoring)?;
        self.source.release();
        self.last_frame = None;
        let report = session.aggregator.finish(wall_clock_ms());
        let mut persistence_error = None;
        if let (Some(report), Some(sink)) = (&report, self.sink.as_mut()) {
            if let Err(err) = sink.save(report) {
                warn!("report not saved: {err}");
                persistence_error = Some(err);
            }
        }
        info!(
            "monitoring stopped, report {}",
            if report.is_some() { "created" } else { "skipped" }
        );
        Ok(StopOutcome {
            report,
            persistence_error,
        })
    }
    /// One iteration of the frame loop. Only acquisition errors are returned;
    /// they end the session and release the camera.
    pub fn tick(&mut self) -> Result<TickOutcome, VitalsError> {
        if self.session.is_none() {
            return Ok(TickOutcome::Idle);
        }
        let result = match self.source.next_frame() {
            Ok(Some(frame)) => self.process_frame(frame),
            Ok(None) => return Ok(TickOutcome::StreamEnded),
            Err(err) => Err(err),
        };
        match result {
            Ok(outcome) => {
                if let Some(session) = self.session.as_mut() {
                    session.consecutive_errors = 0;
                }
                Ok(outcome)
            }
            Err(err) if err.is_fatal() => {
                error!("acquisition failed, ending session: {err}");
                self.source.release();
                self.session = None;
                Err(err)
            }
            Err(err) => Ok(self.recover(err)),
        }
    }
    fn recover(&mut self, err: VitalsError) -> TickOutcome {
        let consecutive_errors = match self.session.as_mut() {
            Some(session) => {
                session.consecutive_errors += 1;
                session.consecutive_errors
            }
            None => 0,
        };
        warn!("frame skipped ({consecutive_errors} in a row): {err}");
        if consecutive_errors >= self.config.max_consecutive_errors
            && self.locator.mode() != RoiMode::DefaultRegion
        {
            warn!("too many consecutive errors, switching to the default region");
            self.locator.set_mode(RoiMode::DefaultRegion);
        }
        // The preview falls back to the default region for this frame.
        self.render_region = self
            .last_frame
            .as_ref()
            .map(|f| Region::default_for(f.width(), f.height()));
        TickOutcome::Recovered {
            error: err.to_string(),
            consecutive_errors,
        }
    }
    fn process_frame(&mut self, mut frame: Frame) -> Result<TickOutcome, VitalsError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(VitalsError::Frame("zero-sized frame".into()));
        }
        let config = &self.config;
        let Some(session) = self.session.as_mut() else {
            return Ok(TickOutcome::Idle);
        };
        let ts = frame.timestamp_ms;
        session.aggregator.observe_frame(ts);
        if config.auto_exposure {
            if let Some(gain) = frame.auto_expose() {
                debug!("dark frame, exposure gain {gain:.2}");
            }
        }
        let fix: RoiFix = self.locator.locate(&frame);
        let sample = ChannelSampler::sample(&frame, fix.region, &mut session.buffers);
        debug!(
            "t={ts} roi={:?} face={} rgb=({:.1}, {:.1}, {:.1})",
            fix.region, fix.face_detected, sample.red, sample.green, sample.blue
        );
        self.render_region = Some(fix.region);
        self.last_frame = Some(frame);
        let threshold = config.analysis_threshold();
        if session.buffers.len() < threshold {
            let progress = (session.buffers.len() * 100 / threshold).min(100) as u8;
            return Ok(TickOutcome::Calibrating {
                progress,
                face_detected: fix.face_detected,
            });
        }
        let snapshot = session.buffers.snapshot();
        let verdict = self.analyzer.analyze(&snapshot);
        session.latest_verdict = Some(verdict);
        session.aggregator.record_quality(&verdict);
        if !(verdict.snr > MIN_ESTIMATION_SNR_DB) {
            return Ok(TickOutcome::PoorSignal { verdict });
        }
        let Some(raw) = session.heart.estimate(&snapshot.green) else {
            return Ok(TickOutcome::NoEstimate { verdict });
        };
        if let Some(previous) = session.last_heart_rate {
            if (raw.value as f64 - previous as f64).abs() > JUMP_LOG_BPM {
                warn!("heart rate jump: {previous} -> {} ({:?})", raw.value, raw.method);
            }
        }
        // Discarded readings must not move the smoother.
        let before = session.heart_smoother.state();
        let smoothed = session.heart_smoother.smooth(raw.value as f64);
        if smoothed.is_rejected() {
            return Ok(TickOutcome::NoEstimate { verdict });
        }
        let heart_rate = smoothed.value();
        if heart_rate > HIGH_RATE_BPM && verdict.snr < HIGH_RATE_MIN_SNR_DB {
            debug!("discarding {heart_rate} BPM at {:.1} dB", verdict.snr);
            session.heart_smoother.restore(before);
            return Ok(TickOutcome::NoEstimate { verdict });
        }
        if !VitalKind::HeartRate.plausible_range().contains_rate(heart_rate) {
            session.heart_smoother.restore(before);
            return Ok(TickOutcome::NoEstimate { verdict });
        }
        session.last_heart_rate = Some(heart_rate);
        let confidence = verdict.confidence();
        let due = session
            .last_history_ms
            .map_or(true, |last| ts.saturating_sub(last) >= config.history_interval_ms);
        if due {
            session.last_history_ms = Some(ts);
            session.aggregator.record(Estimate {
                kind: VitalKind::HeartRate,
                value: heart_rate,
                confidence,
                timestamp_ms: ts,
            });
            if session.buffers.red_len() >= config.respiratory_min_samples {
                Self::estimate_secondary(session, &snapshot.red, &snapshot.blue, confidence, ts);
            }
        }
        let update = VitalsUpdate {
            heart_rate,
            respiratory_rate: session.latest_respiration,
            oxygen_level: session.latest_spo2,
            confidence,
            timestamp_ms: ts,
        };
        if let Some(callback) = self.on_update.as_mut() {
            callback(&update);
        }
        Ok(TickOutcome::Update { update, verdict })
    }
    /// Respiratory rate and SpO2, computed only on history ticks.
    fn estimate_secondary(session: &mut Session, red: &[f64], blue: &[f64], confidence: f64, ts: u64) {
        let respiration = session.respiration.estimate(red).and_then(|raw| {
            accept_smoothed(&mut session.respiration_smoother, raw.value)
        });
        if let Some(value) = respiration {
            session.latest_respiration = Some(value);
            session.aggregator.record(Estimate {
                kind: VitalKind::RespiratoryRate,
                value,
                confidence,
                timestamp_ms: ts,
            });
        }
        let spo2 = session
            .spo2
            .estimate(red, blue)
            .and_then(|raw| accept_smoothed(&mut session.spo2_smoother, raw.value));
        if let Some(value) = spo2 {
            session.latest_spo2 = Some(value);
            session.aggregator.record(Estimate {
                kind: VitalKind::OxygenSaturation,
                value,
                confidence,
                timestamp_ms: ts,
            });
        }
    }
    pub fn live_stats(&self) -> Option<LiveStats> {
        self.session.as_ref().map(|s| s.aggregator.live_stats())
    }
    pub fn latest_verdict(&self) -> Option<QualityVerdict> {
        self.session.as_ref().and_then(|s| s.latest_verdict)
    }
    /// The newest green samples, oldest first.
    pub fn raw_trace(&self) -> Vec<f64> {
        self.session
            .as_ref()
            .map(|s| s.buffers.recent_green(self.config.trace_length))
            .unwrap_or_default()
    }
    pub fn green_spectrum(&mut self) -> Option<FrequencySpectrum> {
        let session = self.session.as_mut()?;
        let green = session.buffers.snapshot().green;
        session.heart.spectrum(&green)
    }
    pub fn channel_chart_png(&self, style: &plot::PlotStyle) -> Option<Result<Vec<u8>, VitalsError>> {
        let session = self.session.as_ref()?;
        Some(plot::render_channels_png(&session.buffers.snapshot(), style))
    }
    /// ROI-render step: magnified preview of the region sampled last.
    pub fn render_roi_preview(&self) -> Option<Result<Vec<u8>, VitalsError>> {
        let frame = self.last_frame.as_ref()?;
        let region = self.render_region?;
        Some(plot::roi_preview_png(frame, region, self.config.roi_preview_scale))
    }
}
/// Smooths `raw` and keeps the result only if it lands in the plausible range.
fn accept_smoothed(smoother: &mut TemporalSmoother, raw: u32) -> Option<u32> {
    let before = smoother.state();
    let outcome = smoother.smooth(raw as f64);
    let value = outcome.value();
    if outcome.is_rejected() || !smoother.kind().plausible_range().contains_rate(value) {
        smoother.restore(before);
        return None;
    }
    Some(value)
}
fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
