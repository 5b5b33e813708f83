//! Face-landmark detector capability and its model loading.
//!
//! The detector itself is an external collaborator. This module only knows how
//! to probe a list of candidate model locations, bound each attempt by a
//! timeout, and report whether a detector is loading, ready or permanently
//! unavailable.
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;
use log::{info, warn};
use crate::drivers::{Frame, VitalsError};
/// Number of points in the landmark layout the ROI locator expects.
pub const LANDMARK_COUNT: usize = 68;
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}
/// One detected face: its box, confidence, and the 68 landmark points.
#[derive(Clone, Debug)]
pub struct FaceDetection {
    pub bounding_box: BoundingBox,
    pub score: f64,
    pub landmarks: Vec<Point>,
}
pub trait LandmarkDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, VitalsError>;
}
/// A place a landmark model can be loaded from (directory, bundle, remote mirror).
pub trait DetectorModelSource: Send {
    fn location(&self) -> String;
    fn load(&self) -> Result<Box<dyn LandmarkDetector>, VitalsError>;
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorStatus {
    Loading,
    Ready,
    Unavailable,
}
/// Try each source in order; every attempt runs on its own thread and is abandoned after `timeout`.
pub fn load_first_available(
    sources: Vec<Box<dyn DetectorModelSource>>,
    timeout: Duration,
) -> Result<Box<dyn LandmarkDetector>, VitalsError> {
    let attempted = sources.len();
    for source in sources {
        let location = source.location();
        info!("loading landmark model from {location}");
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            tx.send(source.load()).ok();
        });
        match rx.recv_timeout(timeout) {
            Ok(Ok(detector)) => {
                info!("landmark model ready ({location})");
                return Ok(detector);
            }
            Ok(Err(err)) => warn!("landmark model load from {location} failed: {err}"),
            Err(RecvTimeoutError::Timeout) => warn!(
                "{}",
                VitalsError::DetectorTimeout {
                    source_name: location,
                    timeout_ms: timeout.as_millis() as u64,
                }
            ),
            Err(RecvTimeoutError::Disconnected) => {
                warn!("landmark model loader for {location} exited without a result")
            }
        }
    }
    Err(VitalsError::DetectorModelUnavailable { attempted })
}
enum SlotState {
    Loading(Receiver<Option<Box<dyn LandmarkDetector>>>),
    Ready(Box<dyn LandmarkDetector>),
    Unavailable,
}
/// Holds the (possibly still loading) detector for the ROI locator.
pub struct DetectorSlot {
    state: SlotState,
}
impl DetectorSlot {
    pub fn ready(detector: Box<dyn LandmarkDetector>) -> Self {
        Self {
            state: SlotState::Ready(detector),
        }
    }
    pub fn unavailable() -> Self {
        Self {
            state: SlotState::Unavailable,
        }
    }
    /// Start loading in the background; the slot reports `Loading` until it resolves.
    pub fn spawn_loader(sources: Vec<Box<dyn DetectorModelSource>>, timeout: Duration) -> Self {
        if sources.is_empty() {
            return Self::unavailable();
        }
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let loaded = match load_first_available(sources, timeout) {
                Ok(detector) => Some(detector),
                Err(err) => {
                    warn!("{err}; falling back to the default region");
                    None
                }
            };
            tx.send(loaded).ok();
        });
        Self {
            state: SlotState::Loading(rx),
        }
    }
    pub fn status(&mut self) -> DetectorStatus {
        if let SlotState::Loading(rx) = &self.state {
            let next = match rx.try_recv() {
                Ok(Some(detector)) => SlotState::Ready(detector),
                Ok(None) | Err(TryRecvError::Disconnected) => SlotState::Unavailable,
                Err(TryRecvError::Empty) => return DetectorStatus::Loading,
            };
            self.state = next;
        }
        match self.state {
            SlotState::Loading(_) => DetectorStatus::Loading,
            SlotState::Ready(_) => DetectorStatus::Ready,
            SlotState::Unavailable => DetectorStatus::Unavailable,
        }
    }
    pub fn detector_mut(&mut self) -> Option<&mut Box<dyn LandmarkDetector>> {
        if self.status() != DetectorStatus::Ready {
            return None;
        }
        match &mut self.state {
            SlotState::Ready(detector) => Some(detector),
            _ => None,
        }
    }
}
