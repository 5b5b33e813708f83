use std::collections::VecDeque;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use crate::drivers::detector::{DetectorSlot, DetectorStatus, FaceDetection, LANDMARK_COUNT};
use crate::drivers::Frame;
const JAW_POINTS: std::ops::Range<usize> = 0..17;
const EYEBROW_POINTS: std::ops::Range<usize> = 17..27;
/// Search pattern dwell time per grid cell.
const SEARCH_CELL_MS: u64 = 5000;
/// Rectangle in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}
impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
    /// Centered horizontally, 30% of the width, 10% of the height, 25% down from the top.
    pub fn default_for(frame_width: u32, frame_height: u32) -> Self {
        let w = frame_width as f64;
        let h = frame_height as f64;
        let region_width = w * 0.3;
        let region_height = h * 0.1;
        Self::new(
            ((w - region_width) / 2.0).floor() as i32,
            (h * 0.25).floor() as i32,
            region_width.floor() as i32,
            region_height.floor() as i32,
        )
    }
    /// One cell of a 3x3 sweep over the frame, advancing every five seconds.
    pub fn search_cell(frame_width: u32, frame_height: u32, timestamp_ms: u64) -> Self {
        let cycle = (timestamp_ms / SEARCH_CELL_MS) % 9;
        let col = (cycle % 3) as f64;
        let row = (cycle / 3) as f64;
        let third_w = frame_width as f64 / 3.0;
        let third_h = frame_height as f64 / 3.0;
        let roi_w = third_w * 0.7;
        let roi_h = third_h * 0.7;
        let center_x = third_w * (col + 0.5);
        let center_y = third_h * (row + 0.5);
        Self::new(
            (center_x - roi_w / 2.0).floor() as i32,
            (center_y - roi_h / 2.0).floor() as i32,
            roi_w.floor() as i32,
            roi_h.floor() as i32,
        )
    }
    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }
    /// Larger than 5x5 and fully inside the frame.
    pub fn is_valid_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.width > 5
            && self.height > 5
            && self.x >= 0
            && self.y >= 0
            && self.x as i64 + self.width as i64 <= frame_width as i64
            && self.y as i64 + self.height as i64 <= frame_height as i64
    }
}
/// Forehead box above the eyebrow cluster, sized from eyebrow spread and face height.
pub fn forehead_region(
    detection: &FaceDetection,
    frame_width: u32,
    frame_height: u32,
) -> Option<Region> {
    if detection.landmarks.len() < LANDMARK_COUNT {
        return None;
    }
    let brows = &detection.landmarks[EYEBROW_POINTS];
    let jaw = &detection.landmarks[JAW_POINTS];
    let brow_top = brows.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let brow_bottom = brows.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    let brow_left = brows.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let brow_right = brows.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let jaw_bottom = jaw.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    let face_height = jaw_bottom - brow_top;
    let forehead_height = (face_height * 0.25).min((brow_bottom - brow_top) * 1.5);
    let center_x = (brow_left + brow_right) / 2.0;
    let roi_width = (brow_right - brow_left) * 0.7;
    let x = (center_x - roi_width / 2.0).max(0.0);
    let y = (brow_top - forehead_height).max(0.0);
    let width = roi_width.min(frame_width as f64 - x);
    let height = forehead_height.min(frame_height as f64 - y);
    Some(Region::new(
        x.round() as i32,
        y.round() as i32,
        width.round() as i32,
        height.round() as i32,
    ))
}
/// Linearly weighted average over the last few regions, newest weighted most.
#[derive(Clone, Debug)]
pub struct RoiSmoother {
    history: VecDeque<Region>,
    window: usize,
}
impl RoiSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(window),
            window: window.max(1),
        }
    }
    pub fn smooth(&mut self, region: Region) -> Region {
        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(region);
        if self.history.len() <= 2 {
            return region;
        }
        let total_weight: f64 = (1..=self.history.len()).map(|w| w as f64).sum();
        let (mut x, mut y, mut w, mut h) = (0.0, 0.0, 0.0, 0.0);
        for (i, r) in self.history.iter().enumerate() {
            let weight = (i + 1) as f64 / total_weight;
            x += r.x as f64 * weight;
            y += r.y as f64 * weight;
            w += r.width as f64 * weight;
            h += r.height as f64 * weight;
        }
        Region::new(
            x.round() as i32,
            y.round() as i32,
            w.round() as i32,
            h.round() as i32,
        )
    }
    pub fn len(&self) -> usize {
        self.history.len()
    }
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiMode {
    /// Forehead from the landmark detector, default region when that is not possible.
    #[default]
    Auto,
    /// Always the fixed default region.
    DefaultRegion,
    /// Sweep a 3x3 grid ("simple mode").
    SearchPattern,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiFix {
    pub region: Region,
    pub face_detected: bool,
}
pub struct RoiLocator {
    detector: DetectorSlot,
    mode: RoiMode,
    smoother: RoiSmoother,
    min_face_score: f64,
    last_region: Option<Region>,
}
impl RoiLocator {
    pub fn new(detector: DetectorSlot, mode: RoiMode, smoothing_window: usize, min_face_score: f64) -> Self {
        Self {
            detector,
            mode,
            smoother: RoiSmoother::new(smoothing_window),
            min_face_score,
            last_region: None,
        }
    }
    pub fn mode(&self) -> RoiMode {
        self.mode
    }
    pub fn set_mode(&mut self, mode: RoiMode) {
        if self.mode != mode {
            debug!("ROI mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }
    pub fn last_region(&self) -> Option<Region> {
        self.last_region
    }
    pub fn detector_status(&mut self) -> DetectorStatus {
        self.detector.status()
    }
    /// Forget per-session state (smoothing history, last region); the detector is kept.
    pub fn reset(&mut self) {
        self.smoother = RoiSmoother::new(self.smoother.window);
        self.last_region = None;
    }
    pub fn locate(&mut self, frame: &Frame) -> RoiFix {
        let (w, h) = (frame.width(), frame.height());
        let fix = match self.mode {
            RoiMode::DefaultRegion => self.default_fix(w, h),
            RoiMode::SearchPattern => RoiFix {
                region: Region::search_cell(w, h, frame.timestamp_ms),
                face_detected: false,
            },
            RoiMode::Auto => match self.face_region(frame) {
                Some(region) => RoiFix {
                    region: self.smoother.smooth(region),
                    face_detected: true,
                },
                None => self.default_fix(w, h),
            },
        };
        let fix = if fix.region.is_valid_within(w, h) {
            fix
        } else {
            warn!("invalid ROI {:?}, using default region", fix.region);
            self.default_fix(w, h)
        };
        self.last_region = Some(fix.region);
        fix
    }
    fn default_fix(&self, w: u32, h: u32) -> RoiFix {
        RoiFix {
            region: Region::default_for(w, h),
            face_detected: false,
        }
    }
    fn face_region(&mut self, frame: &Frame) -> Option<Region> {
        let min_score = self.min_face_score;
        let detector = self.detector.detector_mut()?;
        let detections = match detector.detect(frame) {
            Ok(detections) => detections,
            Err(err) => {
                warn!("face detection failed: {err}");
                return None;
            }
        };
        let face = detections.iter().find(|d| d.score >= min_score)?;
        forehead_region(face, frame.width(), frame.height())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::detector::{BoundingBox, LandmarkDetector, Point};
    use crate::drivers::VitalsError;
    use image::RgbImage;
    fn synthetic_face() -> FaceDetection {
        let mut landmarks = vec![Point { x: 320.0, y: 300.0 }; LANDMARK_COUNT];
        for (i, p) in landmarks[JAW_POINTS].iter_mut().enumerate() {
            *p = Point {
                x: 240.0 + i as f64 * 10.0,
                y: 260.0 + (i as f64 - 8.0).abs().mul_add(-5.0, 80.0),
            };
        }
        for (i, p) in landmarks[EYEBROW_POINTS].iter_mut().enumerate() {
            *p = Point {
                x: 260.0 + i as f64 * 12.0,
                y: if i % 5 == 2 { 190.0 } else { 200.0 },
            };
        }
        FaceDetection {
            bounding_box: BoundingBox {
                x: 230.0,
                y: 140.0,
                width: 180.0,
                height: 220.0,
            },
            score: 0.9,
            landmarks,
        }
    }
    struct Fixed(Vec<FaceDetection>);
    impl LandmarkDetector for Fixed {
        fn detect(&mut self, _: &Frame) -> Result<Vec<FaceDetection>, VitalsError> {
            Ok(self.0.clone())
        }
    }
    struct Broken;
    impl LandmarkDetector for Broken {
        fn detect(&mut self, _: &Frame) -> Result<Vec<FaceDetection>, VitalsError> {
            Err(VitalsError::Detector("model crashed".into()))
        }
    }
    fn frame(ts: u64) -> Frame {
        Frame::new(RgbImage::new(640, 480), ts)
    }
    #[test]
    fn default_region_for_vga() {
        assert_eq!(Region::default_for(640, 480), Region::new(224, 120, 192, 48));
    }
    #[test]
    fn search_pattern_cycles_every_five_seconds() {
        let first = Region::search_cell(600, 300, 0);
        assert_eq!(first, Region::new(30, 15, 140, 70));
        assert_eq!(Region::search_cell(600, 300, 4999), first);
        let second = Region::search_cell(600, 300, 5000);
        assert_eq!(second.x, 230);
        assert_eq!(Region::search_cell(600, 300, 45_000), first);
    }
    #[test]
    fn forehead_sits_above_eyebrows() {
        let region = forehead_region(&synthetic_face(), 640, 480).unwrap();
        // eyebrows span x 260..368, top 190, bottom 200; jaw bottom 340
        // forehead height = min(150 * 0.25, 10 * 1.5) = 15
        assert_eq!(region.height, 15);
        assert_eq!(region.y, 175);
        assert_eq!(region.width, 76);
        assert_eq!(region.x, 276);
    }
    #[test]
    fn identical_regions_smooth_to_themselves() {
        let mut smoother = RoiSmoother::new(5);
        let region = Region::new(101, 57, 83, 29);
        for _ in 0..5 {
            assert_eq!(smoother.smooth(region), region);
        }
        assert_eq!(smoother.len(), 5);
    }
    #[test]
    fn smoothing_weights_recent_regions_most() {
        let mut smoother = RoiSmoother::new(5);
        smoother.smooth(Region::new(0, 0, 10, 10));
        assert_eq!(smoother.smooth(Region::new(60, 0, 10, 10)).x, 60);
        // weights 1,2,3 over x = 0, 60, 120 -> (0 + 120 + 360) / 6 = 80
        assert_eq!(smoother.smooth(Region::new(120, 0, 10, 10)).x, 80);
    }
    #[test]
    fn no_detections_yield_default_region() {
        let mut locator = RoiLocator::new(DetectorSlot::ready(Box::new(Fixed(vec![]))), RoiMode::Auto, 5, 0.5);
        for i in 0..10 {
            let fix = locator.locate(&frame(i * 33));
            assert!(!fix.face_detected);
            assert_eq!(fix.region, Region::default_for(640, 480));
        }
    }
    #[test]
    fn detector_errors_and_low_scores_fall_back() {
        let mut locator = RoiLocator::new(DetectorSlot::ready(Box::new(Broken)), RoiMode::Auto, 5, 0.5);
        assert!(!locator.locate(&frame(0)).face_detected);
        let mut weak = synthetic_face();
        weak.score = 0.2;
        let mut locator = RoiLocator::new(DetectorSlot::ready(Box::new(Fixed(vec![weak]))), RoiMode::Auto, 5, 0.5);
        assert!(!locator.locate(&frame(0)).face_detected);
    }
    #[test]
    fn detected_face_is_tracked() {
        let mut locator = RoiLocator::new(
            DetectorSlot::ready(Box::new(Fixed(vec![synthetic_face()]))),
            RoiMode::Auto,
            5,
            0.5,
        );
        let fix = locator.locate(&frame(0));
        assert!(fix.face_detected);
        assert_eq!(Some(fix.region), locator.last_region());
    }
    #[test]
    fn region_validity() {
        assert!(Region::new(0, 0, 6, 6).is_valid_within(6, 6));
        assert!(!Region::new(0, 0, 5, 6).is_valid_within(640, 480));
        assert!(!Region::new(-1, 0, 10, 10).is_valid_within(640, 480));
        assert!(!Region::new(635, 0, 10, 10).is_valid_within(640, 480));
    }
}
