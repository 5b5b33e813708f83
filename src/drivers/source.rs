use std::collections::VecDeque;
use std::f64::consts::PI;
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::{Frame, Region, VitalsError};
/// Camera abstraction. `open` failures are fatal for the session.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<(), VitalsError>;
    /// Next captured frame, `None` when the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>, VitalsError>;
    fn release(&mut self);
    fn is_open(&self) -> bool;
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<Frame>,
    open: bool,
    unavailable: Option<String>,
}
impl ManualSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            queue: frames.into_iter().collect(),
            open: false,
            unavailable: None,
        }
    }
    /// A source whose `open` always fails, like a denied camera permission.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            queue: VecDeque::new(),
            open: false,
            unavailable: Some(reason.into()),
        }
    }
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}
impl FrameSource for ManualSource {
    fn open(&mut self) -> Result<(), VitalsError> {
        if let Some(reason) = &self.unavailable {
            return Err(VitalsError::CameraUnavailable(reason.clone()));
        }
        self.open = true;
        Ok(())
    }
    fn next_frame(&mut self) -> Result<Option<Frame>, VitalsError> {
        if !self.open {
            return Err(VitalsError::CameraUnavailable("source is not open".into()));
        }
        Ok(self.queue.pop_front())
    }
    fn release(&mut self) {
        self.open = false;
    }
    fn is_open(&self) -> bool {
        self.open
    }
}
/// Parameters of the synthetic subject.
#[derive(Clone, Debug)]
pub struct SyntheticSubject {
    pub heart_rate_bpm: f64,
    pub respiratory_rate_bpm: f64,
    /// Peak green modulation in intensity levels.
    pub pulse_amplitude: f64,
    pub breath_amplitude: f64,
    /// Per-frame uniform noise added to every channel.
    pub noise: f64,
    pub skin: [f64; 3],
    pub background: [u8; 3],
}
impl Default for SyntheticSubject {
    fn default() -> Self {
        Self {
            heart_rate_bpm: 72.0,
            respiratory_rate_bpm: 15.0,
            pulse_amplitude: 1.5,
            breath_amplitude: 2.0,
            noise: 0.2,
            skin: [180.0, 120.0, 100.0],
            background: [110, 110, 110],
        }
    }
}
/// Renders a forehead patch over the default region whose colour pulses with
/// the subject's heart and breathing rates.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    fps: f64,
    subject: SyntheticSubject,
    rng: StdRng,
    frame_index: u64,
    frame_limit: Option<u64>,
    open: bool,
}
impl SyntheticCamera {
    pub fn new(width: u32, height: u32, fps: f64, subject: SyntheticSubject, seed: u64) -> Self {
        Self {
            width,
            height,
            fps,
            subject,
            rng: StdRng::seed_from_u64(seed),
            frame_index: 0,
            frame_limit: None,
            open: false,
        }
    }
    /// End the stream after `frames` frames.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }
    pub fn frames_emitted(&self) -> u64 {
        self.frame_index
    }
    fn patch_colour(&mut self, t: f64) -> [f64; 3] {
        let s = &self.subject;
        let pulse = (2.0 * PI * s.heart_rate_bpm / 60.0 * t).sin() * s.pulse_amplitude;
        let breath = (2.0 * PI * s.respiratory_rate_bpm / 60.0 * t).sin() * s.breath_amplitude;
        let noise = s.noise;
        let mut jitter = || if noise > 0.0 { self.rng.gen_range(-noise..noise) } else { 0.0 };
        [
            s.skin[0] + 0.5 * pulse + breath + jitter(),
            s.skin[1] + pulse + 0.3 * breath + jitter(),
            s.skin[2] + 0.4 * pulse + jitter(),
        ]
    }
    fn render(&mut self) -> Frame {
        let timestamp_ms = (self.frame_index as f64 * 1000.0 / self.fps).round() as u64;
        let colour = self.patch_colour(timestamp_ms as f64 / 1000.0);
        let mut image = RgbImage::from_pixel(self.width, self.height, Rgb(self.subject.background));
        let patch = Region::default_for(self.width, self.height);
        for y in patch.y.max(0)..(patch.y + patch.height).min(self.height as i32) {
            for x in patch.x.max(0)..(patch.x + patch.width).min(self.width as i32) {
                // Dither so the patch mean carries sub-level intensity changes.
                let mut px = [0u8; 3];
                for (c, value) in colour.iter().enumerate() {
                    let dithered = value + self.rng.gen_range(-0.5..0.5);
                    px[c] = dithered.round().clamp(0.0, 255.0) as u8;
                }
                image.put_pixel(x as u32, y as u32, Rgb(px));
            }
        }
        self.frame_index += 1;
        Frame::new(image, timestamp_ms)
    }
}
impl FrameSource for SyntheticCamera {
    fn open(&mut self) -> Result<(), VitalsError> {
        if self.width == 0 || self.height == 0 || self.fps <= 0.0 {
            return Err(VitalsError::CameraUnavailable(format!(
                "unsupported mode {}x{}@{}",
                self.width, self.height, self.fps
            )));
        }
        self.open = true;
        Ok(())
    }
    fn next_frame(&mut self) -> Result<Option<Frame>, VitalsError> {
        if !self.open {
            return Err(VitalsError::CameraUnavailable("camera is not open".into()));
        }
        if self.frame_limit.is_some_and(|limit| self.frame_index >= limit) {
            return Ok(None);
        }
        Ok(Some(self.render()))
    }
    fn release(&mut self) {
        self.open = false;
    }
    fn is_open(&self) -> bool {
        self.open
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::sampler::mean_rgb;
    #[test]
    fn manual_source_plays_back_in_order() {
        let frames = (0..3).map(|i| Frame::new(RgbImage::new(4, 4), i * 33));
        let mut source = ManualSource::new(frames);
        assert!(source.next_frame().is_err());
        source.open().unwrap();
        assert_eq!(source.next_frame().unwrap().unwrap().timestamp_ms, 0);
        assert_eq!(source.next_frame().unwrap().unwrap().timestamp_ms, 33);
        assert_eq!(source.remaining(), 1);
        source.release();
        assert!(!source.is_open());
    }
    #[test]
    fn unavailable_source_fails_fatally() {
        let mut source = ManualSource::unavailable("permission denied");
        let err = source.open().unwrap_err();
        assert!(err.is_fatal());
    }
    #[test]
    fn synthetic_camera_pulses_inside_default_region() {
        let subject = SyntheticSubject {
            noise: 0.0,
            ..SyntheticSubject::default()
        };
        let mut camera = SyntheticCamera::new(160, 120, 30.0, subject, 1).with_frame_limit(30);
        camera.open().unwrap();
        let region = Region::default_for(160, 120);
        let mut greens = Vec::new();
        while let Some(frame) = camera.next_frame().unwrap() {
            assert_eq!(frame.image.get_pixel(0, 0), &Rgb([110, 110, 110]));
            greens.push(mean_rgb(&frame, region).green);
        }
        assert_eq!(greens.len(), 30);
        assert_eq!(camera.frames_emitted(), 30);
        let max = greens.iter().cloned().fold(f64::MIN, f64::max);
        let min = greens.iter().cloned().fold(f64::MAX, f64::min);
        assert!(max - min > 2.0, "spread {}", max - min);
        assert!((max - min) < 4.0);
    }
    #[test]
    fn zero_sized_camera_is_unavailable() {
        let mut camera = SyntheticCamera::new(0, 0, 30.0, SyntheticSubject::default(), 1);
        assert!(matches!(camera.open(), Err(VitalsError::CameraUnavailable(_))));
    }
}
