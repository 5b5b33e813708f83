use image::RgbImage;
/// Frames darker than this mean perceived brightness get an exposure boost.
pub const DARK_FRAME_THRESHOLD: f64 = 70.0;
const TARGET_BRIGHTNESS: f64 = 127.0;
const MIN_GAIN: f64 = 0.7;
const MAX_GAIN: f64 = 1.5;
/// One captured video frame. Lives for a single processing cycle.
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: RgbImage,
    /// Capture time in milliseconds on the source's clock.
    pub timestamp_ms: u64,
}
impl Frame {
    pub fn new(image: RgbImage, timestamp_ms: u64) -> Self {
        Self {
            image,
            timestamp_ms,
        }
    }
    pub fn width(&self) -> u32 {
        self.image.width()
    }
    pub fn height(&self) -> u32 {
        self.image.height()
    }
    /// Mean perceived brightness (`0.299R + 0.587G + 0.114B`) over the whole frame.
    pub fn mean_brightness(&self) -> f64 {
        let pixels = self.image.width() as u64 * self.image.height() as u64;
        if pixels == 0 {
            return 0.0;
        }
        let total: f64 = self
            .image
            .pixels()
            .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
            .sum();
        total / pixels as f64
    }
    /// Brighten dark frames towards mid grey. Returns the gain applied, if any.
    pub fn auto_expose(&mut self) -> Option<f64> {
        let brightness = self.mean_brightness();
        if brightness >= DARK_FRAME_THRESHOLD || brightness <= 0.0 {
            return None;
        }
        let gain = (TARGET_BRIGHTNESS / brightness).clamp(MIN_GAIN, MAX_GAIN);
        for pixel in self.image.pixels_mut() {
            for channel in pixel.0.iter_mut() {
                *channel = (*channel as f64 * gain).min(255.0) as u8;
            }
        }
        Some(gain)
    }
}
