use crate::drivers::buffer::{ChannelBuffers, ChannelSample};
use crate::drivers::{Frame, Region};
/// Mean red, green and blue over every pixel of `region`, clipped to the frame.
pub fn mean_rgb(frame: &Frame, region: Region) -> ChannelSample {
    let x0 = region.x.max(0) as u32;
    let y0 = region.y.max(0) as u32;
    let x1 = (region.x.max(0) as i64 + region.width.max(0) as i64).min(frame.width() as i64) as u32;
    let y1 = (region.y.max(0) as i64 + region.height.max(0) as i64).min(frame.height() as i64) as u32;
    if x1 <= x0 || y1 <= y0 {
        return ChannelSample::zero(frame.timestamp_ms);
    }
    let (mut red, mut green, mut blue) = (0u64, 0u64, 0u64);
    for y in y0..y1 {
        for x in x0..x1 {
            let p = frame.image.get_pixel(x, y);
            red += p[0] as u64;
            green += p[1] as u64;
            blue += p[2] as u64;
        }
    }
    let pixels = ((x1 - x0) as u64 * (y1 - y0) as u64) as f64;
    ChannelSample {
        timestamp_ms: frame.timestamp_ms,
        red: red as f64 / pixels,
        green: green as f64 / pixels,
        blue: blue as f64 / pixels,
    }
}
/// Samples the ROI and appends the result to all four buffers.
pub struct ChannelSampler;
impl ChannelSampler {
    pub fn sample(frame: &Frame, region: Region, buffers: &mut ChannelBuffers) -> ChannelSample {
        let sample = mean_rgb(frame, region);
        buffers.push(sample);
        sample
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    #[test]
    fn averages_only_the_region() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        for y in 5..10 {
            for x in 5..10 {
                image.put_pixel(x, y, Rgb([200, if x % 2 == 0 { 100 } else { 50 }, 30]));
            }
        }
        let frame = Frame::new(image, 42);
        let sample = mean_rgb(&frame, Region::new(5, 5, 5, 5));
        assert_eq!(sample.timestamp_ms, 42);
        assert_eq!(sample.red, 200.0);
        // columns 6 and 8 are 100, columns 5, 7, 9 are 50
        assert!((sample.green - 70.0).abs() < 1e-12);
        assert_eq!(sample.blue, 30.0);
    }
    #[test]
    fn empty_region_gives_zero_sample() {
        let frame = Frame::new(RgbImage::from_pixel(8, 8, Rgb([9, 9, 9])), 7);
        let sample = mean_rgb(&frame, Region::new(2, 2, 0, 4));
        assert_eq!(sample, ChannelSample::zero(7));
    }
    #[test]
    fn sampling_appends_to_buffers() {
        let frame = Frame::new(RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])), 1);
        let mut buffers = ChannelBuffers::with_history_seconds(30.0, 10.0).unwrap();
        let sample = ChannelSampler::sample(&frame, Region::new(0, 0, 8, 8), &mut buffers);
        assert_eq!(buffers.len(), 1);
        assert_eq!(buffers.latest(), Some(&sample));
        assert_eq!(sample.green, 20.0);
    }
}
