use std::io::Cursor;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::buffer::ChannelSnapshot;
use crate::drivers::dsp;
use crate::drivers::error::VitalsError;
use crate::drivers::fft::{FrequencySpectrum, PassBand};
use crate::drivers::{Frame, Region};
// No font backend is compiled in, so charts carry lines only.
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 600,
            height: 200,
            margin: 8,
            background: RGBColor(10, 10, 10),
            palette: vec![RED, GREEN, BLUE, CYAN, MAGENTA, YELLOW, WHITE],
        }
    }
}
fn bounds<'a>(series: impl IntoIterator<Item = &'a [f64]>) -> (f64, f64) {
    let (lo, hi) = series
        .into_iter()
        .flat_map(|s| s.iter().copied())
        .filter(|v| v.is_finite())
        .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        (-1.0, 1.0)
    } else if (hi - lo).abs() < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo, hi)
    }
}
/// Draws each series as a line over a shared y-range.
fn render_lines(series: &[&[f64]], style: &PlotStyle) -> Result<Vec<u8>, VitalsError> {
    let len = series.iter().map(|s| s.len()).max().unwrap_or(0);
    if len < 2 {
        return Err(VitalsError::Plot("need at least two samples to draw".into()));
    }
    let (y_min, y_max) = bounds(series.iter().copied());
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(style.margin)
            .build_cartesian_2d(0f64..(len - 1) as f64, y_min..y_max)?;
        for (idx, values) in series.iter().enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let points = values.iter().enumerate().map(|(i, v)| (i as f64, *v));
            chart.draw_series(LineSeries::new(points, &color))?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// Demeaned red, green and blue traces on one chart.
pub fn render_channels_png(snapshot: &ChannelSnapshot, style: &PlotStyle) -> Result<Vec<u8>, VitalsError> {
    if snapshot.is_empty() {
        return Err(VitalsError::Plot("channel snapshot has no samples".into()));
    }
    let red = dsp::demean(&snapshot.red);
    let green = dsp::demean(&snapshot.green);
    let blue = dsp::demean(&snapshot.blue);
    render_lines(&[&red, &green, &blue], style)
}
/// The raw green trace (no demeaning), as shown live during monitoring.
pub fn render_trace_png(trace: &[f64], style: &PlotStyle) -> Result<Vec<u8>, VitalsError> {
    let style = PlotStyle {
        palette: vec![GREEN],
        ..style.clone()
    };
    render_lines(&[trace], &style)
}
/// Magnitude spectrum, restricted to `band` when one is given.
pub fn render_spectrum_png(
    spectrum: &FrequencySpectrum,
    band: Option<PassBand>,
    style: &PlotStyle,
) -> Result<Vec<u8>, VitalsError> {
    let magnitudes: Vec<f64> = spectrum
        .frequencies_hz
        .iter()
        .zip(&spectrum.magnitudes)
        .filter(|(f, _)| band.map_or(true, |b| b.contains_hz(**f)))
        .map(|(_, m)| *m)
        .collect();
    if magnitudes.is_empty() {
        return Err(VitalsError::Plot("spectrum has no magnitudes in range".into()));
    }
    render_lines(&[&magnitudes], style)
}
/// Crop the ROI out of the frame and magnify it, outlined in green.
pub fn roi_preview(frame: &Frame, region: Region, scale: u32) -> Result<RgbImage, VitalsError> {
    if !region.is_valid_within(frame.width(), frame.height()) {
        return Err(VitalsError::Plot(format!("ROI {region:?} is outside the frame")));
    }
    let crop = imageops::crop_imm(
        &frame.image,
        region.x as u32,
        region.y as u32,
        region.width as u32,
        region.height as u32,
    )
    .to_image();
    let scale = scale.max(1);
    let (w, h) = (crop.width() * scale, crop.height() * scale);
    let mut preview = imageops::resize(&crop, w, h, FilterType::Nearest);
    let outline = Rgb([0u8, 255, 0]);
    for x in 0..w {
        preview.put_pixel(x, 0, outline);
        preview.put_pixel(x, h - 1, outline);
    }
    for y in 0..h {
        preview.put_pixel(0, y, outline);
        preview.put_pixel(w - 1, y, outline);
    }
    Ok(preview)
}
pub fn roi_preview_png(frame: &Frame, region: Region, scale: u32) -> Result<Vec<u8>, VitalsError> {
    let preview = roi_preview(frame, region, scale)?;
    let (w, h) = preview.dimensions();
    encode_png(preview.as_raw(), w, h)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, VitalsError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| VitalsError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
#[cfg(test)]
mod tests {
    use super::*;
    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    fn snapshot() -> ChannelSnapshot {
        let n = 60;
        let wave: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).sin()).collect();
        ChannelSnapshot {
            sample_rate_hz: 30.0,
            timestamps_ms: (0..n as u64).map(|i| i * 33).collect(),
            red: wave.iter().map(|v| 180.0 + v).collect(),
            green: wave.iter().map(|v| 120.0 + 2.0 * v).collect(),
            blue: wave.iter().map(|v| 100.0 + 0.5 * v).collect(),
        }
    }
    #[test]
    fn channel_chart_is_png() {
        let png = render_channels_png(&snapshot(), &PlotStyle::default()).unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);
    }
    #[test]
    fn flat_trace_still_renders() {
        let png = render_trace_png(&[128.0; 10], &PlotStyle::default()).unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);
        assert!(render_trace_png(&[1.0], &PlotStyle::default()).is_err());
    }
    #[test]
    fn spectrum_band_filters_bins() {
        let spectrum = FrequencySpectrum {
            sample_rate_hz: 30.0,
            frequencies_hz: vec![0.0, 0.5, 1.0, 1.5, 2.0],
            magnitudes: vec![5.0, 1.0, 3.0, 2.0, 0.5],
        };
        let band = PassBand::per_minute(45.0, 150.0);
        assert!(render_spectrum_png(&spectrum, Some(band), &PlotStyle::default()).is_ok());
        let empty = PassBand::per_minute(500.0, 600.0);
        assert!(render_spectrum_png(&spectrum, Some(empty), &PlotStyle::default()).is_err());
    }
    #[test]
    fn roi_preview_magnifies_and_outlines() {
        let frame = Frame::new(RgbImage::from_pixel(64, 48, Rgb([200, 100, 50])), 0);
        let preview = roi_preview(&frame, Region::new(10, 10, 20, 8), 3).unwrap();
        assert_eq!(preview.dimensions(), (60, 24));
        assert_eq!(preview.get_pixel(0, 0), &Rgb([0, 255, 0]));
        assert_eq!(preview.get_pixel(30, 12), &Rgb([200, 100, 50]));
        assert!(roi_preview(&frame, Region::new(60, 40, 20, 20), 2).is_err());
    }
}
