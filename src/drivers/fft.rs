use std::sync::Arc;
use log::{debug, warn};
use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use crate::drivers::VitalsError;
/// Inclusive rate band expressed in events per minute (BPM or breaths/min).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassBand {
    pub min_per_minute: f64,
    pub max_per_minute: f64,
}
impl PassBand {
    pub const fn per_minute(min_per_minute: f64, max_per_minute: f64) -> Self {
        Self {
            min_per_minute,
            max_per_minute,
        }
    }
    pub fn contains_hz(&self, frequency_hz: f64) -> bool {
        let per_minute = frequency_hz * 60.0;
        per_minute >= self.min_per_minute && per_minute <= self.max_per_minute
    }
    pub fn contains_rate(&self, rate: u32) -> bool {
        let rate = rate as f64;
        rate >= self.min_per_minute && rate <= self.max_per_minute
    }
}
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralPeak {
    pub frequency_hz: f64,
    pub magnitude: f64,
}
impl SpectralPeak {
    pub fn rate_per_minute(&self) -> u32 {
        (self.frequency_hz * 60.0).round() as u32
    }
}
/// One-sided magnitude spectrum of a real-valued window.
#[derive(Clone, Debug)]
pub struct FrequencySpectrum {
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<f64>,
}
impl FrequencySpectrum {
    /// Strongest local maximum (greater than both neighbours) whose frequency lies in `band`.
    pub fn dominant_peak(&self, band: PassBand) -> Option<SpectralPeak> {
        let mags = &self.magnitudes;
        if mags.len() < 3 {
            return None;
        }
        (1..mags.len() - 1)
            .filter(|&i| band.contains_hz(self.frequencies_hz[i]))
            .filter(|&i| mags[i] > mags[i - 1] && mags[i] > mags[i + 1])
            .map(|i| SpectralPeak {
                frequency_hz: self.frequencies_hz[i],
                magnitude: mags[i],
            })
            .max_by(|a, b| a.magnitude.total_cmp(&b.magnitude))
    }
}
/// A spectral-transform capability: real window in, magnitude bins out.
pub trait SpectralBackend: Send {
    fn name(&self) -> &'static str;
    fn magnitude_spectrum(
        &mut self,
        signal: &[f64],
        sample_rate_hz: f64,
    ) -> Result<FrequencySpectrum, VitalsError>;
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectralBackendKind {
    /// FFT over the window at its native length.
    RustFft,
    /// FFT over the window zero-padded to the next power of two.
    RustFftPadded,
}
impl SpectralBackendKind {
    pub fn build(self) -> Box<dyn SpectralBackend> {
        match self {
            SpectralBackendKind::RustFft => Box::new(RustFftBackend::native()),
            SpectralBackendKind::RustFftPadded => Box::new(RustFftBackend::padded()),
        }
    }
}
pub struct RustFftBackend {
    // Plan for the last window size; windows only change length while the buffer fills.
    plan: Option<(usize, Arc<dyn Fft<f64>>)>,
    pad_to_power_of_two: bool,
}
impl RustFftBackend {
    pub fn native() -> Self {
        Self {
            plan: None,
            pad_to_power_of_two: false,
        }
    }
    pub fn padded() -> Self {
        Self {
            plan: None,
            pad_to_power_of_two: true,
        }
    }
    fn plan_for(&mut self, fft_size: usize) -> Arc<dyn Fft<f64>> {
        match &self.plan {
            Some((size, fft)) if *size == fft_size => Arc::clone(fft),
            _ => {
                let fft = FftPlanner::new().plan_fft_forward(fft_size);
                self.plan = Some((fft_size, Arc::clone(&fft)));
                fft
            }
        }
    }
}
impl SpectralBackend for RustFftBackend {
    fn name(&self) -> &'static str {
        if self.pad_to_power_of_two {
            "rustfft-padded"
        } else {
            "rustfft"
        }
    }
    fn magnitude_spectrum(
        &mut self,
        signal: &[f64],
        sample_rate_hz: f64,
    ) -> Result<FrequencySpectrum, VitalsError> {
        if sample_rate_hz <= 0.0 {
            return Err(VitalsError::InvalidSampleRate);
        }
        if signal.is_empty() {
            return Err(VitalsError::Spectral {
                backend: self.name(),
                reason: "empty input window".into(),
            });
        }
        if signal.iter().any(|v| !v.is_finite()) {
            return Err(VitalsError::Spectral {
                backend: self.name(),
                reason: "non-finite sample in window".into(),
            });
        }
        let fft_size = if self.pad_to_power_of_two {
            signal.len().next_power_of_two()
        } else {
            signal.len()
        };
        let fft = self.plan_for(fft_size);
        let mut buffer: Vec<Complex64> = signal.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        buffer.resize(fft_size, Complex64::new(0.0, 0.0));
        fft.process(&mut buffer);
        let bins = fft_size / 2 + 1;
        let frequencies_hz = (0..bins)
            .map(|k| k as f64 * sample_rate_hz / fft_size as f64)
            .collect();
        let magnitudes = buffer.iter().take(bins).map(|c| c.norm()).collect();
        Ok(FrequencySpectrum {
            sample_rate_hz,
            frequencies_hz,
            magnitudes,
        })
    }
}
/// Ordered list of spectral backends; each is tried in turn until one yields a peak.
#[derive(Default)]
pub struct SpectralChain {
    backends: Vec<Box<dyn SpectralBackend>>,
}
impl SpectralChain {
    pub fn empty() -> Self {
        Self::default()
    }
    pub fn from_kinds(kinds: &[SpectralBackendKind]) -> Self {
        Self {
            backends: kinds.iter().map(|k| k.build()).collect(),
        }
    }
    pub fn with_backend(mut self, backend: Box<dyn SpectralBackend>) -> Self {
        self.backends.push(backend);
        self
    }
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
    pub fn len(&self) -> usize {
        self.backends.len()
    }
    pub fn dominant_peak(
        &mut self,
        window: &[f64],
        sample_rate_hz: f64,
        band: PassBand,
    ) -> Option<SpectralPeak> {
        for backend in &mut self.backends {
            match backend.magnitude_spectrum(window, sample_rate_hz) {
                Ok(spectrum) => {
                    if let Some(peak) = spectrum.dominant_peak(band) {
                        debug!(
                            "{}: peak at {:.3} Hz ({} /min)",
                            backend.name(),
                            peak.frequency_hz,
                            peak.rate_per_minute()
                        );
                        return Some(peak);
                    }
                    debug!("{}: no spectral peak inside passband", backend.name());
                }
                Err(err) => warn!("spectral backend {} failed: {err}", backend.name()),
            }
        }
        None
    }
    /// First spectrum any backend manages to produce, for display.
    pub fn spectrum(&mut self, window: &[f64], sample_rate_hz: f64) -> Option<FrequencySpectrum> {
        self.backends
            .iter_mut()
            .find_map(|backend| backend.magnitude_spectrum(window, sample_rate_hz).ok())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    fn sine(freq_hz: f64, sample_rate_hz: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / sample_rate_hz).sin())
            .collect()
    }
    #[test]
    fn native_backend_bins_match_window_length() {
        let mut backend = RustFftBackend::native();
        let spectrum = backend.magnitude_spectrum(&sine(1.2, 30.0, 300), 30.0).unwrap();
        assert_eq!(spectrum.magnitudes.len(), 151);
        assert!((spectrum.frequencies_hz[12] - 1.2).abs() < 1e-9);
        let peak = spectrum
            .dominant_peak(PassBand::per_minute(45.0, 150.0))
            .unwrap();
        assert_eq!(peak.rate_per_minute(), 72);
    }
    #[test]
    fn padded_backend_uses_power_of_two() {
        let mut backend = RustFftBackend::padded();
        let spectrum = backend.magnitude_spectrum(&sine(1.2, 30.0, 300), 30.0).unwrap();
        assert_eq!(spectrum.magnitudes.len(), 257);
        let peak = spectrum
            .dominant_peak(PassBand::per_minute(45.0, 150.0))
            .unwrap();
        assert!((peak.rate_per_minute() as i64 - 72).abs() <= 3);
    }
    #[test]
    fn backend_rejects_empty_and_non_finite_windows() {
        let mut backend = RustFftBackend::native();
        assert!(backend.magnitude_spectrum(&[], 30.0).is_err());
        assert!(backend.magnitude_spectrum(&[1.0, f64::NAN], 30.0).is_err());
    }
    struct Failing;
    impl SpectralBackend for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn magnitude_spectrum(&mut self, _: &[f64], _: f64) -> Result<FrequencySpectrum, VitalsError> {
            Err(VitalsError::Spectral {
                backend: "failing",
                reason: "offline".into(),
            })
        }
    }
    #[test]
    fn chain_falls_through_failing_backend() {
        let mut chain = SpectralChain::empty()
            .with_backend(Box::new(Failing))
            .with_backend(Box::new(RustFftBackend::native()));
        let peak = chain
            .dominant_peak(&sine(0.3, 30.0, 300), 30.0, PassBand::per_minute(8.0, 40.0))
            .unwrap();
        assert_eq!(peak.rate_per_minute(), 18);
    }
    #[test]
    fn flat_spectrum_has_no_peak() {
        let mut chain = SpectralChain::from_kinds(&[SpectralBackendKind::RustFft]);
        assert!(chain
            .dominant_peak(&[0.0; 64], 30.0, PassBand::per_minute(45.0, 150.0))
            .is_none());
    }
}
