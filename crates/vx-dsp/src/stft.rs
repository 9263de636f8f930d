//! Short-time Fourier transform
//!
//! Splits the signal into overlapping windowed frames and keeps the
//! one-sided magnitude spectrum per frame. Phase is discarded: the
//! estimation stages only consume magnitudes, and dropping phase halves
//! the data volume.

use std::f64::consts::PI;
use std::sync::Arc;

use log::debug;
use ndarray::Array2;
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use vx_core::{AudioSignal, Spectrogram, VxError, VxResult};

/// Default analysis window length
const DEFAULT_WINDOW_LEN: usize = 256;

/// Default hop size (50% overlap)
const DEFAULT_HOP_LEN: usize = 128;

/// Minimum accepted window length
const MIN_WINDOW_LEN: usize = 16;

/// Analysis window function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WindowFunction {
    /// Hann window (default)
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Blackman window
    Blackman,
}

impl WindowFunction {
    /// Periodic window coefficients of the given length
    pub fn coefficients(&self, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let x = 2.0 * PI * i as f64 / len as f64;
                match self {
                    WindowFunction::Hann => 0.5 * (1.0 - x.cos()),
                    WindowFunction::Hamming => 0.54 - 0.46 * x.cos(),
                    WindowFunction::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                }
            })
            .collect()
    }
}

/// STFT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StftConfig {
    /// Analysis window length in samples (even, >= 16)
    pub window_len: usize,

    /// Hop between adjacent windows in samples (1..=window_len)
    pub hop_len: usize,

    /// Window function
    pub window: WindowFunction,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            window_len: DEFAULT_WINDOW_LEN,
            hop_len: DEFAULT_HOP_LEN,
            window: WindowFunction::Hann,
        }
    }
}

impl StftConfig {
    /// Set window length
    #[must_use]
    pub fn with_window_len(mut self, window_len: usize) -> Self {
        self.window_len = window_len;
        self
    }

    /// Set hop size
    #[must_use]
    pub fn with_hop_len(mut self, hop_len: usize) -> Self {
        self.hop_len = hop_len;
        self
    }

    /// Set window function
    #[must_use]
    pub fn with_window(mut self, window: WindowFunction) -> Self {
        self.window = window;
        self
    }

    /// Validate parameter ranges
    pub fn validate(&self) -> VxResult<()> {
        if self.window_len < MIN_WINDOW_LEN || self.window_len % 2 != 0 {
            return Err(VxError::Config(format!(
                "window length must be even and >= {}, got {}",
                MIN_WINDOW_LEN, self.window_len
            )));
        }
        if self.hop_len == 0 || self.hop_len > self.window_len {
            return Err(VxError::Config(format!(
                "hop length must be in 1..={}, got {}",
                self.window_len, self.hop_len
            )));
        }
        Ok(())
    }
}

/// Spectrogram builder
///
/// Frames are centered: the signal is zero-padded by half a window on both
/// ends, so frame `i` is centered at `i * hop_len / sample_rate` seconds.
/// Identical input and configuration always produce identical output.
pub struct SpectrogramBuilder {
    config: StftConfig,
    fft_forward: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
    /// 1 / sum(window), applied to every bin
    scale: f64,
}

impl SpectrogramBuilder {
    /// Create a builder, planning the FFT up front
    pub fn new(config: StftConfig) -> VxResult<Self> {
        config.validate()?;

        let mut planner = RealFftPlanner::new();
        let fft_forward = planner.plan_fft_forward(config.window_len);

        let window = config.window.coefficients(config.window_len);
        let window_sum: f64 = window.iter().sum();
        if window_sum <= 0.0 {
            return Err(VxError::Config("window function sums to zero".into()));
        }

        Ok(Self {
            config,
            fft_forward,
            window,
            scale: 1.0 / window_sum,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &StftConfig {
        &self.config
    }

    /// Compute the magnitude spectrogram of a signal
    pub fn transform(&self, signal: &AudioSignal) -> VxResult<Spectrogram> {
        if signal.is_empty() {
            return Err(VxError::InvalidInput("empty signal".into()));
        }
        if signal.sample_rate == 0 {
            return Err(VxError::InvalidInput("zero sample rate".into()));
        }

        let window_len = self.config.window_len;
        let hop = self.config.hop_len;
        let n_bins = window_len / 2 + 1;
        let n_frames = signal.len() / hop + 1;

        // Zero-pad half a window at the front for center alignment, and
        // enough at the back for the last frame to be fully in range.
        let needed = (n_frames - 1) * hop + window_len;
        let front = window_len / 2;
        let padded_len = needed.max(front + signal.len());
        let mut padded = vec![0.0f64; padded_len];
        padded[front..front + signal.len()].copy_from_slice(&signal.samples);

        let mut magnitudes = Array2::<f64>::zeros((n_frames, n_bins));
        let mut input_buffer = vec![0.0f64; window_len];
        let mut output_buffer = vec![Complex::new(0.0, 0.0); n_bins];
        let mut scratch = vec![Complex::new(0.0, 0.0); self.fft_forward.get_scratch_len()];

        for frame_idx in 0..n_frames {
            let start = frame_idx * hop;

            for (i, &sample) in padded[start..start + window_len].iter().enumerate() {
                input_buffer[i] = sample * self.window[i];
            }

            self.fft_forward
                .process_with_scratch(&mut input_buffer, &mut output_buffer, &mut scratch)
                .map_err(|e| VxError::Dsp(format!("FFT failed: {}", e)))?;

            for (bin, &val) in output_buffer.iter().enumerate() {
                magnitudes[[frame_idx, bin]] = val.norm() * self.scale;
            }
        }

        let rate = signal.sample_rate as f64;
        let frequencies: Vec<f64> = (0..n_bins)
            .map(|k| k as f64 * rate / window_len as f64)
            .collect();
        let timestamps: Vec<f64> = (0..n_frames).map(|i| (i * hop) as f64 / rate).collect();

        debug!(
            "stft: {} samples -> {} frames x {} bins (window {}, hop {})",
            signal.len(),
            n_frames,
            n_bins,
            window_len,
            hop
        );

        Spectrogram::new(magnitudes, frequencies, timestamps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine_signal(freq: f64, rate: u32, seconds: f64) -> AudioSignal {
        let n = (rate as f64 * seconds) as usize;
        let samples: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / rate as f64).sin())
            .collect();
        AudioSignal::new(samples, rate)
    }

    #[test]
    fn test_hann_window_shape() {
        let window = WindowFunction::Hann.coefficients(256);
        assert_eq!(window.len(), 256);
        assert!(window[0] < 1e-9);
        assert!(window[128] > 0.99);
    }

    #[test]
    fn test_config_validation() {
        assert!(StftConfig::default().validate().is_ok());
        assert!(StftConfig::default().with_window_len(15).validate().is_err());
        assert!(StftConfig::default().with_hop_len(0).validate().is_err());
        assert!(
            StftConfig::default()
                .with_hop_len(512)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_frame_count_matches_timestamps() {
        let builder = SpectrogramBuilder::new(StftConfig::default()).unwrap();
        let spec = builder.transform(&sine_signal(440.0, 4000, 1.0)).unwrap();

        assert_eq!(spec.num_frames(), spec.timestamps().len());
        assert_eq!(spec.num_frames(), 4000 / 128 + 1);
        assert_eq!(spec.num_bins(), 129);
    }

    #[test]
    fn test_timestamps_ascending_from_zero() {
        let builder = SpectrogramBuilder::new(StftConfig::default()).unwrap();
        let spec = builder.transform(&sine_signal(440.0, 4000, 0.5)).unwrap();

        let ts = spec.timestamps();
        assert_relative_eq!(ts[0], 0.0);
        assert!(ts.windows(2).all(|w| w[1] > w[0]));
        assert_relative_eq!(ts[1] - ts[0], 128.0 / 4000.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sine_energy_lands_in_expected_bin() {
        let builder = SpectrogramBuilder::new(StftConfig::default()).unwrap();
        let spec = builder.transform(&sine_signal(440.0, 4000, 1.0)).unwrap();

        // Bin resolution is 4000/256 = 15.625 Hz; 440 Hz falls at bin ~28
        let mid = spec.num_frames() / 2;
        let frame = spec.frame(mid);
        let peak_bin = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert!((27..=29).contains(&peak_bin), "peak bin {}", peak_bin);
    }

    #[test]
    fn test_magnitudes_non_negative() {
        let builder = SpectrogramBuilder::new(StftConfig::default()).unwrap();
        let spec = builder.transform(&sine_signal(440.0, 4000, 0.25)).unwrap();
        assert!(spec.magnitudes().iter().all(|&m| m >= 0.0));
    }

    #[test]
    fn test_transform_is_deterministic() {
        let builder = SpectrogramBuilder::new(StftConfig::default()).unwrap();
        let signal = sine_signal(440.0, 4000, 0.5);
        let a = builder.transform(&signal).unwrap();
        let b = builder.transform(&signal).unwrap();
        assert_eq!(a.magnitudes(), b.magnitudes());
        assert_eq!(a.timestamps(), b.timestamps());
    }

    #[test]
    fn test_rejects_empty_signal() {
        let builder = SpectrogramBuilder::new(StftConfig::default()).unwrap();
        let result = builder.transform(&AudioSignal::new(vec![], 4000));
        assert!(matches!(result, Err(VxError::InvalidInput(_))));
    }
}
