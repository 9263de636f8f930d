//! Raw signal preprocessing
//!
//! Collapses interleaved multi-channel audio to mono, normalizes to peak
//! amplitude 1.0, then decimates by an integer factor. Silent input is
//! rejected here so no NaN ever enters the pipeline.

use log::debug;

use vx_core::{AudioSignal, Sample, VxError, VxResult};

/// Signal preprocessor
///
/// Decimation keeps every Nth sample; the sample rate is divided by the
/// same factor (floor). No anti-alias filtering is applied before
/// decimation — the downstream magnitude statistics tolerate the aliasing
/// and the factor is small in practice.
#[derive(Debug, Clone)]
pub struct SignalPreprocessor {
    downsample_factor: usize,
}

impl SignalPreprocessor {
    /// Create a preprocessor with the given decimation factor (>= 1)
    pub fn new(downsample_factor: usize) -> VxResult<Self> {
        if downsample_factor == 0 {
            return Err(VxError::Config(
                "downsample factor must be at least 1".into(),
            ));
        }
        Ok(Self { downsample_factor })
    }

    /// Decimation factor
    pub fn downsample_factor(&self) -> usize {
        self.downsample_factor
    }

    /// Prepare raw interleaved audio for analysis
    ///
    /// # Arguments
    /// * `samples` - Interleaved audio samples
    /// * `channels` - Number of audio channels (>= 1)
    /// * `sample_rate` - Native sample rate in Hz
    ///
    /// # Errors
    /// `InvalidInput` for empty or silent audio (peak amplitude 0),
    /// `Config` for a zero channel count or a rate the decimation factor
    /// would reduce to zero.
    pub fn prepare(
        &self,
        samples: &[Sample],
        channels: usize,
        sample_rate: u32,
    ) -> VxResult<AudioSignal> {
        if channels == 0 {
            return Err(VxError::Config("channel count must be at least 1".into()));
        }
        if samples.is_empty() {
            return Err(VxError::InvalidInput("empty audio input".into()));
        }
        if sample_rate == 0 {
            return Err(VxError::Config("sample rate must be positive".into()));
        }
        let out_rate = sample_rate / self.downsample_factor as u32;
        if out_rate == 0 {
            return Err(VxError::Config(format!(
                "downsample factor {} exceeds sample rate {}",
                self.downsample_factor, sample_rate
            )));
        }

        let mono = mixdown(samples, channels);

        let peak = mono.iter().map(|s| s.abs()).fold(0.0, Sample::max);
        if peak == 0.0 {
            return Err(VxError::InvalidInput(
                "silent audio: peak amplitude is zero".into(),
            ));
        }

        let normalized: Vec<Sample> = mono
            .iter()
            .step_by(self.downsample_factor)
            .map(|s| s / peak)
            .collect();

        debug!(
            "preprocessed {} interleaved samples ({} ch) -> {} mono samples @ {} Hz",
            samples.len(),
            channels,
            normalized.len(),
            out_rate
        );

        Ok(AudioSignal::new(normalized, out_rate))
    }
}

/// Mixdown interleaved channels by per-frame averaging
fn mixdown(samples: &[Sample], channels: usize) -> Vec<Sample> {
    if channels == 1 {
        return samples.to_vec();
    }

    let frames = samples.len() / channels;
    let mut mono = Vec::with_capacity(frames);
    for frame in 0..frames {
        let mut sum = 0.0;
        for ch in 0..channels {
            sum += samples[frame * channels + ch];
        }
        mono.push(sum / channels as Sample);
    }
    mono
}
