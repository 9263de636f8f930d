//! End-to-end separation pipeline
//!
//! Orchestrates the complete analysis:
//! 1. Preprocess raw audio (mono, normalize, decimate)
//! 2. Short-time Fourier transform (magnitude spectrogram)
//! 3. Estimate speaker count (GMM + BIC sweep)
//! 4. Blind source separation (FastICA)
//! 5. Cluster frames and build the speaker report
//!
//! Each stage is a pure function of the previous stage's output; the
//! pipeline threads the intermediate structures explicitly and holds no
//! mutable state between runs. On any stage failure the error propagates
//! and no partial report is produced.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use vx_core::{ComponentMatrix, SpeakerReport, VxError, VxResult};
use vx_dsp::{SignalPreprocessor, SpectrogramBuilder, StftConfig};

use crate::attribute::{AttributorConfig, SpeakerAttributor};
use crate::gmm::{GmmConfig, SpeakerCountEstimator};
use crate::ica::{IcaConfig, SourceSeparator};

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Decimation factor applied before analysis
    pub downsample_factor: usize,

    /// Smallest candidate speaker count
    pub min_speakers: usize,

    /// Largest candidate speaker count
    pub max_speakers: usize,

    /// Seed for every randomized stage
    ///
    /// A fixed seed makes the full pipeline reproducible on this
    /// implementation. Seeds do not transfer across different
    /// implementations of the underlying numerical algorithms.
    pub seed: u64,

    /// STFT parameters
    pub stft: StftConfig,

    /// Speaker-count estimation (EM) parameters
    pub gmm: GmmConfig,

    /// Separation (FastICA) parameters
    pub ica: IcaConfig,

    /// Attribution (k-means) parameters
    pub attributor: AttributorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            downsample_factor: 4,
            min_speakers: 2,
            max_speakers: 6,
            seed: 42,
            stft: StftConfig::default(),
            gmm: GmmConfig::default(),
            ica: IcaConfig::default(),
            attributor: AttributorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate parameter ranges before any processing starts
    pub fn validate(&self) -> VxResult<()> {
        if self.downsample_factor == 0 {
            return Err(VxError::Config(
                "downsample factor must be at least 1".into(),
            ));
        }
        if self.min_speakers == 0 {
            return Err(VxError::Config("min speakers must be at least 1".into()));
        }
        if self.max_speakers < self.min_speakers {
            return Err(VxError::Config(format!(
                "speaker range [{}, {}] is empty",
                self.min_speakers, self.max_speakers
            )));
        }
        self.stft.validate()
    }
}

/// Complete pipeline result
///
/// The report is the durable artifact handed to persistence and
/// visualization collaborators; the raw component matrix accompanies it
/// for waveform rendering.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Estimated number of speakers
    pub speaker_count: usize,

    /// Per-speaker energy shares and active time ranges
    pub report: SpeakerReport,

    /// Separated components, frame-aligned with the analysis
    pub components: ComponentMatrix,
}

/// End-to-end separation pipeline
pub struct SeparationPipeline {
    config: PipelineConfig,
    preprocessor: SignalPreprocessor,
    builder: SpectrogramBuilder,
    estimator: SpeakerCountEstimator,
    separator: SourceSeparator,
    attributor: SpeakerAttributor,
}

impl SeparationPipeline {
    /// Create a pipeline from a validated configuration
    pub fn new(config: PipelineConfig) -> VxResult<Self> {
        config.validate()?;

        let preprocessor = SignalPreprocessor::new(config.downsample_factor)?;
        let builder = SpectrogramBuilder::new(config.stft.clone())?;
        let estimator = SpeakerCountEstimator::new(config.gmm.clone());
        let separator = SourceSeparator::new(config.ica.clone());
        let attributor = SpeakerAttributor::new(config.attributor.clone());

        Ok(Self {
            config,
            preprocessor,
            builder,
            estimator,
            separator,
            attributor,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full analysis over raw interleaved audio
    ///
    /// # Arguments
    /// * `samples` - Interleaved audio samples
    /// * `channels` - Number of audio channels (>= 1)
    /// * `sample_rate` - Native sample rate in Hz
    pub fn process(
        &self,
        samples: &[f64],
        channels: usize,
        sample_rate: u32,
    ) -> VxResult<PipelineOutput> {
        let seed = self.config.seed;

        let signal = self.preprocessor.prepare(samples, channels, sample_rate)?;
        debug!(
            "signal ready: {} samples @ {} Hz",
            signal.len(),
            signal.sample_rate
        );

        let spectrogram = self.builder.transform(&signal)?;
        debug!(
            "spectrogram ready: {} frames x {} bins",
            spectrogram.num_frames(),
            spectrogram.num_bins()
        );

        let speaker_count = self.estimator.estimate(
            &spectrogram,
            self.config.min_speakers,
            self.config.max_speakers,
            seed,
        )?;

        let components = self.separator.separate(&spectrogram, speaker_count, seed)?;

        let report = self
            .attributor
            .attribute(&components, spectrogram.timestamps(), seed)?;

        info!(
            "pipeline complete: {} speakers over {:.2}s of audio",
            speaker_count,
            signal.duration()
        );

        Ok(PipelineOutput {
            speaker_count,
            report,
            components,
        })
    }
}
