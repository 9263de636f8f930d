//! # VoxSplit estimation and separation suite
//!
//! Statistical back-end of the speaker separation pipeline:
//! - Speaker-count estimation (Gaussian mixtures scored by BIC)
//! - Blind source separation (FastICA, negentropy fixed point)
//! - Frame clustering and speaker attribution (seeded k-means)
//! - The end-to-end [`SeparationPipeline`] orchestrator
//!
//! ## Determinism
//!
//! Every randomized stage takes an explicit seed and is reproducible for a
//! fixed seed and fixed input. Seeds are not portable across different
//! implementations of the underlying algorithms.

mod attribute;
mod gmm;
mod ica;
pub mod kmeans;
mod pipeline;

pub use attribute::{AttributorConfig, SpeakerAttributor};
pub use gmm::{GaussianMixture, GmmConfig, SpeakerCountEstimator};
pub use ica::{IcaConfig, SourceSeparator};
pub use pipeline::{PipelineConfig, PipelineOutput, SeparationPipeline};
