//! vx-core: Shared types, traits, and utilities for VoxSplit
//!
//! This crate provides the foundational types passed between the pipeline
//! stages: the preprocessed signal, the time-frequency representation, the
//! separated component matrix, and the final speaker report.

mod components;
mod error;
mod report;
mod signal;
mod spectrogram;

pub use components::*;
pub use error::*;
pub use report::*;
pub use signal::*;
pub use spectrogram::*;

/// Type alias for audio samples (always f64 for maximum precision)
pub type Sample = f64;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
