//! vx-dsp — Signal front-end for VoxSplit
//!
//! Turns raw multi-channel audio into the frame-major magnitude
//! spectrogram the estimation stages operate on:
//! - Mono mixdown, peak normalization, decimation
//! - Short-time Fourier transform (magnitude only)
//!
//! Both stages are pure: they consume their input and construct a fresh
//! output structure, never mutating upstream state.

mod preprocess;
mod stft;

pub use preprocess::*;
pub use stft::*;
