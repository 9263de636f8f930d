//! Time-frequency magnitude representation

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{VxError, VxResult};

/// Frame-major magnitude spectrogram
///
/// Row `i` of the matrix is the one-sided magnitude spectrum of analysis
/// window `i`, centered at `timestamps[i]` seconds. Phase is discarded by
/// the builder; nothing downstream needs it.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    magnitudes: Array2<f64>,
    frequencies: Vec<f64>,
    timestamps: Vec<f64>,
}

impl Spectrogram {
    /// Create a spectrogram, validating shape invariants
    ///
    /// Fails if the frame count does not match the timestamp count or the
    /// bin count does not match the frequency axis.
    pub fn new(
        magnitudes: Array2<f64>,
        frequencies: Vec<f64>,
        timestamps: Vec<f64>,
    ) -> VxResult<Self> {
        if magnitudes.nrows() != timestamps.len() {
            return Err(VxError::Dsp(format!(
                "frame count {} does not match timestamp count {}",
                magnitudes.nrows(),
                timestamps.len()
            )));
        }
        if magnitudes.ncols() != frequencies.len() {
            return Err(VxError::Dsp(format!(
                "bin count {} does not match frequency axis length {}",
                magnitudes.ncols(),
                frequencies.len()
            )));
        }
        Ok(Self {
            magnitudes,
            frequencies,
            timestamps,
        })
    }

    /// Number of analysis frames
    pub fn num_frames(&self) -> usize {
        self.magnitudes.nrows()
    }

    /// Number of frequency bins
    pub fn num_bins(&self) -> usize {
        self.magnitudes.ncols()
    }

    /// Full frame-major magnitude matrix
    pub fn magnitudes(&self) -> ArrayView2<'_, f64> {
        self.magnitudes.view()
    }

    /// Magnitude spectrum of frame `index`
    pub fn frame(&self, index: usize) -> ArrayView1<'_, f64> {
        self.magnitudes.row(index)
    }

    /// Frequency bin centers in Hz
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Frame center timestamps in seconds, ascending
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }
}
