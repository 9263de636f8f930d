//! Separated component matrix

use ndarray::{Array2, ArrayView1, ArrayView2};

/// Frame-major matrix of independent components, one column per speaker
///
/// Columns are aligned frame-for-frame with the source spectrogram's
/// timestamps. Sign and relative amplitude of each column are ambiguous by
/// construction of the separation; consumers must not assume a particular
/// ordering or absolute scale.
#[derive(Debug, Clone)]
pub struct ComponentMatrix {
    data: Array2<f64>,
}

impl ComponentMatrix {
    /// Wrap a frames × components matrix
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// Number of frames (rows)
    pub fn num_frames(&self) -> usize {
        self.data.nrows()
    }

    /// Number of components (columns)
    pub fn num_components(&self) -> usize {
        self.data.ncols()
    }

    /// Full frames × components matrix
    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Recovered signal of component `index`, one value per frame
    pub fn component(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.column(index)
    }

    /// Per-frame feature vector (row `index`), length == component count
    pub fn frame(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }

    /// Total absolute energy of component `index` across all frames
    pub fn component_energy(&self, index: usize) -> f64 {
        self.data.column(index).iter().map(|v| v.abs()).sum()
    }
}
