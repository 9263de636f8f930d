//! Blind source separation via FastICA
//!
//! Each frequency bin is treated as an observed linear mixture of k
//! statistically independent sources. The unmixing transform is estimated
//! with the symmetric fixed-point iteration (logcosh contrast): whiten the
//! centered frames, then iterate the negentropy update with symmetric
//! decorrelation until the transform stops rotating.
//!
//! Output columns carry the usual ICA ambiguities: sign, scale, and order
//! are arbitrary. Downstream stages must not assume any of them.

use log::{debug, info};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use vx_core::{ComponentMatrix, Spectrogram, VxError, VxResult};

/// Eigenvalue floor guarding the whitening inversion
const EIGENVALUE_FLOOR: f64 = 1e-12;

/// FastICA configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcaConfig {
    /// Fixed-point iteration budget
    pub max_iterations: usize,

    /// Convergence threshold on the unmixing rotation per iteration
    pub tolerance: f64,
}

impl Default for IcaConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-4,
        }
    }
}

/// Blind source separator
#[derive(Debug, Clone, Default)]
pub struct SourceSeparator {
    config: IcaConfig,
}

impl SourceSeparator {
    /// Create a separator with the given iteration budget
    pub fn new(config: IcaConfig) -> Self {
        Self { config }
    }

    /// Recover `num_components` independent components from the spectrogram
    ///
    /// The result has one column per component and one row per frame,
    /// aligned with the spectrogram's timestamps.
    ///
    /// # Errors
    /// `InsufficientData` if the frame or bin count cannot support the
    /// requested component count, `Convergence` if the fixed-point
    /// iteration exhausts its budget.
    pub fn separate(
        &self,
        spectrogram: &Spectrogram,
        num_components: usize,
        seed: u64,
    ) -> VxResult<ComponentMatrix> {
        let n = spectrogram.num_frames();
        let d = spectrogram.num_bins();
        let k = num_components;

        if k == 0 {
            return Err(VxError::Config("component count must be at least 1".into()));
        }
        if k > n.min(d) {
            return Err(VxError::InsufficientData(format!(
                "{} components cannot be recovered from {} frames x {} bins",
                k, n, d
            )));
        }

        // Center each frequency bin across frames
        let data = spectrogram.magnitudes();
        let col_means = data
            .mean_axis(Axis(0))
            .ok_or_else(|| VxError::InsufficientData("no frames".into()))?;
        let centered = &data - &col_means;

        // Whiten: project onto the top-k covariance eigenvectors, unit variance
        let whitening = whitening_matrix(&centered, k);
        let z = whitening.dot(&centered.t());

        // Seeded random unmixing estimate, decorrelated before iterating
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let init = Array2::from_shape_fn((k, k), |_| rng.random::<f64>() - 0.5);
        let mut w = symmetric_decorrelation(&init);

        let mut converged = false;
        for iter in 0..self.config.max_iterations {
            let projected = w.dot(&z);
            let g = projected.mapv(f64::tanh);
            let g_prime_mean: Array1<f64> =
                g.map_axis(Axis(1), |row| row.iter().map(|&v| 1.0 - v * v).sum::<f64>())
                    / n as f64;

            let mut w_new = g.dot(&z.t()) / n as f64;
            for (j, mut row) in w_new.rows_mut().into_iter().enumerate() {
                row.zip_mut_with(&w.row(j), |out, &prev| *out -= g_prime_mean[j] * prev);
            }
            let w_new = symmetric_decorrelation(&w_new);

            // Rotation between successive estimates; 1.0 on all diagonal
            // entries means the transform has stopped moving.
            let overlap = w_new.dot(&w.t());
            let delta = (0..k)
                .map(|j| (overlap[[j, j]].abs() - 1.0).abs())
                .fold(0.0, f64::max);

            w = w_new;
            if delta < self.config.tolerance {
                debug!("fastica converged after {} iterations", iter + 1);
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(VxError::Convergence {
                iterations: self.config.max_iterations,
                tolerance: self.config.tolerance,
            });
        }

        let sources = w.dot(&z);
        info!("separated {} components over {} frames", k, n);
        Ok(ComponentMatrix::new(sources.t().to_owned()))
    }
}

/// Top-k whitening matrix (k x d) from the covariance of centered data
fn whitening_matrix(centered: &Array2<f64>, k: usize) -> Array2<f64> {
    let (n, d) = centered.dim();
    let cov = centered.t().dot(centered) / n as f64;

    let cov_na = DMatrix::from_row_iterator(d, d, cov.iter().cloned());
    let eigen = SymmetricEigen::new(cov_na);

    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut whitening = Array2::<f64>::zeros((k, d));
    for (row, &idx) in order.iter().take(k).enumerate() {
        let scale = 1.0 / eigen.eigenvalues[idx].max(EIGENVALUE_FLOOR).sqrt();
        for col in 0..d {
            whitening[[row, col]] = eigen.eigenvectors[(col, idx)] * scale;
        }
    }

    whitening
}

/// W <- (W W^T)^(-1/2) W, keeping rows mutually orthogonal
fn symmetric_decorrelation(w: &Array2<f64>) -> Array2<f64> {
    let k = w.nrows();
    let wwt = w.dot(&w.t());

    let wwt_na = DMatrix::from_row_iterator(k, k, wwt.iter().cloned());
    let eigen = SymmetricEigen::new(wwt_na);

    let mut inv_sqrt = Array2::<f64>::zeros((k, k));
    for i in 0..k {
        for j in 0..k {
            let mut sum = 0.0;
            for m in 0..k {
                let lambda = eigen.eigenvalues[m].max(EIGENVALUE_FLOOR);
                sum += eigen.eigenvectors[(i, m)] * eigen.eigenvectors[(j, m)] / lambda.sqrt();
            }
            inv_sqrt[[i, j]] = sum;
        }
    }

    inv_sqrt.dot(w)
}
