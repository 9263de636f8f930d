//! Gaussian mixture fitting and model-order selection
//!
//! Each spectrogram frame is one observation in frequency-bin space. For
//! every candidate speaker count k, a diagonal-covariance mixture is fitted
//! by EM from a seeded initialization and scored with the Bayesian
//! Information Criterion; the k minimizing BIC wins, ties going to the
//! smaller k.

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use vx_core::{Spectrogram, VxError, VxResult};

/// EM fitting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmmConfig {
    /// Maximum EM iterations per fit
    pub max_iterations: usize,

    /// Convergence threshold on the mean per-sample log-likelihood change
    pub tolerance: f64,

    /// Variance floor added to every diagonal entry
    pub reg_covar: f64,
}

impl Default for GmmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-3,
            reg_covar: 1e-6,
        }
    }
}

/// Fitted diagonal-covariance Gaussian mixture
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    weights: Array1<f64>,
    means: Array2<f64>,
    variances: Array2<f64>,
    log_likelihood: f64,
    converged: bool,
}

impl GaussianMixture {
    /// Fit a k-component mixture over the rows of `data`
    ///
    /// Means are initialized from k distinct randomly chosen rows, so the
    /// fit is deterministic for a fixed seed.
    pub fn fit(
        data: ArrayView2<'_, f64>,
        num_components: usize,
        config: &GmmConfig,
        seed: u64,
    ) -> VxResult<Self> {
        let (n, d) = data.dim();
        if num_components == 0 {
            return Err(VxError::Config("component count must be at least 1".into()));
        }
        if n < num_components {
            return Err(VxError::InsufficientData(format!(
                "{} observations cannot support {} mixture components",
                n, num_components
            )));
        }

        let k = num_components;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        // Means from k distinct random observations
        let picks = rand::seq::index::sample(&mut rng, n, k);
        let mut means = Array2::<f64>::zeros((k, d));
        for (j, row_idx) in picks.into_iter().enumerate() {
            means.row_mut(j).assign(&data.row(row_idx));
        }

        // Shared per-dimension sample variance as the starting covariance
        let global_mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| VxError::InsufficientData("no observations".into()))?;
        let centered = &data - &global_mean;
        let global_var = centered
            .mapv(|v| v * v)
            .mean_axis(Axis(0))
            .ok_or_else(|| VxError::InsufficientData("no observations".into()))?
            + config.reg_covar;
        let mut variances = Array2::<f64>::zeros((k, d));
        for j in 0..k {
            variances.row_mut(j).assign(&global_var);
        }

        let mut weights = Array1::<f64>::from_elem(k, 1.0 / k as f64);

        let data_sq = data.mapv(|v| v * v);
        let mut log_likelihood = f64::NEG_INFINITY;
        let mut converged = false;

        for _iter in 0..config.max_iterations {
            // E-step: responsibilities via log-space weighting
            let weighted = weighted_log_prob(&data, &means, &variances, &weights);
            let log_norm = weighted.map_axis(Axis(1), log_sum_exp);
            let total_ll: f64 = log_norm.sum();

            let mut resp = weighted;
            for (mut row, &norm) in resp.rows_mut().into_iter().zip(log_norm.iter()) {
                row.mapv_inplace(|lp| (lp - norm).exp());
            }

            // M-step
            let nk = resp.sum_axis(Axis(0)).mapv(|v| v.max(f64::MIN_POSITIVE));
            weights = &nk / n as f64;
            means = resp.t().dot(&data) / &nk.view().insert_axis(Axis(1));
            let second_moment = resp.t().dot(&data_sq) / &nk.view().insert_axis(Axis(1));
            variances = second_moment - &means.mapv(|m| m * m) + config.reg_covar;

            let change = (total_ll - log_likelihood) / n as f64;
            log_likelihood = total_ll;
            if change.abs() < config.tolerance {
                converged = true;
                break;
            }
        }

        Ok(Self {
            weights,
            means,
            variances,
            log_likelihood,
            converged,
        })
    }

    /// Number of mixture components
    pub fn num_components(&self) -> usize {
        self.means.nrows()
    }

    /// Whether EM reached its tolerance within the iteration budget
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Total log-likelihood of the training data under the final model
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Free parameter count: means + diagonal variances + mixing weights
    pub fn num_parameters(&self) -> usize {
        let k = self.means.nrows();
        let d = self.means.ncols();
        2 * k * d + (k - 1)
    }

    /// Bayesian Information Criterion over `n` observations (lower is better)
    pub fn bic(&self, n: usize) -> f64 {
        self.num_parameters() as f64 * (n as f64).ln() - 2.0 * self.log_likelihood
    }
}

/// Per-observation, per-component log of weight * gaussian density
fn weighted_log_prob(
    data: &ArrayView2<'_, f64>,
    means: &Array2<f64>,
    variances: &Array2<f64>,
    weights: &Array1<f64>,
) -> Array2<f64> {
    const LN_2PI: f64 = 1.837_877_066_409_345_3;

    let (n, _d) = data.dim();
    let k = means.nrows();
    let mut out = Array2::<f64>::zeros((n, k));

    for j in 0..k {
        let mean_j = means.row(j);
        let var_j = variances.row(j);
        let log_det: f64 = var_j.iter().map(|&v| (LN_2PI + v.ln())).sum::<f64>();

        let diff = data - &mean_j;
        let quad = (diff.mapv(|v| v * v) / &var_j).sum_axis(Axis(1));

        let log_weight = weights[j].ln();
        for (i, &q) in quad.iter().enumerate() {
            out[[i, j]] = log_weight - 0.5 * (log_det + q);
        }
    }

    out
}

/// Numerically stable ln(sum(exp(values)))
fn log_sum_exp(values: ndarray::ArrayView1<'_, f64>) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Speaker-count estimator
///
/// Sweeps candidate counts over a closed range, fitting one mixture per
/// candidate in parallel. Each fit gets its own RNG seeded identically, so
/// the sweep result is independent of completion order.
#[derive(Debug, Clone, Default)]
pub struct SpeakerCountEstimator {
    config: GmmConfig,
}

impl SpeakerCountEstimator {
    /// Create an estimator with the given EM configuration
    pub fn new(config: GmmConfig) -> Self {
        Self { config }
    }

    /// Estimate the speaker count from spectrogram frames
    ///
    /// # Errors
    /// `Config` if the range is empty or starts at zero,
    /// `InsufficientData` if `max_speakers` exceeds the frame count.
    pub fn estimate(
        &self,
        spectrogram: &Spectrogram,
        min_speakers: usize,
        max_speakers: usize,
        seed: u64,
    ) -> VxResult<usize> {
        if min_speakers == 0 {
            return Err(VxError::Config("min speakers must be at least 1".into()));
        }
        if max_speakers < min_speakers {
            return Err(VxError::Config(format!(
                "speaker range [{}, {}] is empty",
                min_speakers, max_speakers
            )));
        }
        let n = spectrogram.num_frames();
        if max_speakers > n {
            return Err(VxError::InsufficientData(format!(
                "max speakers {} exceeds available frame count {}",
                max_speakers, n
            )));
        }

        let data = spectrogram.magnitudes();
        let candidates: Vec<usize> = (min_speakers..=max_speakers).collect();

        let scores: Vec<(usize, f64)> = candidates
            .par_iter()
            .map(|&k| {
                GaussianMixture::fit(data, k, &self.config, seed).map(|model| (k, model.bic(n)))
            })
            .collect::<VxResult<Vec<_>>>()?;

        for &(k, bic) in &scores {
            debug!("candidate k={} bic={:.3}", k, bic);
        }

        // Candidates come back in ascending k order; strict comparison keeps
        // the first occurrence on ties.
        let mut best = scores[0];
        for &(k, bic) in &scores[1..] {
            if bic < best.1 {
                best = (k, bic);
            }
        }
        info!("estimated speaker count: {}", best.0);

        Ok(best.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use vx_core::Spectrogram;

    /// Two well-separated blobs in 3 dimensions
    fn two_blob_data(per_blob: usize) -> Array2<f64> {
        let mut data = Array2::<f64>::zeros((2 * per_blob, 3));
        for i in 0..per_blob {
            let jitter = (i % 7) as f64 * 0.01;
            data.row_mut(i).assign(&ndarray::arr1(&[
                1.0 + jitter,
                0.0 + jitter,
                0.5 - jitter,
            ]));
            data.row_mut(per_blob + i).assign(&ndarray::arr1(&[
                -1.0 - jitter,
                2.0 + jitter,
                -0.5 + jitter,
            ]));
        }
        data
    }

    fn blob_spectrogram(per_blob: usize) -> Spectrogram {
        let data = two_blob_data(per_blob);
        let n = data.nrows();
        let timestamps: Vec<f64> = (0..n).map(|i| i as f64 * 0.032).collect();
        Spectrogram::new(data, vec![0.0, 100.0, 200.0], timestamps).unwrap()
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = two_blob_data(20);
        let config = GmmConfig::default();
        let a = GaussianMixture::fit(data.view(), 2, &config, 42).unwrap();
        let b = GaussianMixture::fit(data.view(), 2, &config, 42).unwrap();
        assert_eq!(a.log_likelihood(), b.log_likelihood());
    }

    #[test]
    fn test_fit_rejects_too_few_observations() {
        let data = Array2::<f64>::zeros((3, 4));
        let result = GaussianMixture::fit(data.view(), 5, &GmmConfig::default(), 42);
        assert!(matches!(result, Err(VxError::InsufficientData(_))));
    }

    #[test]
    fn test_parameter_count() {
        let data = two_blob_data(10);
        let model = GaussianMixture::fit(data.view(), 2, &GmmConfig::default(), 42).unwrap();
        // 2 components x 3 dims x (mean + variance) + 1 free weight
        assert_eq!(model.num_parameters(), 13);
    }

    #[test]
    fn test_estimate_stays_in_range() {
        let spec = blob_spectrogram(25);
        let estimator = SpeakerCountEstimator::default();
        let k = estimator.estimate(&spec, 2, 4, 42).unwrap();
        assert!((2..=4).contains(&k));
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let spec = blob_spectrogram(25);
        let estimator = SpeakerCountEstimator::default();
        let a = estimator.estimate(&spec, 2, 4, 42).unwrap();
        let b = estimator.estimate(&spec, 2, 4, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_estimate_rejects_excess_max_speakers() {
        let spec = blob_spectrogram(2);
        let estimator = SpeakerCountEstimator::default();
        let result = estimator.estimate(&spec, 2, 40, 42);
        assert!(matches!(result, Err(VxError::InsufficientData(_))));
    }

    #[test]
    fn test_estimate_rejects_inverted_range() {
        let spec = blob_spectrogram(10);
        let estimator = SpeakerCountEstimator::default();
        assert!(matches!(
            estimator.estimate(&spec, 5, 2, 42),
            Err(VxError::Config(_))
        ));
    }
}
