//! Seeded k-means clustering
//!
//! Lloyd iterations with k-means++ initialization. Used to group frames by
//! their separated-component profile. Deterministic for a fixed seed.

use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use vx_core::{VxError, VxResult};

/// Partition the rows of `data` into `k` clusters
///
/// Returns one label in `[0, k)` per row. An emptied cluster keeps its
/// previous centroid, so every label stays valid.
pub fn cluster(
    data: ArrayView2<'_, f64>,
    k: usize,
    max_iterations: usize,
    seed: u64,
) -> VxResult<Vec<usize>> {
    let n = data.nrows();
    if k == 0 {
        return Err(VxError::Config("cluster count must be at least 1".into()));
    }
    if n == 0 {
        return Err(VxError::InvalidInput("no observations to cluster".into()));
    }
    if k > n {
        return Err(VxError::InsufficientData(format!(
            "{} observations cannot fill {} clusters",
            n, k
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centroids = plus_plus_init(&data, k, &mut rng);
    let mut labels = vec![0usize; n];

    for iter in 0..max_iterations {
        let previous = labels.clone();

        // Assign each row to its nearest centroid
        for (i, row) in data.rows().into_iter().enumerate() {
            let mut best = 0;
            let mut best_dist = f64::MAX;
            for (j, centroid) in centroids.rows().into_iter().enumerate() {
                let dist = squared_distance(row, centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best = j;
                }
            }
            labels[i] = best;
        }

        // Recompute centroids from their members
        let mut counts = vec![0usize; k];
        let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
        for (i, row) in data.rows().into_iter().enumerate() {
            counts[labels[i]] += 1;
            let mut sum_row = sums.row_mut(labels[i]);
            sum_row += &row;
        }
        for j in 0..k {
            if counts[j] > 0 {
                let mut centroid = centroids.row_mut(j);
                centroid.assign(&(&sums.row(j) / counts[j] as f64));
            }
        }

        if labels == previous && iter > 0 {
            debug!("kmeans converged after {} iterations", iter + 1);
            break;
        }
    }

    Ok(labels)
}

/// k-means++ seeding: spread the initial centroids out proportionally to
/// squared distance from those already chosen
fn plus_plus_init(data: &ArrayView2<'_, f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let n = data.nrows();
    let d = data.ncols();
    let mut centroids = Array2::<f64>::zeros((k, d));

    let first = rng.random_range(0..n);
    centroids.row_mut(0).assign(&data.row(first));

    for j in 1..k {
        let distances: Vec<f64> = data
            .rows()
            .into_iter()
            .map(|row| {
                (0..j)
                    .map(|c| squared_distance(row, centroids.row(c)))
                    .fold(f64::MAX, f64::min)
            })
            .collect();

        let total: f64 = distances.iter().sum();
        let pick = if total > 0.0 {
            let mut threshold = rng.random::<f64>() * total;
            let mut chosen = n - 1;
            for (i, &dist) in distances.iter().enumerate() {
                threshold -= dist;
                if threshold <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // All rows coincide with existing centroids
            rng.random_range(0..n)
        };
        centroids.row_mut(j).assign(&data.row(pick));
    }

    centroids
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum()
}
