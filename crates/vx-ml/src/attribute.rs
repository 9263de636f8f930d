//! Speaker attribution
//!
//! Clusters frames by their separated-component profile, then combines
//! per-component energy shares with per-cluster active time ranges into
//! the final report.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use vx_core::{ComponentMatrix, SpeakerProfile, SpeakerReport, TimeRange, VxError, VxResult};

use crate::kmeans;

/// Attribution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributorConfig {
    /// k-means iteration budget
    pub max_iterations: usize,
}

impl Default for AttributorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
        }
    }
}

/// Speaker attributor
#[derive(Debug, Clone, Default)]
pub struct SpeakerAttributor {
    config: AttributorConfig,
}

impl SpeakerAttributor {
    /// Create an attributor with the given clustering budget
    pub fn new(config: AttributorConfig) -> Self {
        Self { config }
    }

    /// Build the speaker report from separated components
    ///
    /// `timestamps` must align frame-for-frame with the component matrix.
    ///
    /// Component column i and cluster label i are paired positionally in
    /// the report; the clustering and the energy shares are independent
    /// estimates and no explicit matching step links them.
    pub fn attribute(
        &self,
        components: &ComponentMatrix,
        timestamps: &[f64],
        seed: u64,
    ) -> VxResult<SpeakerReport> {
        let n = components.num_frames();
        let k = components.num_components();

        if timestamps.len() != n {
            return Err(VxError::InvalidInput(format!(
                "timestamp count {} does not match frame count {}",
                timestamps.len(),
                n
            )));
        }

        // Step 1: cluster frames on their length-k component profile
        let labels = kmeans::cluster(components.data(), k, self.config.max_iterations, seed)?;

        // Step 2: energy share per component
        let energies: Vec<f64> = (0..k).map(|j| components.component_energy(j)).collect();
        let total: f64 = energies.iter().sum();
        let percentages: Vec<f64> = if total > 0.0 {
            energies.iter().map(|e| e / total * 100.0).collect()
        } else {
            warn!("grand total component energy is zero");
            vec![0.0; k]
        };

        // Step 3: active time range per cluster
        let mut ranges: Vec<Option<(f64, f64)>> = vec![None; k];
        for (frame, &label) in labels.iter().enumerate() {
            let t = timestamps[frame];
            ranges[label] = Some(match ranges[label] {
                Some((start, end)) => (start.min(t), end.max(t)),
                None => (t, t),
            });
        }

        let profiles: Vec<SpeakerProfile> = (0..k)
            .map(|i| {
                let time_range = match ranges[i] {
                    Some((start, end)) => TimeRange::Detected {
                        start: round2(start),
                        end: round2(end),
                    },
                    None => TimeRange::NotDetected,
                };
                SpeakerProfile::new(i, percentages[i], time_range)
            })
            .collect();

        debug!("attributed {} frames across {} speakers", n, k);
        Ok(SpeakerReport::new(profiles))
    }
}

/// Round to 2 decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use vx_core::ComponentMatrix;

    /// Two components, each dominant over half of the frames
    fn alternating_components(frames: usize) -> (ComponentMatrix, Vec<f64>) {
        let half = frames / 2;
        let mut data = Array2::<f64>::zeros((frames, 2));
        for t in 0..frames {
            if t < half {
                data[[t, 0]] = 1.0 + (t % 3) as f64 * 0.01;
                data[[t, 1]] = 0.05;
            } else {
                data[[t, 0]] = 0.05;
                data[[t, 1]] = 0.8 + (t % 3) as f64 * 0.01;
            }
        }
        let timestamps: Vec<f64> = (0..frames).map(|t| t as f64 * 0.032).collect();
        (ComponentMatrix::new(data), timestamps)
    }

    #[test]
    fn test_report_has_one_profile_per_component() {
        let (components, timestamps) = alternating_components(64);
        let attributor = SpeakerAttributor::default();
        let report = attributor.attribute(&components, &timestamps, 42).unwrap();
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_energy_percentages_sum_to_100() {
        let (components, timestamps) = alternating_components(64);
        let attributor = SpeakerAttributor::default();
        let report = attributor.attribute(&components, &timestamps, 42).unwrap();
        assert_relative_eq!(report.total_energy_pct(), 100.0, max_relative = 1e-9);
    }

    #[test]
    fn test_zero_energy_yields_zero_percentages() {
        let components = ComponentMatrix::new(Array2::zeros((8, 2)));
        let timestamps: Vec<f64> = (0..8).map(|t| t as f64 * 0.032).collect();
        let attributor = SpeakerAttributor::default();
        let report = attributor.attribute(&components, &timestamps, 42).unwrap();
        assert!(report.iter().all(|p| p.energy_pct == 0.0));
    }

    #[test]
    fn test_intervals_are_ordered() {
        let (components, timestamps) = alternating_components(64);
        let attributor = SpeakerAttributor::default();
        let report = attributor.attribute(&components, &timestamps, 42).unwrap();
        for profile in &report {
            if let TimeRange::Detected { start, end } = profile.time_range {
                assert!(start <= end);
            }
        }
    }

    #[test]
    fn test_timestamps_rounded_to_two_decimals() {
        let (components, timestamps) = alternating_components(64);
        let attributor = SpeakerAttributor::default();
        let report = attributor.attribute(&components, &timestamps, 42).unwrap();
        for profile in &report {
            if let TimeRange::Detected { start, end } = profile.time_range {
                assert_relative_eq!(start, round2(start));
                assert_relative_eq!(end, round2(end));
            }
        }
    }

    #[test]
    fn test_rejects_timestamp_mismatch() {
        let (components, _) = alternating_components(64);
        let attributor = SpeakerAttributor::default();
        let result = attributor.attribute(&components, &[0.0, 0.1], 42);
        assert!(matches!(result, Err(VxError::InvalidInput(_))));
    }

    #[test]
    fn test_every_cluster_label_stays_in_range() {
        let (components, timestamps) = alternating_components(32);
        let attributor = SpeakerAttributor::default();
        // All profiles either detected or sentinel; nothing panics on lookup
        let report = attributor.attribute(&components, &timestamps, 42).unwrap();
        assert!(
            report
                .iter()
                .all(|p| p.time_range.is_detected() || p.time_range == TimeRange::NotDetected)
        );
    }
}
