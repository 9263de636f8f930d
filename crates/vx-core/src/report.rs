//! Speaker analysis report

use serde::{Deserialize, Serialize};

/// Active time interval of a speaker, in seconds
///
/// `NotDetected` is the defined outcome for a speaker whose cluster
/// received zero frames; it is not an error condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimeRange {
    /// First and last frame timestamp assigned to the speaker
    Detected { start: f64, end: f64 },
    /// No frames were attributed to the speaker
    NotDetected,
}

impl TimeRange {
    /// Start time in seconds, if detected
    pub fn start(&self) -> Option<f64> {
        match self {
            TimeRange::Detected { start, .. } => Some(*start),
            TimeRange::NotDetected => None,
        }
    }

    /// End time in seconds, if detected
    pub fn end(&self) -> Option<f64> {
        match self {
            TimeRange::Detected { end, .. } => Some(*end),
            TimeRange::NotDetected => None,
        }
    }

    /// Whether any frames were attributed
    pub fn is_detected(&self) -> bool {
        matches!(self, TimeRange::Detected { .. })
    }
}

/// One row of the speaker report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerProfile {
    /// Display label ("Speaker 1", "Speaker 2", ...)
    pub speaker: String,
    /// Share of the grand total absolute energy, in percent
    pub energy_pct: f64,
    /// Active time interval, or the not-detected sentinel
    pub time_range: TimeRange,
}

impl SpeakerProfile {
    /// Build the profile for zero-based component `index`
    pub fn new(index: usize, energy_pct: f64, time_range: TimeRange) -> Self {
        Self {
            speaker: format!("Speaker {}", index + 1),
            energy_pct,
            time_range,
        }
    }
}

/// Ordered collection of speaker profiles, one per estimated speaker
///
/// This is the artifact handed to persistence and visualization
/// collaborators; it is an immutable snapshot of the pipeline result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerReport {
    profiles: Vec<SpeakerProfile>,
}

impl SpeakerReport {
    /// Create a report from ordered profiles
    pub fn new(profiles: Vec<SpeakerProfile>) -> Self {
        Self { profiles }
    }

    /// Number of speakers
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profile at `index`
    pub fn get(&self, index: usize) -> Option<&SpeakerProfile> {
        self.profiles.get(index)
    }

    /// Iterate profiles in speaker order
    pub fn iter(&self) -> impl Iterator<Item = &SpeakerProfile> {
        self.profiles.iter()
    }

    /// Sum of all energy percentages
    ///
    /// 100 (within floating-point tolerance) whenever the grand total
    /// energy was non-zero, 0 otherwise.
    pub fn total_energy_pct(&self) -> f64 {
        self.profiles.iter().map(|p| p.energy_pct).sum()
    }
}

impl<'a> IntoIterator for &'a SpeakerReport {
    type Item = &'a SpeakerProfile;
    type IntoIter = std::slice::Iter<'a, SpeakerProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}
