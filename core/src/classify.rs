//! Macro-state classification of a snapshot.

use serde::{Deserialize, Serialize};

use crate::{
    error::{SimError, SimResult},
    state::Snapshot,
    types::SiteCount,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroState {
    /// Methylated fraction above the high threshold.
    High,
    /// Unmethylated fraction above the low threshold.
    Low,
    /// Not strictly low, but methylated fraction below the secondary threshold.
    MostlyLow,
    Mixed,
}

/// Thresholds are fractions of the population and compare strictly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    pub high_threshold: f64,
    pub low_threshold: f64,
    pub secondary_threshold: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            high_threshold: 0.7,
            low_threshold: 0.7,
            secondary_threshold: 0.3,
        }
    }
}

impl Classifier {
    pub fn validate(&self) -> SimResult<()> {
        for (name, value) in [
            ("high_threshold", self.high_threshold),
            ("low_threshold", self.low_threshold),
            ("secondary_threshold", self.secondary_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::config(format!("{name} must lie in [0, 1], got {value}")));
            }
        }
        Ok(())
    }

    pub fn classify(&self, snapshot: &Snapshot, population: SiteCount) -> MacroState {
        if snapshot.methylated_fraction(population) > self.high_threshold {
            MacroState::High
        } else if snapshot.unmethylated_fraction(population) > self.low_threshold {
            MacroState::Low
        } else if snapshot.methylated_fraction(population) < self.secondary_threshold {
            MacroState::MostlyLow
        } else {
            MacroState::Mixed
        }
    }
}

/// Direction a switching run is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards the methylated state (+1).
    Methylated,
    /// Towards the unmethylated state (-1).
    #[default]
    Unmethylated,
}

impl Direction {
    pub fn sign(&self) -> i8 {
        match self {
            Self::Methylated => 1,
            Self::Unmethylated => -1,
        }
    }

    pub fn from_sign(sign: i8) -> SimResult<Self> {
        match sign {
            1 => Ok(Self::Methylated),
            -1 => Ok(Self::Unmethylated),
            other => Err(SimError::config(format!("switch direction must be 1 or -1, got {other}"))),
        }
    }
}

/// When a switching-time run counts as switched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchTarget {
    pub direction: Direction,
    classifier: Classifier,
    accept_mostly_low: bool,
}

impl SwitchTarget {
    /// With a secondary threshold, a run towards the unmethylated state
    /// also counts as switched once it is only mostly low.
    pub fn new(direction: Direction, classifier: Classifier, secondary: Option<f64>) -> SimResult<Self> {
        let mut classifier = classifier;
        if let Some(threshold) = secondary {
            classifier.secondary_threshold = threshold;
        }
        classifier.validate()?;
        Ok(Self {
            direction,
            classifier,
            accept_mostly_low: secondary.is_some(),
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn reached(&self, snapshot: &Snapshot, population: SiteCount) -> bool {
        match (self.direction, self.classifier.classify(snapshot, population)) {
            (Direction::Methylated, MacroState::High) => true,
            (Direction::Unmethylated, MacroState::Low) => true,
            (Direction::Unmethylated, MacroState::MostlyLow) => self.accept_mostly_low,
            _ => false,
        }
    }
}
