use crate::constants::{MAX_ANCESTOR_DEPTH, SIGNAL_PERCENT_MAX, SIGNAL_PERCENT_MIN};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which neighbor proportion drives which transition.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackMode {
    /// Neighbors pull a cell towards their own phenotype.
    #[default]
    Positive,
    /// Neighbors push a cell away from their phenotype.
    Negative,
}

/// How a resolved cell is turned into a display color.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Flat phenotype color.
    #[default]
    Inheritance,
    /// Blue-to-yellow ramp on the share of same-phenotype neighbors.
    Similarity,
    /// Blue-to-red ramp on the raw neighbor count, saturating at `max_neighbors`.
    Density,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonyConfig {
    /// Deterministic seed for founder coin flips and phenotype switching.
    pub seed: u64,
    /// Radius of the neighbor-counting circle, in dataset units.
    pub neighbor_radius: f64,
    /// Initial neighbor-influence strength, in percent. Clamped into the signal range.
    pub signal_percent: f64,
    /// Lower bound for raw signal input, in percent.
    pub signal_percent_min: f64,
    /// Upper bound for raw signal input, in percent.
    pub signal_percent_max: f64,
    /// Initial baseline switching rate. Clamped into the alpha range.
    pub alpha: f64,
    /// Lower bound for raw alpha input.
    pub alpha_min: f64,
    /// Upper bound for raw alpha input.
    pub alpha_max: f64,
    /// Polarity of the neighbor influence.
    pub feedback: FeedbackMode,
    /// Display color selection.
    pub color_mode: ColorMode,
    /// Neighbor count at which the density color ramp saturates.
    pub max_neighbors: usize,
    /// Maximum number of halvings tried when looking for a resolved ancestor.
    pub max_ancestor_depth: u32,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            neighbor_radius: 9.0,
            signal_percent: 50.0,
            signal_percent_min: SIGNAL_PERCENT_MIN,
            signal_percent_max: SIGNAL_PERCENT_MAX,
            alpha: 0.01,
            alpha_min: 0.0,
            alpha_max: 1.0,
            feedback: FeedbackMode::Positive,
            color_mode: ColorMode::Inheritance,
            max_neighbors: 60,
            max_ancestor_depth: MAX_ANCESTOR_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("neighbor_radius must be positive and finite")]
    InvalidNeighborRadius,
    #[error("signal_percent_min/signal_percent_max must be finite, ordered, and within [0,100]")]
    InvalidSignalRange,
    #[error("alpha_min/alpha_max must be finite, ordered, and within [0,1]")]
    InvalidAlphaRange,
    #[error("max_neighbors must be positive")]
    InvalidMaxNeighbors,
    #[error("max_ancestor_depth must be within 1..={max}")]
    InvalidMaxAncestorDepth { max: u32 },
}

impl ColonyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.neighbor_radius.is_finite() && self.neighbor_radius > 0.0) {
            return Err(ConfigError::InvalidNeighborRadius);
        }
        if !valid_range(
            self.signal_percent_min,
            self.signal_percent_max,
            SIGNAL_PERCENT_MIN,
            SIGNAL_PERCENT_MAX,
        ) {
            return Err(ConfigError::InvalidSignalRange);
        }
        if !valid_range(self.alpha_min, self.alpha_max, 0.0, 1.0) {
            return Err(ConfigError::InvalidAlphaRange);
        }
        if self.max_neighbors == 0 {
            return Err(ConfigError::InvalidMaxNeighbors);
        }
        if self.max_ancestor_depth == 0 || self.max_ancestor_depth > MAX_ANCESTOR_DEPTH {
            return Err(ConfigError::InvalidMaxAncestorDepth {
                max: MAX_ANCESTOR_DEPTH,
            });
        }
        Ok(())
    }
}

fn valid_range(min: f64, max: f64, lower: f64, upper: f64) -> bool {
    min.is_finite() && max.is_finite() && lower <= min && min <= max && max <= upper
}
