//! Tunables for the rotation bookkeeping.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::RotationError;

/// Thresholds and tick windows used by every policy.
///
/// Missing keys in a configuration file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Angular rate (and momentum) magnitude below which a vehicle counts as
    /// being at rest.
    pub threshold: f64,
    /// Ticks between leaving the cheap regime and reapplying momentum.
    pub reapply_delay_ticks: i32,
    /// Ticks a part's angular velocity clamp stays relaxed.
    pub clamp_relax_ticks: u32,
    /// Factor applied to a part's angular velocity clamp while relaxed.
    pub clamp_scale: f64,
    /// Replacement for zero moment-of-inertia components.
    pub inertia_epsilon: f64,
    /// Relative tolerance under which two vectors are treated as anti-parallel.
    pub antiparallel_tolerance: f64,
    /// Roll output per rpm of spin-rate error.
    pub roll_gain: f64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            reapply_delay_ticks: 3,
            clamp_relax_ticks: 10,
            clamp_scale: 10.0,
            inertia_epsilon: 1e-6,
            antiparallel_tolerance: crate::algebra::DEFAULT_ANTIPARALLEL_TOLERANCE,
            roll_gain: 1.0,
        }
    }
}

impl RotationConfig {
    /// Read a JSON configuration file and validate it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RotationError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RotationError> {
        fn positive(field: &'static str, value: f64) -> Result<(), RotationError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(RotationError::InvalidConfig {
                    field,
                    reason: format!("must be positive, got {value}"),
                })
            }
        }

        positive("threshold", self.threshold)?;
        positive("clamp_scale", self.clamp_scale)?;
        positive("inertia_epsilon", self.inertia_epsilon)?;
        positive("antiparallel_tolerance", self.antiparallel_tolerance)?;
        if !(self.roll_gain.is_finite() && self.roll_gain >= 0.0) {
            return Err(RotationError::InvalidConfig {
                field: "roll_gain",
                reason: format!("must be non-negative, got {}", self.roll_gain),
            });
        }
        if self.reapply_delay_ticks < 1 {
            return Err(RotationError::InvalidConfig {
                field: "reapply_delay_ticks",
                reason: format!("must be at least 1, got {}", self.reapply_delay_ticks),
            });
        }
        Ok(())
    }
}
