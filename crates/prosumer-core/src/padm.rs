//! Tuning knobs of the penalty alternating direction method.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// PADM configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadmParameters {
    /// Penalty weight on the primal-dual gap in the first outer iteration.
    pub initial_mu: f64,

    /// Factor applied to the penalty weight after each unsuccessful outer check.
    ///
    /// Must be greater than one.
    pub increase_factor: f64,

    /// Maximum number of outer (penalty) iterations.
    pub max_outer_iter: usize,

    /// Maximum number of inner (block-coordinate) iterations per outer iteration.
    pub max_stationary_iter: usize,

    /// Inner loop stops once no variable moved by more than this amount.
    pub stationary_error: f64,

    /// Outer loop stops once the relative duality gap is below this value.
    pub penalty_error: f64,
}

impl Default for PadmParameters {
    fn default() -> Self {
        Self {
            initial_mu: 1.0,
            increase_factor: 10.0,
            max_outer_iter: 20,
            max_stationary_iter: 50,
            stationary_error: 1e-5,
            penalty_error: 1e-4,
        }
    }
}

impl PadmParameters {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.initial_mu.is_finite() && self.initial_mu > 0.0) {
            return Err(ConfigError::Padm(format!(
                "initial_mu must be positive (got {})",
                self.initial_mu
            )));
        }
        if !(self.increase_factor.is_finite() && self.increase_factor > 1.0) {
            return Err(ConfigError::Padm(format!(
                "increase_factor must be greater than 1 (got {})",
                self.increase_factor
            )));
        }
        if self.max_outer_iter == 0 || self.max_stationary_iter == 0 {
            return Err(ConfigError::Padm("iteration caps must be at least 1".into()));
        }
        if !(self.stationary_error > 0.0 && self.penalty_error > 0.0) {
            return Err(ConfigError::Padm("tolerances must be positive".into()));
        }
        Ok(())
    }
}
