//! Configuration errors for prosumer parameter sets.
//!
//! Every check here runs before a model is built, so a malformed scenario
//! fails fast instead of surfacing as an infeasible or unbounded solve.

use thiserror::Error;

/// Errors raised while validating house, attack or PADM parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The horizon has no hours.
    #[error("Configuration error: the planning horizon is empty")]
    EmptyHorizon,

    /// Demand shares and PV availabilities disagree on the horizon length.
    #[error(
        "Configuration error: the length of the demand vector ({demand}) and PV availability vector ({pv}) are not the same"
    )]
    LengthMismatch { demand: usize, pv: usize },

    /// A per-hour attack bound vector does not cover the horizon.
    #[error("Configuration error: {name} has {actual} entries but the horizon has {expected} hours")]
    BoundLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A lower perturbation bound exceeds the upper one.
    #[error("Configuration error: hour {hour} has lb {lb} > ub {ub}")]
    InvalidBounds { hour: usize, lb: f64, ub: f64 },

    /// Bounds must straddle zero so the attacker can both shrink and grow demand.
    #[error("Configuration error: hour {hour} bounds [{lb}, {ub}] do not contain 0")]
    BoundsExcludeZero { hour: usize, lb: f64, ub: f64 },

    /// A value that must be finite is NaN or infinite.
    #[error("Configuration error: {name} must be finite (got {value})")]
    NonFinite { name: String, value: f64 },

    /// A value that must be non-negative is negative.
    #[error("Configuration error: {name} must be non-negative (got {value})")]
    Negative { name: String, value: f64 },

    /// A value that must be strictly positive is not.
    #[error("Configuration error: {name} must be positive (got {value})")]
    NonPositive { name: String, value: f64 },

    /// A PV availability fraction is outside [0, 1].
    #[error("Configuration error: PV availability at hour {hour} is {value}, expected a fraction in [0, 1]")]
    AvailabilityOutOfRange { hour: usize, value: f64 },

    /// PADM tuning knobs are inconsistent.
    #[error("Configuration error: invalid PADM parameters: {0}")]
    Padm(String),
}

/// Convenience alias for validation results.
pub type ConfigResult<T> = Result<T, ConfigError>;

pub(crate) fn check_finite(name: &str, value: f64) -> ConfigResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite {
            name: name.to_string(),
            value,
        })
    }
}

pub(crate) fn check_non_negative(name: &str, value: f64) -> ConfigResult<()> {
    check_finite(name, value)?;
    if value < 0.0 {
        return Err(ConfigError::Negative {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

pub(crate) fn check_positive(name: &str, value: f64) -> ConfigResult<()> {
    check_finite(name, value)?;
    if value <= 0.0 {
        return Err(ConfigError::NonPositive {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_message() {
        let err = ConfigError::LengthMismatch { demand: 24, pv: 23 };
        let msg = err.to_string();
        assert!(msg.contains("(24)"));
        assert!(msg.contains("(23)"));
    }

    #[test]
    fn test_checks() {
        assert!(check_non_negative("price", 0.0).is_ok());
        assert!(matches!(
            check_non_negative("price", -1.0),
            Err(ConfigError::Negative { .. })
        ));
        assert!(matches!(
            check_positive("lifetime", 0.0),
            Err(ConfigError::NonPositive { .. })
        ));
        assert!(matches!(
            check_finite("total", f64::NAN),
            Err(ConfigError::NonFinite { .. })
        ));
    }
}
