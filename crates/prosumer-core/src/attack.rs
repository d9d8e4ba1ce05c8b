//! Attacker bounds and objective selection.

use serde::{Deserialize, Serialize};

use crate::error::{check_finite, check_non_negative, ConfigError, ConfigResult};

/// A per-hour bound given either once for the whole horizon or hour by hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HourlyBound {
    /// Same value for every hour.
    Uniform(f64),
    /// One value per hour.
    PerHour(Vec<f64>),
}

impl HourlyBound {
    /// Value at `hour`. Callers validate the length first.
    pub fn at(&self, hour: usize) -> f64 {
        match self {
            HourlyBound::Uniform(v) => *v,
            HourlyBound::PerHour(values) => values[hour],
        }
    }

    /// Expands the bound to a vector of `hours` values.
    pub fn expand(&self, hours: usize) -> Vec<f64> {
        (0..hours).map(|i| self.at(i)).collect()
    }

    fn check_len(&self, name: &'static str, hours: usize) -> ConfigResult<()> {
        match self {
            HourlyBound::PerHour(values) if values.len() != hours => Err(ConfigError::BoundLength {
                name,
                expected: hours,
                actual: values.len(),
            }),
            _ => Ok(()),
        }
    }
}

impl From<f64> for HourlyBound {
    fn from(value: f64) -> Self {
        HourlyBound::Uniform(value)
    }
}

impl From<Vec<f64>> for HourlyBound {
    fn from(values: Vec<f64>) -> Self {
        HourlyBound::PerHour(values)
    }
}

/// Norm of the attacker's deviation objective.
///
/// Serialized as the integer `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ObjectiveNorm {
    /// Σ |delta|, keeps the model linear.
    #[default]
    L1,
    /// Σ delta², a quadratic objective.
    L2,
}

impl TryFrom<u8> for ObjectiveNorm {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ObjectiveNorm::L1),
            2 => Ok(ObjectiveNorm::L2),
            other => Err(format!("unsupported objective norm {other}; expected 1 or 2")),
        }
    }
}

impl From<ObjectiveNorm> for u8 {
    fn from(norm: ObjectiveNorm) -> Self {
        match norm {
            ObjectiveNorm::L1 => 1,
            ObjectiveNorm::L2 => 2,
        }
    }
}

/// Parameters of the demand-perturbing attacker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackParameters {
    /// Lower bound on the hourly perturbation fraction (≤ 0).
    pub lb: HourlyBound,
    /// Upper bound on the hourly perturbation fraction (≥ 0).
    pub ub: HourlyBound,
    /// Installed PV capacity, if fixed instead of chosen by the prosumer.
    pub capacity_pv: Option<f64>,
    /// Installed battery capacity, if fixed instead of chosen by the prosumer.
    pub capacity_battery: Option<f64>,
    /// Deviation norm maximized by the attacker.
    pub norm: ObjectiveNorm,
    /// Upper bound on Σ |delta|.
    pub total_delta_ub: Option<f64>,
}

impl Default for AttackParameters {
    fn default() -> Self {
        Self {
            lb: HourlyBound::Uniform(-1.0),
            ub: HourlyBound::Uniform(1.0),
            capacity_pv: None,
            capacity_battery: None,
            norm: ObjectiveNorm::L1,
            total_delta_ub: None,
        }
    }
}

impl AttackParameters {
    /// Symmetric-or-not scalar bounds with everything else at its default.
    pub fn bounded(lb: f64, ub: f64) -> Self {
        Self {
            lb: HourlyBound::Uniform(lb),
            ub: HourlyBound::Uniform(ub),
            ..Self::default()
        }
    }

    /// Attacker that cannot move demand at all.
    pub fn no_attack() -> Self {
        Self::bounded(0.0, 0.0)
    }

    pub fn lower(&self, hour: usize) -> f64 {
        self.lb.at(hour)
    }

    pub fn upper(&self, hour: usize) -> f64 {
        self.ub.at(hour)
    }

    /// Checks bound lengths and ordering for a horizon of `hours`.
    pub fn validate(&self, hours: usize) -> ConfigResult<()> {
        self.lb.check_len("lb", hours)?;
        self.ub.check_len("ub", hours)?;

        for hour in 0..hours {
            let (lb, ub) = (self.lower(hour), self.upper(hour));
            check_finite(&format!("lb[{hour}]"), lb)?;
            check_finite(&format!("ub[{hour}]"), ub)?;
            if lb > ub {
                return Err(ConfigError::InvalidBounds { hour, lb, ub });
            }
            if lb > 0.0 || ub < 0.0 {
                return Err(ConfigError::BoundsExcludeZero { hour, lb, ub });
            }
        }

        if let Some(cap) = self.capacity_pv {
            check_non_negative("capacity_pv", cap)?;
        }
        if let Some(cap) = self.capacity_battery {
            check_non_negative("capacity_battery", cap)?;
        }
        if let Some(budget) = self.total_delta_ub {
            check_non_negative("total_delta_ub", budget)?;
        }
        Ok(())
    }
}
