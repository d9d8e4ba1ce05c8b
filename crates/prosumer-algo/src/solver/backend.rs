//! Backend trait and solve results.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::Assignment;

/// Outcome class of a single solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Proven optimal within tolerances.
    Optimal,
    /// No feasible point exists.
    Infeasible,
    /// Objective is unbounded in the optimization direction.
    Unbounded,
    /// Time or node limit reached; an incumbent may be attached.
    TimeLimited,
    /// The engine reported numerical trouble.
    NumericalError,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::Unbounded => write!(f, "unbounded"),
            SolveStatus::TimeLimited => write!(f, "time_limited"),
            SolveStatus::NumericalError => write!(f, "numerical_error"),
        }
    }
}

/// Result of [`MilpBackend::solve`].
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub status: SolveStatus,
    /// Optimal point, or the best incumbent when `TimeLimited`.
    pub assignment: Option<Assignment>,
    /// Relaxations solved (1 for a plain LP).
    pub nodes: usize,
    pub elapsed: Duration,
}

impl SolveReport {
    pub fn without_solution(status: SolveStatus, nodes: usize, elapsed: Duration) -> Self {
        Self {
            status,
            assignment: None,
            nodes,
            elapsed,
        }
    }

    /// Values of an optimal solve; any other status is handed back as `Err`.
    pub fn into_optimal(self) -> Result<Assignment, SolveReport> {
        match (self.status, self.assignment) {
            (SolveStatus::Optimal, Some(assignment)) => Ok(assignment),
            (status, assignment) => Err(SolveReport {
                status,
                assignment,
                nodes: self.nodes,
                elapsed: self.elapsed,
            }),
        }
    }

    /// Objective of the attached assignment, if any.
    pub fn incumbent_objective(&self) -> Option<f64> {
        self.assignment.as_ref().map(Assignment::objective)
    }
}

/// Limits and tolerances passed to backend solvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock limit for one solve, in seconds.
    pub timeout_seconds: Option<u64>,
    /// Maximum number of branching nodes.
    pub max_nodes: usize,
    /// Tolerance for rows whose variables are all fixed.
    pub feasibility_tol: f64,
    /// Magnitude below which an SOS1 member counts as zero.
    pub sos_tol: f64,
    /// Distance to the nearest integer tolerated for a binary.
    pub integrality_tol: f64,
    /// Relative improvement required to replace an incumbent.
    pub optimality_tol: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            max_nodes: 200_000,
            feasibility_tol: 1e-6,
            sos_tol: 1e-7,
            integrality_tol: 1e-6,
            optimality_tol: 1e-9,
        }
    }
}

impl SolverConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// Model features a backend can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCapabilities {
    pub binary: bool,
    pub sos1: bool,
    pub quadratic_objective: bool,
}

/// Errors that prevent a backend from producing a [`SolveReport`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// The model uses a feature the backend cannot handle.
    #[error("backend '{backend}' does not support {feature}")]
    Unsupported {
        backend: String,
        feature: &'static str,
    },

    /// The requested engine was not compiled into this build.
    #[error("solver engine '{0}' is not available in this build")]
    Unavailable(&'static str),
}

/// Implements the actual solving of a [`Model`](super::Model).
///
/// Solver statuses (infeasible, unbounded, limits) are reported through
/// [`SolveReport::status`]; `Err` is reserved for models the backend cannot
/// process at all.
pub trait MilpBackend: Send + Sync {
    /// Unique identifier (e.g., "good_lp-microlp")
    fn id(&self) -> &str;

    fn capabilities(&self) -> BackendCapabilities;

    fn solve(
        &self,
        model: &super::Model,
        config: &SolverConfig,
    ) -> Result<SolveReport, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_is_object_safe() {
        fn _accepts_backend(_b: &dyn MilpBackend) {}
    }

    #[test]
    fn test_trait_objects_are_send_sync() {
        fn _assert_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_send_sync::<dyn MilpBackend>();
    }

    #[test]
    fn test_into_optimal_requires_optimal_status() {
        let report = SolveReport {
            status: SolveStatus::TimeLimited,
            assignment: Some(Assignment::new(vec![1.0], 4.0)),
            nodes: 10,
            elapsed: Duration::from_millis(5),
        };
        let rejected = report.into_optimal().unwrap_err();
        assert_eq!(rejected.status, SolveStatus::TimeLimited);
        assert_eq!(rejected.incumbent_objective(), Some(4.0));

        let report = SolveReport {
            status: SolveStatus::Optimal,
            assignment: Some(Assignment::new(vec![2.0], 2.0)),
            nodes: 1,
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.into_optimal().unwrap().objective(), 2.0);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SolveStatus::TimeLimited.to_string(), "time_limited");
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: SolverConfig = serde_json::from_str(r#"{"timeout_seconds": 30}"#).unwrap();
        assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
        assert_eq!(config.max_nodes, SolverConfig::default().max_nodes);
    }
}
