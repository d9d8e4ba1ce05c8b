//! Errors raised while building or solving the bilevel models.

use std::fmt;

use prosumer_core::ConfigError;
use thiserror::Error;

use crate::solver::{BackendError, SolveReport, SolveStatus};

/// Which solve inside an orchestration call produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveStage {
    /// Primal dispatch LP with zero perturbation.
    Baseline,
    /// Dual LP with zero perturbation.
    DualBaseline,
    /// Auxiliary LP bounding the perturbation of one hour.
    ValidInequality { hour: usize },
    /// Single-level KKT reformulation.
    Attack,
    /// PADM start point without complementarity.
    PadmInit,
    /// PADM step with the duals pinned.
    PadmPrimalStep,
    /// PADM step with primal and upper level pinned.
    PadmDualStep,
}

impl fmt::Display for SolveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStage::Baseline => write!(f, "baseline"),
            SolveStage::DualBaseline => write!(f, "dual baseline"),
            SolveStage::ValidInequality { hour } => write!(f, "valid-inequality bound (hour {hour})"),
            SolveStage::Attack => write!(f, "attack"),
            SolveStage::PadmInit => write!(f, "PADM init"),
            SolveStage::PadmPrimalStep => write!(f, "PADM primal step"),
            SolveStage::PadmDualStep => write!(f, "PADM dual step"),
        }
    }
}

/// Failure of an [`AttackOrchestrator`](super::AttackOrchestrator) operation.
#[derive(Debug, Error)]
pub enum AttackError {
    /// Input parameters failed validation.
    #[error("invalid parameters: {0}")]
    Config(#[from] ConfigError),

    /// The big-M constant must be positive and finite.
    #[error("big-M constant must be positive and finite (got {0})")]
    InvalidBigM(f64),

    /// The model has no feasible point.
    #[error("{stage} model is infeasible")]
    Infeasible { stage: SolveStage },

    /// The objective is unbounded.
    #[error("{stage} model is unbounded")]
    Unbounded { stage: SolveStage },

    /// A time or node limit stopped the solve before optimality was proven.
    #[error("{stage} solve stopped at its limit after {nodes} nodes (best objective: {best:?})")]
    TimeLimited {
        stage: SolveStage,
        best: Option<f64>,
        nodes: usize,
    },

    /// Any other non-optimal status.
    #[error("{stage} solve failed with status {status}")]
    SolverFailed { stage: SolveStage, status: SolveStatus },

    /// The backend could not process the model.
    #[error("{stage} solve rejected by backend: {source}")]
    Backend {
        stage: SolveStage,
        #[source]
        source: BackendError,
    },

    /// The requested combination of options is not available.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),
}

impl AttackError {
    /// Maps a non-optimal report to the matching variant.
    pub(crate) fn from_report(stage: SolveStage, report: &SolveReport) -> Self {
        match report.status {
            SolveStatus::Infeasible => AttackError::Infeasible { stage },
            SolveStatus::Unbounded => AttackError::Unbounded { stage },
            SolveStatus::TimeLimited => AttackError::TimeLimited {
                stage,
                best: report.incumbent_objective(),
                nodes: report.nodes,
            },
            status => AttackError::SolverFailed { stage, status },
        }
    }

    /// Stage of the failing solve, if the error came from one.
    pub fn stage(&self) -> Option<SolveStage> {
        match self {
            AttackError::Infeasible { stage }
            | AttackError::Unbounded { stage }
            | AttackError::TimeLimited { stage, .. }
            | AttackError::SolverFailed { stage, .. }
            | AttackError::Backend { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Assignment;
    use std::time::Duration;

    #[test]
    fn test_from_report_keeps_incumbent() {
        let report = SolveReport {
            status: SolveStatus::TimeLimited,
            assignment: Some(Assignment::new(vec![], 3.2)),
            nodes: 17,
            elapsed: Duration::from_secs(1),
        };
        let err = AttackError::from_report(SolveStage::Attack, &report);
        assert!(matches!(
            err,
            AttackError::TimeLimited {
                best: Some(b),
                nodes: 17,
                ..
            } if b == 3.2
        ));
        assert_eq!(err.stage(), Some(SolveStage::Attack));
    }

    #[test]
    fn test_display_names_stage() {
        let err = AttackError::Infeasible {
            stage: SolveStage::ValidInequality { hour: 4 },
        };
        assert_eq!(
            err.to_string(),
            "valid-inequality bound (hour 4) model is infeasible"
        );
        assert_eq!(AttackError::InvalidBigM(0.0).stage(), None);
    }
}
