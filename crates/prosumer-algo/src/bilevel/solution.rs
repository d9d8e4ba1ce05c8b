//! Result types of the bilevel orchestration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::complementarity::{PairFamily, Reformulation};

/// Hourly dispatch of the prosumer for one demand profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSolution {
    /// Demand the dispatch serves (baseline or perturbed).
    pub demand: Vec<f64>,
    pub pv: Vec<f64>,
    pub soc: Vec<f64>,
    pub battery_in: Vec<f64>,
    pub battery_out: Vec<f64>,
    pub buy: Vec<f64>,
    pub sell: Vec<f64>,
    pub capacity_battery: f64,
    pub capacity_pv: f64,
    /// Primal objective value.
    pub cost: f64,
}

impl DispatchSolution {
    pub fn hours(&self) -> usize {
        self.demand.len()
    }

    /// Largest |supply − demand| over all hours.
    pub fn max_balance_residual(&self) -> f64 {
        (0..self.hours())
            .map(|i| {
                let supply = self.buy[i] - self.sell[i] + self.battery_out[i]
                    - self.battery_in[i]
                    + self.pv[i];
                (supply - self.demand[i]).abs()
            })
            .fold(0.0, f64::max)
    }

    /// Largest violation of the circular battery equation, wraparound included.
    pub fn max_battery_residual(&self) -> f64 {
        let hours = self.hours();
        (0..hours)
            .map(|i| {
                let prev = (i + hours - 1) % hours;
                (self.soc[prev] + self.battery_in[i] - self.battery_out[i] - self.soc[i]).abs()
            })
            .fold(0.0, f64::max)
    }

    /// Net energy drawn from the grid per hour.
    pub fn net_import(&self) -> Vec<f64> {
        self.buy.iter().zip(&self.sell).map(|(b, s)| b - s).collect()
    }
}

/// Relative gap `|primal − dual| / |primal|`, guarded against zero cost.
pub fn relative_gap(primal: f64, dual: f64) -> f64 {
    (primal - dual).abs() / primal.abs().max(1e-9)
}

/// Output of [`AttackOrchestrator::solve_baseline`](super::AttackOrchestrator::solve_baseline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineOutcome {
    pub dispatch: DispatchSolution,
    pub primal_objective: f64,
    pub dual_objective: f64,
    /// Relative primal-dual gap; zero up to solver tolerance.
    pub duality_gap: f64,
    pub solve_time: Duration,
}

/// Optimal dual multipliers of the unperturbed dispatch LP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualBaselineOutcome {
    pub objective: f64,
    pub lambda_demand: Vec<f64>,
    pub lambda_battery: Vec<f64>,
    pub mu_limit_pv: Vec<f64>,
    pub mu_limit_battery: Vec<f64>,
}

/// Values of one complementarity pair in a solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairResidual {
    pub family: PairFamily,
    /// `None` for the scalar capacity pairs.
    pub hour: Option<usize>,
    pub activity: f64,
    pub slack: f64,
}

impl PairResidual {
    /// `min(activity, slack)`; zero when complementarity holds.
    pub fn residual(&self) -> f64 {
        self.activity.min(self.slack).max(0.0)
    }
}

/// Complementarity of every pair in a solution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplementarityReport {
    pub pairs: Vec<PairResidual>,
    pub max_violation: f64,
}

impl ComplementarityReport {
    pub fn new(pairs: Vec<PairResidual>) -> Self {
        let max_violation = pairs.iter().map(PairResidual::residual).fold(0.0, f64::max);
        Self {
            pairs,
            max_violation,
        }
    }

    /// Pair with the largest residual.
    pub fn worst(&self) -> Option<&PairResidual> {
        self.pairs
            .iter()
            .max_by(|a, b| a.residual().total_cmp(&b.residual()))
    }

    pub fn is_satisfied(&self, tol: f64) -> bool {
        self.max_violation <= tol
    }
}

/// Which member of a big-M pair came close to the constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BigMSide {
    Activity,
    Slack,
}

/// A pair whose value sits at the big-M bound; the optimum may be cut off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BigMWarning {
    pub family: PairFamily,
    pub hour: Option<usize>,
    pub side: BigMSide,
    pub value: f64,
    pub m: f64,
}

/// Output of the exact single-level reformulations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub reformulation: Reformulation,
    /// Dispatch before the attack (zero perturbation).
    pub baseline: DispatchSolution,
    /// Dispatch under the optimal perturbation.
    pub attacked: DispatchSolution,
    pub delta: Vec<f64>,
    /// Attacker objective (Σ|delta| or Σ delta²).
    pub upper_objective: f64,
    pub primal_objective: f64,
    pub dual_objective: f64,
    pub duality_gap: f64,
    pub complementarity: ComplementarityReport,
    pub big_m_warnings: Vec<BigMWarning>,
    /// Per-hour perturbation bounds used by the valid inequality.
    pub valid_inequality_bounds: Option<Vec<f64>>,
    /// Relaxations solved by the backend.
    pub nodes: usize,
    pub solve_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch() -> DispatchSolution {
        DispatchSolution {
            demand: vec![10.0, 10.0],
            pv: vec![0.0, 4.0],
            soc: vec![2.0, 0.0],
            battery_in: vec![2.0, 0.0],
            battery_out: vec![0.0, 2.0],
            buy: vec![12.0, 4.0],
            sell: vec![0.0, 0.0],
            capacity_battery: 2.0,
            capacity_pv: 4.0,
            cost: 0.0,
        }
    }

    #[test]
    fn test_residuals_of_consistent_dispatch() {
        let d = dispatch();
        assert_eq!(d.max_balance_residual(), 0.0);
        assert_eq!(d.max_battery_residual(), 0.0);
        assert_eq!(d.net_import(), vec![12.0, 4.0]);
    }

    #[test]
    fn test_battery_residual_sees_wraparound() {
        let mut d = dispatch();
        // Hour 0 starts from soc[H−1].
        d.soc[1] = 1.0;
        assert_eq!(d.max_battery_residual(), 1.0);
    }

    #[test]
    fn test_report_tracks_worst_pair() {
        let report = ComplementarityReport::new(vec![
            PairResidual {
                family: PairFamily::Buy,
                hour: Some(0),
                activity: 3.0,
                slack: 0.0,
            },
            PairResidual {
                family: PairFamily::Sell,
                hour: Some(1),
                activity: 0.5,
                slack: 0.2,
            },
        ]);
        assert_eq!(report.max_violation, 0.2);
        assert_eq!(report.worst().unwrap().family, PairFamily::Sell);
        assert!(!report.is_satisfied(1e-6));
    }

    #[test]
    fn test_relative_gap_guards_zero_cost() {
        assert_eq!(relative_gap(0.0, 0.0), 0.0);
        assert!((relative_gap(100.0, 99.0) - 0.01).abs() < 1e-12);
    }
}
