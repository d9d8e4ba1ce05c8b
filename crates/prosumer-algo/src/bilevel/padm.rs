//! Penalty alternating direction method (PADM).
//!
//! Exact complementarity is replaced by a penalty on the primal-dual gap
//! `primal_cost − dual_objective`, which is non-negative for every
//! primal/dual feasible pair at the same perturbation and zero exactly at
//! the lower-level optimum. The bilinear dual objective is handled by
//! alternating two blocks:
//!
//! 1. duals pinned, solve for the primal dispatch and the perturbation;
//! 2. primal dispatch and perturbation pinned, solve for the duals.
//!
//! Inner iterations stop once no variable moves by more than
//! `stationary_error`; the outer loop then either accepts the point
//! (relative gap below `penalty_error`) or multiplies the penalty weight.
//! There is no convergence guarantee, so a run that exhausts the outer cap
//! is reported with [`PadmTermination::OuterLimit`] and its achieved gap.

use std::fmt;
use std::time::{Duration, Instant};

use prosumer_core::{AttackParameters, HouseParameters, ObjectiveNorm, PadmParameters};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{AttackError, SolveStage};
use super::model::HouseModel;
use super::orchestrator::{check_support, solve_stage};
use super::solution::{relative_gap, DispatchSolution};
use super::upper::AbsEncoding;
use crate::solver::{Assignment, MilpBackend, Sense, SolverConfig};

/// Phases of the PADM state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadmState {
    Init,
    InnerIterate,
    InnerConverged,
    OuterCheck,
    PenaltyIncrease,
    Done,
}

impl fmt::Display for PadmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PadmState::Init => "init",
            PadmState::InnerIterate => "inner-iterate",
            PadmState::InnerConverged => "inner-converged",
            PadmState::OuterCheck => "outer-check",
            PadmState::PenaltyIncrease => "penalty-increase",
            PadmState::Done => "done",
        };
        f.write_str(name)
    }
}

/// How a PADM run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadmTermination {
    /// Relative duality gap fell below `penalty_error`.
    Converged,
    /// `max_outer_iter` reached first; the point is a best effort.
    OuterLimit,
}

impl fmt::Display for PadmTermination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PadmTermination::Converged => write!(f, "converged"),
            PadmTermination::OuterLimit => write!(f, "outer iteration limit"),
        }
    }
}

/// One inner iteration of the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadmIterate {
    pub outer: usize,
    pub inner: usize,
    pub mu: f64,
    pub stationarity: f64,
    pub primal_objective: f64,
    pub dual_objective: f64,
    pub upper_objective: f64,
}

/// Final point of a PADM run with its quality measures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PadmOutcome {
    pub termination: PadmTermination,
    pub converged: bool,
    pub outer_iterations: usize,
    /// Inner iterations summed over all outer iterations.
    pub inner_iterations: usize,
    /// Penalty weight at termination.
    pub mu: f64,
    /// Largest component change in the last inner iteration.
    pub stationarity: f64,
    pub duality_gap: f64,
    pub primal_objective: f64,
    pub dual_objective: f64,
    /// Σ|delta| of the final point.
    pub upper_objective: f64,
    pub delta: Vec<f64>,
    pub dispatch: DispatchSolution,
    pub history: Vec<PadmIterate>,
    pub solve_time: Duration,
}

/// Runs PADM on a fresh [`HouseModel`].
pub struct PadmSolver<'a> {
    house: &'a HouseParameters,
    attack: &'a AttackParameters,
    params: &'a PadmParameters,
    backend: &'a dyn MilpBackend,
    config: &'a SolverConfig,
}

impl<'a> PadmSolver<'a> {
    pub fn new(
        house: &'a HouseParameters,
        attack: &'a AttackParameters,
        params: &'a PadmParameters,
        backend: &'a dyn MilpBackend,
        config: &'a SolverConfig,
    ) -> Self {
        Self {
            house,
            attack,
            params,
            backend,
            config,
        }
    }

    pub fn run(&self) -> Result<PadmOutcome, AttackError> {
        let start = Instant::now();
        let params = self.params;
        let mut hm = HouseModel::build("padm", self.house, self.attack, AbsEncoding::Binary);
        check_support(self.backend, &hm.model)?;

        let mut current = self.initial_point(&mut hm)?;
        debug!(from = %PadmState::Init, to = %PadmState::InnerIterate, "PADM transition");

        let mut state = PadmState::InnerIterate;
        let mut mu = params.initial_mu;
        let mut outer = 0;
        let mut inner = 0;
        let mut inner_total = 0;
        let mut stationarity = f64::INFINITY;
        let mut duality_gap = f64::INFINITY;
        let mut termination = PadmTermination::OuterLimit;
        let mut history = Vec::new();

        while state != PadmState::Done {
            let next = match state {
                PadmState::Init | PadmState::InnerIterate => {
                    let after_primal = self.primal_step(&mut hm, &current, mu)?;
                    let after_dual = self.dual_step(&mut hm, &after_primal, mu)?;
                    stationarity = max_change(current.values(), after_dual.values());
                    current = after_dual;
                    inner += 1;
                    inner_total += 1;

                    let iterate = PadmIterate {
                        outer: outer + 1,
                        inner,
                        mu,
                        stationarity,
                        primal_objective: hm.primal_objective(&current),
                        dual_objective: hm.dual_objective(&current),
                        upper_objective: hm.total_deviation(&current),
                    };
                    debug!(
                        outer = iterate.outer,
                        inner,
                        mu,
                        stationarity,
                        primal = iterate.primal_objective,
                        dual = iterate.dual_objective,
                        upper = iterate.upper_objective,
                        "PADM inner iteration"
                    );
                    history.push(iterate);

                    if stationarity < params.stationary_error || inner >= params.max_stationary_iter {
                        PadmState::InnerConverged
                    } else {
                        PadmState::InnerIterate
                    }
                }
                PadmState::InnerConverged => {
                    if stationarity >= params.stationary_error {
                        warn!(
                            inner,
                            stationarity, "PADM inner loop hit its iteration cap before stationarity"
                        );
                    }
                    PadmState::OuterCheck
                }
                PadmState::OuterCheck => {
                    outer += 1;
                    duality_gap =
                        relative_gap(hm.primal_objective(&current), hm.dual_objective(&current));
                    if duality_gap < params.penalty_error {
                        termination = PadmTermination::Converged;
                        PadmState::Done
                    } else if outer >= params.max_outer_iter {
                        termination = PadmTermination::OuterLimit;
                        PadmState::Done
                    } else {
                        PadmState::PenaltyIncrease
                    }
                }
                PadmState::PenaltyIncrease => {
                    mu *= params.increase_factor;
                    inner = 0;
                    PadmState::InnerIterate
                }
                PadmState::Done => PadmState::Done,
            };
            if next != state {
                debug!(from = %state, to = %next, outer, mu, duality_gap, "PADM transition");
            }
            state = next;
        }

        let point = current;
        let delta = hm.delta_values(&point);
        let dispatch = hm
            .primal
            .extract(&point, self.house.perturbed_demand(&delta));
        let outcome = PadmOutcome {
            termination,
            converged: termination == PadmTermination::Converged,
            outer_iterations: outer,
            inner_iterations: inner_total,
            mu,
            stationarity,
            duality_gap,
            primal_objective: hm.primal_objective(&point),
            dual_objective: hm.dual_objective(&point),
            upper_objective: hm.total_deviation(&point),
            delta,
            dispatch,
            history,
            solve_time: start.elapsed(),
        };

        match termination {
            PadmTermination::Converged => info!(
                outer,
                inner = inner_total,
                gap = duality_gap,
                upper = outcome.upper_objective,
                "PADM converged"
            ),
            PadmTermination::OuterLimit => warn!(
                outer,
                gap = duality_gap,
                stationarity,
                upper = outcome.upper_objective,
                "PADM stopped at the outer iteration limit"
            ),
        }
        Ok(outcome)
    }

    /// Upper-level optimum over primal and dual feasibility, no coupling.
    fn initial_point(&self, hm: &mut HouseModel) -> Result<Assignment, AttackError> {
        hm.upper.set_objective(&mut hm.model, ObjectiveNorm::L1);
        let solved = solve_stage(self.backend, self.config, &hm.model, SolveStage::PadmInit)?;
        Ok(solved.assignment)
    }

    /// Duals pinned; the dual objective is linear in delta.
    fn primal_step(
        &self,
        hm: &mut HouseModel,
        current: &Assignment,
        mu: f64,
    ) -> Result<Assignment, AttackError> {
        let gap = hm.primal.cost().clone()
            - hm.dual.objective_given_duals(current, &hm.upper.delta);
        hm.model
            .set_objective(Sense::Minimize, -hm.upper.total_deviation() + gap * mu);

        let duals = hm.dual.variables();
        let pinned = hm.model.pin(&duals, &current.values_of(&duals));
        let solved = solve_stage(self.backend, self.config, &pinned, SolveStage::PadmPrimalStep)?;
        Ok(solved.assignment)
    }

    /// Primal and upper level pinned; the dual objective is linear in the duals.
    fn dual_step(
        &self,
        hm: &mut HouseModel,
        current: &Assignment,
        mu: f64,
    ) -> Result<Assignment, AttackError> {
        let delta = hm.delta_values(current);
        let gap = hm.primal.cost().clone() - hm.dual.objective_at(&delta);
        hm.model
            .set_objective(Sense::Minimize, -hm.upper.total_deviation() + gap * mu);

        let mut fixed = hm.primal.variables();
        fixed.extend(hm.upper.variables());
        let pinned = hm.model.pin(&fixed, &current.values_of(&fixed));
        let solved = solve_stage(self.backend, self.config, &pinned, SolveStage::PadmDualStep)?;
        Ok(solved.assignment)
    }
}

fn max_change(before: &[f64], after: &[f64]) -> f64 {
    before
        .iter()
        .zip(after)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}
