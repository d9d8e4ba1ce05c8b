//! Public entry points of the attack analysis.

use std::sync::Arc;
use std::time::Instant;

use prosumer_core::{AttackParameters, HouseParameters, ObjectiveNorm, PadmParameters};
use tracing::{debug, info, warn};

use super::complementarity::{add_valid_inequality, Complementarity, Reformulation};
use super::dual::DualModel;
use super::error::{AttackError, SolveStage};
use super::model::HouseModel;
use super::padm::{PadmOutcome, PadmSolver};
use super::primal::{Perturbation, PrimalDispatch};
use super::solution::{relative_gap, AttackOutcome, BaselineOutcome, DualBaselineOutcome};
use super::upper::{AbsEncoding, UpperLevel};
use crate::solver::{Assignment, GoodLpBackend, MilpBackend, Model, Sense, SolverConfig};

/// An optimal assignment with its branching node count.
pub(crate) struct Solved {
    pub assignment: Assignment,
    pub nodes: usize,
}

/// Rejects a model that uses features `backend` does not advertise.
pub(crate) fn check_support(backend: &dyn MilpBackend, model: &Model) -> Result<(), AttackError> {
    let caps = backend.capabilities();
    let missing = if !model.objective().quadratic.is_empty() && !caps.quadratic_objective {
        Some("quadratic objectives")
    } else if !model.sos1_sets().is_empty() && !caps.sos1 {
        Some("SOS1 constraints")
    } else if model.has_binaries() && !caps.binary {
        Some("binary variables")
    } else {
        None
    };
    match missing {
        Some(feature) => Err(AttackError::Unsupported(format!(
            "model '{}' needs {feature}, which backend '{}' does not support",
            model.name(),
            backend.id()
        ))),
        None => Ok(()),
    }
}

/// Solves `model` and turns every non-optimal status into an [`AttackError`].
pub(crate) fn solve_stage(
    backend: &dyn MilpBackend,
    config: &SolverConfig,
    model: &Model,
    stage: SolveStage,
) -> Result<Solved, AttackError> {
    let report = backend
        .solve(model, config)
        .map_err(|source| AttackError::Backend { stage, source })?;
    let (nodes, elapsed) = (report.nodes, report.elapsed);
    match report.into_optimal() {
        Ok(assignment) => {
            debug!(
                %stage,
                objective = assignment.objective(),
                nodes,
                elapsed_ms = elapsed.as_millis() as u64,
                "solve finished"
            );
            Ok(Solved { assignment, nodes })
        }
        Err(report) => {
            warn!(%stage, status = %report.status, nodes, "solve did not reach optimality");
            Err(AttackError::from_report(stage, &report))
        }
    }
}

/// Builds and solves the bilevel attack models for one household.
///
/// Every operation builds a fresh model, so calls are independent.
pub struct AttackOrchestrator {
    house: HouseParameters,
    attack: AttackParameters,
    backend: Arc<dyn MilpBackend>,
    config: SolverConfig,
}

impl AttackOrchestrator {
    /// Validates the parameters and selects the default backend.
    pub fn new(house: HouseParameters, attack: AttackParameters) -> Result<Self, AttackError> {
        house.validate()?;
        attack.validate(house.hours())?;
        Ok(Self {
            house,
            attack,
            backend: Arc::new(GoodLpBackend::default()),
            config: SolverConfig::default(),
        })
    }

    pub fn with_backend(mut self, backend: Arc<dyn MilpBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn house(&self) -> &HouseParameters {
        &self.house
    }

    pub fn attack(&self) -> &AttackParameters {
        &self.attack
    }

    pub fn backend(&self) -> &dyn MilpBackend {
        self.backend.as_ref()
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn solve(&self, model: &Model, stage: SolveStage) -> Result<Solved, AttackError> {
        solve_stage(self.backend.as_ref(), &self.config, model, stage)
    }

    /// Dispatch LP with zero perturbation, checked against its dual.
    pub fn solve_baseline(&self) -> Result<BaselineOutcome, AttackError> {
        let start = Instant::now();
        let zero = vec![0.0; self.house.hours()];
        let mut model = Model::new("baseline");
        let primal =
            PrimalDispatch::build(&mut model, &self.house, &self.attack, Perturbation::Fixed(&zero));
        model.set_objective(Sense::Minimize, primal.cost().clone());

        let solved = self.solve(&model, SolveStage::Baseline)?;
        let dispatch = primal.extract(&solved.assignment, self.house.baseline_demand());
        let dual = self.solve_dual_baseline()?;
        let duality_gap = relative_gap(dispatch.cost, dual.objective);

        info!(
            cost = dispatch.cost,
            dual = dual.objective,
            gap = duality_gap,
            "baseline solved"
        );
        Ok(BaselineOutcome {
            primal_objective: dispatch.cost,
            dual_objective: dual.objective,
            duality_gap,
            dispatch,
            solve_time: start.elapsed(),
        })
    }

    /// Dual LP alone with zero perturbation.
    pub fn solve_dual_baseline(&self) -> Result<DualBaselineOutcome, AttackError> {
        let zero = vec![0.0; self.house.hours()];
        let mut model = Model::new("dual_baseline");
        let dual = DualModel::build(&mut model, &self.house, &self.attack);
        model.set_objective(Sense::Maximize, dual.objective_at(&zero));

        let solved = self.solve(&model, SolveStage::DualBaseline)?;
        let a = &solved.assignment;
        Ok(DualBaselineOutcome {
            objective: dual.evaluate(a, &zero),
            lambda_demand: a.values_of(&dual.vars.lambda_demand),
            lambda_battery: a.values_of(&dual.vars.lambda_battery),
            mu_limit_pv: a.values_of(&dual.vars.mu_limit_pv),
            mu_limit_battery: a.values_of(&dual.vars.mu_limit_battery),
        })
    }

    /// Largest achievable `delta[i]` per hour under upper-level and primal
    /// feasibility, one LP per hour.
    pub fn valid_inequality_bounds(&self) -> Result<Vec<f64>, AttackError> {
        let mut model = Model::new("valid_inequality_bounds");
        let upper = UpperLevel::build(&mut model, &self.house, &self.attack, AbsEncoding::Relaxed);
        PrimalDispatch::build(
            &mut model,
            &self.house,
            &self.attack,
            Perturbation::Variable(&upper.delta),
        );

        let mut bounds = Vec::with_capacity(upper.delta.len());
        for (hour, &delta) in upper.delta.iter().enumerate() {
            model.set_objective(Sense::Maximize, delta);
            let solved = self.solve(&model, SolveStage::ValidInequality { hour })?;
            bounds.push(solved.assignment.value(delta));
        }
        debug!(?bounds, "valid-inequality bounds");
        Ok(bounds)
    }

    pub fn solve_big_m_attack(&self, m: f64) -> Result<AttackOutcome, AttackError> {
        self.solve_attack(Reformulation::BigM { m })
    }

    pub fn solve_sos1_attack(&self) -> Result<AttackOutcome, AttackError> {
        self.solve_attack(Reformulation::Sos1)
    }

    pub fn solve_tightened_sos1_attack(&self) -> Result<AttackOutcome, AttackError> {
        self.solve_attack(Reformulation::Sos1Tightened)
    }

    /// Solves the single-level KKT reformulation with the given strategy.
    pub fn solve_attack(&self, reformulation: Reformulation) -> Result<AttackOutcome, AttackError> {
        if let Reformulation::BigM { m } = reformulation {
            if !(m.is_finite() && m > 0.0) {
                return Err(AttackError::InvalidBigM(m));
            }
        }
        let start = Instant::now();
        let encoding = match reformulation {
            Reformulation::BigM { .. } => AbsEncoding::Binary,
            Reformulation::Sos1 | Reformulation::Sos1Tightened => AbsEncoding::Sos1,
        };
        let mut hm = HouseModel::build(reformulation.name(), &self.house, &self.attack, encoding);
        let complementarity = Complementarity::build(
            &mut hm.model,
            &self.house,
            &self.attack,
            &hm.primal,
            &hm.dual,
            reformulation.pair_encoding(),
        );
        hm.upper.set_objective(&mut hm.model, self.attack.norm);
        check_support(self.backend.as_ref(), &hm.model)?;

        let baseline = self.solve_baseline()?.dispatch;
        let bounds = match reformulation {
            Reformulation::Sos1Tightened => Some(self.valid_inequality_bounds()?),
            _ => None,
        };
        if let Some(bounds) = &bounds {
            add_valid_inequality(&mut hm.model, &hm.primal, &hm.dual, bounds);
        }

        info!(
            %reformulation,
            vars = hm.model.num_vars(),
            rows = hm.model.num_constraints(),
            pairs = complementarity.pairs.len(),
            "solving attack"
        );
        let solved = self.solve(&hm.model, SolveStage::Attack)?;
        let a = &solved.assignment;

        let delta = hm.delta_values(a);
        let attacked = hm.primal.extract(a, self.house.perturbed_demand(&delta));
        let primal_objective = attacked.cost;
        let dual_objective = hm.dual.evaluate(a, &delta);
        let report = complementarity.report(a);
        let big_m_warnings = complementarity.big_m_warnings(a);

        info!(
            %reformulation,
            upper = a.objective(),
            primal = primal_objective,
            dual = dual_objective,
            complementarity = report.max_violation,
            nodes = solved.nodes,
            "attack solved"
        );
        Ok(AttackOutcome {
            reformulation,
            baseline,
            attacked,
            delta,
            upper_objective: a.objective(),
            primal_objective,
            dual_objective,
            duality_gap: relative_gap(primal_objective, dual_objective),
            complementarity: report,
            big_m_warnings,
            valid_inequality_bounds: bounds,
            nodes: solved.nodes,
            solve_time: start.elapsed(),
        })
    }

    /// Runs the penalty alternating direction heuristic.
    pub fn solve_padm(&self, params: &PadmParameters) -> Result<PadmOutcome, AttackError> {
        params.validate()?;
        if self.attack.norm != ObjectiveNorm::L1 {
            return Err(AttackError::Unsupported(
                "PADM supports the L1 deviation objective only".into(),
            ));
        }
        PadmSolver::new(
            &self.house,
            &self.attack,
            params,
            self.backend.as_ref(),
            &self.config,
        )
        .run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prosumer_core::ConfigError;

    fn house() -> HouseParameters {
        HouseParameters {
            lifetime: 14_400,
            pv_unit_price: 1000.0,
            battery_unit_price: 140.0,
            buy_price: 0.25,
            sell_price: 0.05,
            total_demand: 3500.0,
            ..HouseParameters::with_profiles(vec![0.25; 4], vec![0.0; 4])
        }
    }

    #[test]
    fn test_new_rejects_bad_parameters() {
        let mut h = house();
        h.pv_availability.pop();
        let err = AttackOrchestrator::new(h, AttackParameters::no_attack()).err().unwrap();
        assert!(matches!(
            err,
            AttackError::Config(ConfigError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_big_m_rejected_before_solving() {
        let orchestrator = AttackOrchestrator::new(house(), AttackParameters::no_attack()).unwrap();
        assert!(matches!(
            orchestrator.solve_big_m_attack(-1.0),
            Err(AttackError::InvalidBigM(_))
        ));
        assert!(matches!(
            orchestrator.solve_big_m_attack(f64::INFINITY),
            Err(AttackError::InvalidBigM(_))
        ));
    }

    #[test]
    fn test_l2_needs_quadratic_backend() {
        let attack = AttackParameters {
            norm: ObjectiveNorm::L2,
            ..AttackParameters::bounded(-0.5, 0.5)
        };
        let orchestrator = AttackOrchestrator::new(house(), attack).unwrap();
        assert!(matches!(
            orchestrator.solve_sos1_attack(),
            Err(AttackError::Unsupported(_))
        ));
        assert!(matches!(
            orchestrator.solve_padm(&PadmParameters::default()),
            Err(AttackError::Unsupported(_))
        ));
    }

    #[test]
    fn test_baseline_strong_duality() {
        let orchestrator = AttackOrchestrator::new(house(), AttackParameters::no_attack()).unwrap();
        let baseline = orchestrator.solve_baseline().unwrap();
        assert!((baseline.primal_objective - 875.0).abs() < 1e-6);
        assert!(baseline.duality_gap < 1e-6);
    }
}
