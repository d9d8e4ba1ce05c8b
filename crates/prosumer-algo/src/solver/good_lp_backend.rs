//! `good_lp`-backed implementation of [`MilpBackend`].
//!
//! The model is translated to a fresh `good_lp` problem for every relaxation.
//! Integrality is left to the engine when it supports it (microlp); SOS1
//! sets, and binaries on continuous-only engines (Clarabel), are enforced by
//! [`branching`](super::branching).

use std::time::Instant;

use good_lp::solvers::{ResolutionError, Solution, Solver, SolverModel};
use good_lp::{constraint, variable, Expression, ProblemVariables, Variable};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::backend::{
    BackendCapabilities, BackendError, MilpBackend, SolveReport, SolveStatus, SolverConfig,
};
use super::branching;
use super::model::{Assignment, ConstraintSense, LinExpr, Model, Sense, VarKind};

/// LP engine used underneath `good_lp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LpEngine {
    /// Pure-Rust simplex with integer support.
    #[default]
    Microlp,
    /// Interior-point conic solver; continuous variables only.
    Clarabel,
}

impl LpEngine {
    pub fn id(&self) -> &'static str {
        match self {
            LpEngine::Microlp => "microlp",
            LpEngine::Clarabel => "clarabel",
        }
    }

    /// Whether the engine was compiled into this build.
    pub fn is_available(&self) -> bool {
        match self {
            LpEngine::Microlp => cfg!(feature = "solver-microlp"),
            LpEngine::Clarabel => cfg!(feature = "solver-clarabel"),
        }
    }

    fn native_integer(&self) -> bool {
        matches!(self, LpEngine::Microlp)
    }
}

/// Default backend: `good_lp` plus SOS1 branching.
#[derive(Debug, Clone)]
pub struct GoodLpBackend {
    engine: LpEngine,
    id: String,
}

impl GoodLpBackend {
    pub fn new(engine: LpEngine) -> Self {
        Self {
            engine,
            id: format!("good_lp-{}", engine.id()),
        }
    }

    pub fn microlp() -> Self {
        Self::new(LpEngine::Microlp)
    }

    pub fn clarabel() -> Self {
        Self::new(LpEngine::Clarabel)
    }

    pub fn engine(&self) -> LpEngine {
        self.engine
    }

    /// Solves one node relaxation with column bounds `bounds`.
    fn relax(
        &self,
        model: &Model,
        bounds: &[(f64, f64)],
        config: &SolverConfig,
    ) -> Result<SolveReport, BackendError> {
        let start = Instant::now();
        let tol = config.feasibility_tol;
        let infeasible = || SolveReport::without_solution(SolveStatus::Infeasible, 1, start.elapsed());

        if bounds.iter().any(|&(lower, upper)| lower > upper + tol) {
            return Ok(infeasible());
        }

        let mut rows = Vec::with_capacity(model.num_constraints());
        for row in model.constraints() {
            let expr = row.expr.compact();
            let has_free_column = expr.terms().iter().any(|(var, _)| {
                let (lower, upper) = bounds[var.index()];
                lower < upper
            });
            if has_free_column {
                rows.push((expr, row.sense));
                continue;
            }
            // Tolerance is relative to the largest term of the row.
            let mut scale = expr.constant_part().abs().max(1.0);
            let mut lhs = expr.constant_part();
            for (var, coef) in expr.terms() {
                let term = coef * bounds[var.index()].0;
                scale = scale.max(term.abs());
                lhs += term;
            }
            let violation = match row.sense {
                ConstraintSense::Le => lhs,
                ConstraintSense::Eq => lhs.abs(),
                ConstraintSense::Ge => -lhs,
            };
            if violation > tol * scale {
                debug!(row = %row.name, violation, "fixed row violated");
                return Ok(infeasible());
            }
        }

        let integer = self.engine.native_integer();
        let outcome = match self.engine {
            #[cfg(feature = "solver-microlp")]
            LpEngine::Microlp => solve_with(
                good_lp::solvers::microlp::microlp,
                model,
                bounds,
                &rows,
                integer,
            ),
            #[cfg(feature = "solver-clarabel")]
            LpEngine::Clarabel => solve_with(
                good_lp::solvers::clarabel::clarabel,
                model,
                bounds,
                &rows,
                integer,
            ),
            #[allow(unreachable_patterns)]
            other => return Err(BackendError::Unavailable(other.id())),
        };

        Ok(match outcome {
            Ok(mut values) => {
                for (value, &(lower, upper)) in values.iter_mut().zip(bounds) {
                    *value = value.max(lower).min(upper);
                }
                let objective = model.objective().eval(&values);
                SolveReport {
                    status: SolveStatus::Optimal,
                    assignment: Some(Assignment::new(values, objective)),
                    nodes: 1,
                    elapsed: start.elapsed(),
                }
            }
            Err(status) => SolveReport::without_solution(status, 1, start.elapsed()),
        })
    }
}

impl Default for GoodLpBackend {
    fn default() -> Self {
        Self::microlp()
    }
}

impl MilpBackend for GoodLpBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            binary: true,
            sos1: true,
            quadratic_objective: false,
        }
    }

    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<SolveReport, BackendError> {
        if !model.objective().quadratic.is_empty() {
            return Err(BackendError::Unsupported {
                backend: self.id.clone(),
                feature: "quadratic objectives",
            });
        }
        if !self.engine.is_available() {
            return Err(BackendError::Unavailable(self.engine.id()));
        }

        debug!(
            backend = %self.id,
            model = model.name(),
            vars = model.num_vars(),
            rows = model.num_constraints(),
            sos1 = model.sos1_sets().len(),
            "solving"
        );
        let branch_binaries = !self.engine.native_integer();
        branching::solve(model, config, branch_binaries, |bounds| {
            self.relax(model, bounds, config)
        })
    }
}

/// Builds and solves one `good_lp` problem, returning dense column values.
fn solve_with<S>(
    solver: S,
    model: &Model,
    bounds: &[(f64, f64)],
    rows: &[(LinExpr, ConstraintSense)],
    integer: bool,
) -> Result<Vec<f64>, SolveStatus>
where
    S: Solver,
    S::Model: SolverModel<Error = ResolutionError>,
{
    let mut vars = ProblemVariables::new();
    let columns: Vec<Variable> = model
        .vars()
        .iter()
        .zip(bounds)
        .map(|(def, &(lower, upper))| {
            let mut column = variable().name(def.name.clone());
            if integer && def.kind == VarKind::Binary {
                column = column.integer();
            }
            if lower.is_finite() {
                column = column.min(lower);
            }
            if upper.is_finite() {
                column = column.max(upper);
            }
            vars.add(column)
        })
        .collect();

    let objective = linear_part(&model.objective().linear, &columns);
    let unsolved = match model.objective().sense {
        Sense::Minimize => vars.minimise(objective),
        Sense::Maximize => vars.maximise(objective),
    };
    let mut lp = unsolved.using(solver);

    for (expr, sense) in rows {
        let lhs = linear_part(expr, &columns);
        let rhs = -expr.constant_part();
        lp = lp.with(match sense {
            ConstraintSense::Le => constraint!(lhs <= rhs),
            ConstraintSense::Eq => constraint!(lhs == rhs),
            ConstraintSense::Ge => constraint!(lhs >= rhs),
        });
    }

    match lp.solve() {
        Ok(solution) => Ok(columns.iter().map(|&c| solution.value(c)).collect()),
        Err(ResolutionError::Infeasible) => Err(SolveStatus::Infeasible),
        Err(ResolutionError::Unbounded) => Err(SolveStatus::Unbounded),
        Err(err) => {
            warn!(error = %err, "LP engine failure");
            Err(SolveStatus::NumericalError)
        }
    }
}

fn linear_part(expr: &LinExpr, columns: &[Variable]) -> Expression {
    expr.terms()
        .iter()
        .fold(Expression::from(0.0), |acc, &(var, coef)| {
            acc + coef * columns[var.index()]
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::model::LinearConstraint;

    fn backend() -> GoodLpBackend {
        GoodLpBackend::default()
    }

    #[test]
    fn test_backend_id() {
        assert_eq!(GoodLpBackend::microlp().id(), "good_lp-microlp");
        assert_eq!(GoodLpBackend::clarabel().id(), "good_lp-clarabel");
        assert!(!backend().capabilities().quadratic_objective);
    }

    #[test]
    fn test_simple_lp() {
        // min x + 2y  s.t. x + y >= 3, y >= 1
        let mut model = Model::new("lp");
        let x = model.continuous("x", 0.0, f64::INFINITY);
        let y = model.continuous("y", 1.0, f64::INFINITY);
        model.add_constraint(LinearConstraint::geq(x + y, 3.0));
        model.set_objective(Sense::Minimize, x + 2.0 * y);

        let report = backend().solve(&model, &SolverConfig::default()).unwrap();
        let assignment = report.into_optimal().unwrap();
        assert!((assignment.value(x) - 2.0).abs() < 1e-6);
        assert!((assignment.value(y) - 1.0).abs() < 1e-6);
        assert!((assignment.objective() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_lp() {
        let mut model = Model::new("infeasible");
        let x = model.continuous("x", 0.0, 1.0);
        model.add_constraint(LinearConstraint::geq(x, 2.0));
        model.set_objective(Sense::Minimize, x);

        let report = backend().solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(report.status, SolveStatus::Infeasible);
    }

    #[test]
    fn test_violated_fixed_row_is_infeasible() {
        let mut model = Model::new("fixed");
        let x = model.continuous("x", 0.0, 5.0);
        model.add_constraint(LinearConstraint::eq(x, 2.0));
        model.set_objective(Sense::Maximize, x);

        let pinned = model.pin(&[x], &[3.0]);
        let report = backend().solve(&pinned, &SolverConfig::default()).unwrap();
        assert_eq!(report.status, SolveStatus::Infeasible);
    }

    #[test]
    fn test_sos1_pair() {
        // max a + b with a, b ≤ 1, a + b ≤ 1.5 and at most one nonzero.
        let mut model = Model::new("sos");
        let a = model.continuous("a", 0.0, 1.0);
        let b = model.continuous("b", 0.0, 1.0);
        model.add_constraint(LinearConstraint::leq(a + b, 1.5));
        model.add_sos1("ab", vec![a, b]);
        model.set_objective(Sense::Maximize, a + b);

        let assignment = backend()
            .solve(&model, &SolverConfig::default())
            .unwrap()
            .into_optimal()
            .unwrap();
        assert!((assignment.objective() - 1.0).abs() < 1e-6);
        assert!(assignment.value(a).min(assignment.value(b)) < 1e-7);
    }

    #[test]
    fn test_binary_knapsack() {
        // max 5z1 + 4z2 + 3z3  s.t. 2z1 + 3z2 + z3 ≤ 4
        let mut model = Model::new("knapsack");
        let z: Vec<_> = (0..3).map(|i| model.binary(format!("z{i}"))).collect();
        model.add_constraint(LinearConstraint::leq(
            2.0 * z[0] + 3.0 * z[1] + z[2],
            4.0,
        ));
        model.set_objective(Sense::Maximize, 5.0 * z[0] + 4.0 * z[1] + 3.0 * z[2]);

        let assignment = backend()
            .solve(&model, &SolverConfig::default())
            .unwrap()
            .into_optimal()
            .unwrap();
        assert!((assignment.objective() - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_quadratic_objective_rejected() {
        let mut model = Model::new("qp");
        let x = model.continuous("x", -1.0, 1.0);
        model.set_quadratic_objective(Sense::Maximize, LinExpr::new(), vec![(x, 1.0)]);
        let err = backend().solve(&model, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, BackendError::Unsupported { .. }));
    }
}
