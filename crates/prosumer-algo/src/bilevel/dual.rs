//! Dual of the dispatch LP.
//!
//! Multipliers follow the row order of [`PrimalDispatch`](super::PrimalDispatch):
//! `lambda_demand` for the balance, `lambda_battery` for the battery
//! equation `soc[i−1] + in[i] − out[i] − soc[i] = 0`, and non-positive
//! `mu_limit_pv` / `mu_limit_battery` for the two capacity limits.

use prosumer_core::{AttackParameters, HouseParameters};

use crate::solver::{Assignment, ConstrId, LinExpr, LinearConstraint, Model, VarId, VarKind};

/// Dual variable groups.
#[derive(Debug, Clone)]
pub struct DualVars {
    pub mu_limit_battery: Vec<VarId>,
    pub mu_limit_pv: Vec<VarId>,
    pub lambda_battery: Vec<VarId>,
    pub lambda_demand: Vec<VarId>,
}

/// Dual feasibility rows, one family per primal column.
#[derive(Debug, Clone)]
pub struct DualRows {
    pub buy: Vec<ConstrId>,
    pub sell: Vec<ConstrId>,
    pub battery_out: Vec<ConstrId>,
    pub battery_in: Vec<ConstrId>,
    pub soc: Vec<ConstrId>,
    pub pv: Vec<ConstrId>,
    /// Absent when the battery capacity is fixed.
    pub capacity_battery: Option<ConstrId>,
    /// Absent when the PV capacity is fixed.
    pub capacity_pv: Option<ConstrId>,
}

#[derive(Debug, Clone)]
pub struct DualModel {
    pub vars: DualVars,
    pub rows: DualRows,
    demand: Vec<f64>,
    /// Capacity-override contribution: `C̄·Σ mu` terms plus fixed investment.
    fixed_terms: LinExpr,
}

impl DualModel {
    pub fn build(model: &mut Model, house: &HouseParameters, attack: &AttackParameters) -> Self {
        let hours = house.hours();
        let vars = DualVars {
            mu_limit_battery: model.add_vars(
                "mu_limit_battery",
                hours,
                f64::NEG_INFINITY,
                0.0,
                VarKind::Continuous,
            ),
            mu_limit_pv: model.add_vars(
                "mu_limit_pv",
                hours,
                f64::NEG_INFINITY,
                0.0,
                VarKind::Continuous,
            ),
            lambda_battery: model.add_vars(
                "lambda_battery",
                hours,
                f64::NEG_INFINITY,
                f64::INFINITY,
                VarKind::Continuous,
            ),
            lambda_demand: model.add_vars(
                "lambda_demand",
                hours,
                f64::NEG_INFINITY,
                f64::INFINITY,
                VarKind::Continuous,
            ),
        };
        let v = &vars;
        let avail = &house.pv_availability;

        let buy = model.add_constraints("dual_buy", 0..hours, |i| {
            LinearConstraint::leq(v.lambda_demand[i], house.buy_price)
        });
        let sell = model.add_constraints("dual_sell", 0..hours, |i| {
            LinearConstraint::geq(v.lambda_demand[i], house.sell_price)
        });
        let battery_out = model.add_constraints("dual_battery_out", 0..hours, |i| {
            LinearConstraint::leq(v.lambda_demand[i] - v.lambda_battery[i], 0.0)
        });
        let battery_in = model.add_constraints("dual_battery_in", 0..hours, |i| {
            LinearConstraint::leq(v.lambda_battery[i] - v.lambda_demand[i], 0.0)
        });
        let soc = model.add_constraints("dual_soc", 0..hours, |i| {
            let next = (i + 1) % hours;
            LinearConstraint::leq(
                v.lambda_battery[next] - v.lambda_battery[i] + v.mu_limit_battery[i],
                0.0,
            )
        });
        let pv = model.add_constraints("dual_pv", 0..hours, |i| {
            LinearConstraint::leq(v.lambda_demand[i] + v.mu_limit_pv[i], 0.0)
        });

        let sum_mu_battery: LinExpr = v.mu_limit_battery.iter().map(|&m| LinExpr::from(m)).sum();
        let weighted_mu_pv: LinExpr = (0..hours).map(|i| avail[i] * v.mu_limit_pv[i]).sum();

        let mut fixed_terms = LinExpr::new();
        let capacity_battery = match attack.capacity_battery {
            Some(capacity) => {
                fixed_terms += sum_mu_battery * capacity;
                fixed_terms.add_constant(house.annualized_battery_cost() * capacity);
                None
            }
            None => Some(model.add_constraint(
                LinearConstraint::leq(-sum_mu_battery, house.annualized_battery_cost())
                    .named("dual_capacity_battery"),
            )),
        };
        let capacity_pv = match attack.capacity_pv {
            Some(capacity) => {
                fixed_terms += weighted_mu_pv * capacity;
                fixed_terms.add_constant(house.annualized_pv_cost() * capacity);
                None
            }
            None => Some(model.add_constraint(
                LinearConstraint::leq(-weighted_mu_pv, house.annualized_pv_cost())
                    .named("dual_capacity_pv"),
            )),
        };

        Self {
            vars,
            rows: DualRows {
                buy,
                sell,
                battery_out,
                battery_in,
                soc,
                pv,
                capacity_battery,
                capacity_pv,
            },
            demand: house.baseline_demand(),
            fixed_terms,
        }
    }

    /// Dual objective at a known perturbation; linear in the duals.
    ///
    /// `Σ lambda_demand[i]·d[i]·(1 + delta[i])` plus the capacity-override terms.
    pub fn objective_at(&self, delta: &[f64]) -> LinExpr {
        let mut objective = self.fixed_terms.clone();
        for (i, &lambda) in self.vars.lambda_demand.iter().enumerate() {
            objective.add_term(lambda, self.demand[i] * (1.0 + delta[i]));
        }
        objective
    }

    /// Dual objective with the duals taken from `duals`; linear in `delta`.
    pub fn objective_given_duals(&self, duals: &Assignment, delta: &[VarId]) -> LinExpr {
        let mut objective = LinExpr::constant(duals.eval(&self.fixed_terms));
        for (i, &lambda) in self.vars.lambda_demand.iter().enumerate() {
            let weight = duals.value(lambda) * self.demand[i];
            objective.add_constant(weight);
            objective.add_term(delta[i], weight);
        }
        objective
    }

    /// Numeric value of the dual objective.
    pub fn evaluate(&self, assignment: &Assignment, delta: &[f64]) -> f64 {
        assignment.eval(&self.objective_at(delta))
    }

    /// Every dual variable, for pinning.
    pub fn variables(&self) -> Vec<VarId> {
        let v = &self.vars;
        [&v.mu_limit_battery, &v.mu_limit_pv, &v.lambda_battery, &v.lambda_demand]
            .into_iter()
            .flatten()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{GoodLpBackend, MilpBackend, Sense, SolverConfig};

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

    fn solve_dual(attack: &AttackParameters, delta: &[f64]) -> (DualModel, Assignment) {
        let h = house();
        let mut model = Model::new("dual");
        let dual = DualModel::build(&mut model, &h, attack);
        model.set_objective(Sense::Maximize, dual.objective_at(delta));
        let assignment = GoodLpBackend::default()
            .solve(&model, &SolverConfig::default())
            .unwrap()
            .into_optimal()
            .unwrap();
        (dual, assignment)
    }

    #[test]
    fn test_dual_baseline_prices_demand_at_buy_price() {
        let (dual, assignment) = solve_dual(&AttackParameters::no_attack(), &[0.0; 4]);
        assert!((dual.evaluate(&assignment, &[0.0; 4]) - 875.0).abs() < 1e-6);
        for &lambda in &dual.vars.lambda_demand {
            assert!((assignment.value(lambda) - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn test_capacity_override_drops_rows_and_adds_fixed_cost() {
        let attack = AttackParameters {
            capacity_battery: Some(10.0),
            ..AttackParameters::no_attack()
        };
        let (dual, assignment) = solve_dual(&attack, &[0.0; 4]);
        assert!(dual.rows.capacity_battery.is_none());
        assert!(dual.rows.capacity_pv.is_some());
        let fixed_cost = 10.0 * 140.0 / 14_400.0;
        assert!((dual.evaluate(&assignment, &[0.0; 4]) - (875.0 + fixed_cost)).abs() < 1e-6);
    }

    #[test]
    fn test_objective_forms_agree() {
        let attack = AttackParameters::no_attack();
        let (_, assignment) = solve_dual(&attack, &[0.0; 4]);

        // Same column layout as `solve_dual`, with delta columns appended.
        let mut model = Model::new("dual_delta");
        let dual = DualModel::build(&mut model, &house(), &attack);
        let delta_vars = model.add_vars("delta", 4, -1.0, 1.0, VarKind::Continuous);

        let delta = [0.5, -0.5, 0.2, -0.2];
        let linear_in_delta = dual.objective_given_duals(&assignment, &delta_vars);
        let mut values = assignment.values().to_vec();
        values.extend_from_slice(&delta);
        assert!((linear_in_delta.eval(&values) - dual.evaluate(&assignment, &delta)).abs() < 1e-9);
    }
}
