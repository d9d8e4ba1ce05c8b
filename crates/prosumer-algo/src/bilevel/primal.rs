//! Lower-level dispatch LP of the prosumer.

use prosumer_core::{AttackParameters, HouseParameters};

use super::solution::DispatchSolution;
use crate::solver::{Assignment, ConstrId, LinExpr, LinearConstraint, Model, VarId, VarKind};

/// Right-hand side of the energy balance.
#[derive(Debug, Clone, Copy)]
pub enum Perturbation<'a> {
    /// Known perturbation fractions; the balance is a plain LP row.
    Fixed(&'a [f64]),
    /// Upper-level `delta` variables; the balance couples both levels.
    Variable(&'a [VarId]),
}

/// Primal variable groups.
#[derive(Debug, Clone)]
pub struct PrimalVars {
    pub pv: Vec<VarId>,
    pub soc: Vec<VarId>,
    pub battery_in: Vec<VarId>,
    pub battery_out: Vec<VarId>,
    pub buy: Vec<VarId>,
    pub sell: Vec<VarId>,
    pub capacity_battery: VarId,
    pub capacity_pv: VarId,
}

/// Row handles of the primal constraint families.
#[derive(Debug, Clone)]
pub struct PrimalRows {
    pub balance: Vec<ConstrId>,
    pub battery: Vec<ConstrId>,
    pub limit_pv: Vec<ConstrId>,
    pub limit_battery: Vec<ConstrId>,
}

/// Dispatch and sizing LP:
///
/// ```text
/// min  c_pv·C_pv + c_b·C_b + p_buy·Σ buy − p_sell·Σ sell
/// s.t. buy − sell + out − in + pv = d·(1 + delta)        (balance)
///      soc[i−1] + in[i] − out[i] − soc[i] = 0  (mod H)     (battery)
///      pv[i] ≤ a[i]·C_pv                                  (limit_pv)
///      soc[i] ≤ C_b                                       (limit_battery)
/// ```
///
/// Capacity overrides fix the capacity columns through their bounds.
#[derive(Debug, Clone)]
pub struct PrimalDispatch {
    pub vars: PrimalVars,
    pub rows: PrimalRows,
    cost: LinExpr,
}

impl PrimalDispatch {
    pub fn build(
        model: &mut Model,
        house: &HouseParameters,
        attack: &AttackParameters,
        perturbation: Perturbation<'_>,
    ) -> Self {
        let hours = house.hours();
        let non_negative = |model: &mut Model, name: &str| {
            model.add_vars(name, hours, 0.0, f64::INFINITY, VarKind::Continuous)
        };

        let vars = PrimalVars {
            pv: non_negative(model, "pv"),
            soc: non_negative(model, "soc"),
            battery_in: non_negative(model, "battery_in"),
            battery_out: non_negative(model, "battery_out"),
            buy: non_negative(model, "buy"),
            sell: non_negative(model, "sell"),
            capacity_battery: capacity_column(model, "capacity_battery", attack.capacity_battery),
            capacity_pv: capacity_column(model, "capacity_pv", attack.capacity_pv),
        };
        let v = &vars;

        let balance = model.add_constraints("balance", 0..hours, |i| {
            let supply = v.buy[i] - v.sell[i] + v.battery_out[i] - v.battery_in[i] + v.pv[i];
            let demand = house.demand(i);
            match perturbation {
                Perturbation::Fixed(delta) => LinearConstraint::eq(supply, demand * (1.0 + delta[i])),
                Perturbation::Variable(delta) => {
                    LinearConstraint::eq(supply, demand * delta[i] + demand)
                }
            }
        });

        let battery = model.add_constraints("battery", 0..hours, |i| {
            let prev = (i + hours - 1) % hours;
            LinearConstraint::eq(
                v.soc[prev] + v.battery_in[i] - v.battery_out[i] - v.soc[i],
                0.0,
            )
        });

        let limit_pv = model.add_constraints("limit_pv", 0..hours, |i| {
            LinearConstraint::leq(v.pv[i], house.pv_availability[i] * v.capacity_pv)
        });

        let limit_battery = model.add_constraints("limit_battery", 0..hours, |i| {
            LinearConstraint::leq(v.soc[i], v.capacity_battery)
        });

        let mut cost = house.annualized_pv_cost() * vars.capacity_pv
            + house.annualized_battery_cost() * vars.capacity_battery;
        for i in 0..hours {
            cost.add_term(vars.buy[i], house.buy_price);
            cost.add_term(vars.sell[i], -house.sell_price);
        }

        Self {
            vars,
            rows: PrimalRows {
                balance,
                battery,
                limit_pv,
                limit_battery,
            },
            cost,
        }
    }

    /// Objective expression (total cost).
    pub fn cost(&self) -> &LinExpr {
        &self.cost
    }

    /// Every primal variable, for pinning.
    pub fn variables(&self) -> Vec<VarId> {
        let v = &self.vars;
        let mut ids: Vec<VarId> = [&v.pv, &v.soc, &v.battery_in, &v.battery_out, &v.buy, &v.sell]
            .into_iter()
            .flatten()
            .copied()
            .collect();
        ids.push(v.capacity_battery);
        ids.push(v.capacity_pv);
        ids
    }

    /// Reads the dispatch out of a solved assignment.
    pub fn extract(&self, assignment: &Assignment, demand: Vec<f64>) -> DispatchSolution {
        let v = &self.vars;
        DispatchSolution {
            demand,
            pv: assignment.values_of(&v.pv),
            soc: assignment.values_of(&v.soc),
            battery_in: assignment.values_of(&v.battery_in),
            battery_out: assignment.values_of(&v.battery_out),
            buy: assignment.values_of(&v.buy),
            sell: assignment.values_of(&v.sell),
            capacity_battery: assignment.value(v.capacity_battery),
            capacity_pv: assignment.value(v.capacity_pv),
            cost: assignment.eval(&self.cost),
        }
    }
}

fn capacity_column(model: &mut Model, name: &str, fixed: Option<f64>) -> VarId {
    match fixed {
        Some(value) => model.continuous(name, value, value),
        None => model.continuous(name, 0.0, f64::INFINITY),
    }
}
