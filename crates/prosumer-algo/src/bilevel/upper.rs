//! Attacker (upper-level) variables and constraints.

use prosumer_core::{AttackParameters, HouseParameters, ObjectiveNorm};
use serde::{Deserialize, Serialize};

use crate::solver::{LinExpr, LinearConstraint, Model, Sense, VarId, VarKind};

/// How `abs_delta = |delta|` is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsEncoding {
    /// Sign binary per hour: `up ≤ ub·s`, `down ≤ −lb·(1−s)`.
    Binary,
    /// `{up, down}` declared as an SOS1 pair.
    Sos1,
    /// No disjunction; `abs_delta` only bounds `|delta|` from above.
    Relaxed,
}

/// Upper-level variable groups, all indexed by hour.
///
/// `delta = up − down` and `abs_delta = up + down` with `up, down ≥ 0`. The
/// hull cut `up/ub + down/(−lb) ≤ 1` keeps relaxations tight.
#[derive(Debug, Clone)]
pub struct UpperLevel {
    pub delta: Vec<VarId>,
    pub up: Vec<VarId>,
    pub down: Vec<VarId>,
    pub abs_delta: Vec<VarId>,
    /// Sign binaries; empty unless built with [`AbsEncoding::Binary`].
    pub sign: Vec<VarId>,
    pub encoding: AbsEncoding,
}

impl UpperLevel {
    pub fn build(
        model: &mut Model,
        house: &HouseParameters,
        attack: &AttackParameters,
        encoding: AbsEncoding,
    ) -> Self {
        let hours = house.hours();
        let mut delta = Vec::with_capacity(hours);
        let mut up = Vec::with_capacity(hours);
        let mut down = Vec::with_capacity(hours);
        let mut abs_delta = Vec::with_capacity(hours);
        let mut sign = Vec::new();

        for i in 0..hours {
            let (lb, ub) = (attack.lower(i), attack.upper(i));
            delta.push(model.continuous(format!("delta[{i}]"), lb, ub));
            up.push(model.continuous(format!("delta_up[{i}]"), 0.0, ub));
            down.push(model.continuous(format!("delta_down[{i}]"), 0.0, -lb));
            abs_delta.push(model.continuous(format!("abs_delta[{i}]"), 0.0, ub.max(-lb)));
        }

        model.add_constraints("delta_split", 0..hours, |i| {
            LinearConstraint::eq(delta[i], up[i] - down[i])
        });
        model.add_constraints("abs_delta", 0..hours, |i| {
            LinearConstraint::eq(abs_delta[i], up[i] + down[i])
        });

        for i in 0..hours {
            let (lb, ub) = (attack.lower(i), attack.upper(i));
            if lb < 0.0 && ub > 0.0 {
                model.add_constraint(
                    LinearConstraint::leq((1.0 / ub) * up[i] + (1.0 / -lb) * down[i], 1.0)
                        .named(format!("delta_hull[{i}]")),
                );
            }
        }

        match encoding {
            AbsEncoding::Binary => {
                sign = model.add_vars("delta_sign", hours, 0.0, 1.0, VarKind::Binary);
                model.add_constraints("delta_up_on", 0..hours, |i| {
                    LinearConstraint::leq(up[i], attack.upper(i) * sign[i])
                });
                model.add_constraints("delta_down_on", 0..hours, |i| {
                    LinearConstraint::leq(down[i], -attack.lower(i) * (LinExpr::constant(1.0) - sign[i]))
                });
            }
            AbsEncoding::Sos1 => {
                for i in 0..hours {
                    model.add_sos1(format!("delta_sign[{i}]"), vec![up[i], down[i]]);
                }
            }
            AbsEncoding::Relaxed => {}
        }

        let shares = &house.demand_shares;
        model.add_constraint(
            LinearConstraint::eq(
                (0..hours).map(|i| shares[i] * delta[i]).sum::<LinExpr>(),
                0.0,
            )
            .named("mass_conservation"),
        );

        if let Some(budget) = attack.total_delta_ub {
            model.add_constraint(
                LinearConstraint::leq(
                    abs_delta.iter().map(|&v| LinExpr::from(v)).sum::<LinExpr>(),
                    budget,
                )
                .named("delta_budget"),
            );
        }

        Self {
            delta,
            up,
            down,
            abs_delta,
            sign,
            encoding,
        }
    }

    /// Σ abs_delta, the linear deviation objective.
    pub fn total_deviation(&self) -> LinExpr {
        self.abs_delta.iter().map(|&v| LinExpr::from(v)).sum()
    }

    /// Diagonal quadratic terms of Σ delta².
    pub fn squared_deviation(&self) -> Vec<(VarId, f64)> {
        self.delta.iter().map(|&v| (v, 1.0)).collect()
    }

    /// Sets the attacker objective (maximized) on `model`.
    pub fn set_objective(&self, model: &mut Model, norm: ObjectiveNorm) {
        match norm {
            ObjectiveNorm::L1 => model.set_objective(Sense::Maximize, self.total_deviation()),
            ObjectiveNorm::L2 => model.set_quadratic_objective(
                Sense::Maximize,
                LinExpr::new(),
                self.squared_deviation(),
            ),
        }
    }

    /// Every upper-level variable, for pinning.
    pub fn variables(&self) -> Vec<VarId> {
        [&self.delta, &self.up, &self.down, &self.abs_delta, &self.sign]
            .into_iter()
            .flatten()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn house() -> HouseParameters {
        HouseParameters {
            total_demand: 100.0,
            ..HouseParameters::with_profiles(vec![0.25; 4], vec![0.0; 4])
        }
    }

    #[test]
    fn test_binary_encoding_declares_signs() {
        let mut model = Model::new("upper");
        let upper = UpperLevel::build(
            &mut model,
            &house(),
            &AttackParameters::bounded(-0.5, 0.8),
            AbsEncoding::Binary,
        );
        assert_eq!(upper.sign.len(), 4);
        assert!(model.has_binaries());
        assert_eq!(model.bounds(upper.delta[0]), (-0.5, 0.8));
        assert_eq!(model.bounds(upper.down[0]), (0.0, 0.5));
        assert_eq!(upper.variables().len(), 20);
    }

    #[test]
    fn test_sos_encoding_declares_pairs() {
        let mut model = Model::new("upper");
        let upper = UpperLevel::build(
            &mut model,
            &house(),
            &AttackParameters::bounded(-0.5, 0.5),
            AbsEncoding::Sos1,
        );
        assert!(upper.sign.is_empty());
        assert_eq!(model.sos1_sets().len(), 4);
        assert!(!model.has_binaries());
    }

    #[test]
    fn test_zero_bounds_skip_hull_and_budget_is_optional() {
        let mut model = Model::new("upper");
        UpperLevel::build(
            &mut model,
            &house(),
            &AttackParameters::no_attack(),
            AbsEncoding::Relaxed,
        );
        assert!(model.constraints().iter().all(|c| !c.name.starts_with("delta_hull")));
        assert!(model.constraints().iter().all(|c| c.name != "delta_budget"));

        let attack = AttackParameters {
            total_delta_ub: Some(0.4),
            ..AttackParameters::bounded(-0.5, 0.5)
        };
        let mut model = Model::new("upper");
        UpperLevel::build(&mut model, &house(), &attack, AbsEncoding::Relaxed);
        assert!(model.constraints().iter().any(|c| c.name == "delta_budget"));
    }

    #[test]
    fn test_hull_cut_cuts_fake_deviation() {
        // up = down = ub/2 would give abs = ub with delta = 0.
        let mut model = Model::new("upper");
        let upper = UpperLevel::build(
            &mut model,
            &house(),
            &AttackParameters::bounded(-0.8, 0.8),
            AbsEncoding::Sos1,
        );
        let hull = model
            .constraints()
            .iter()
            .find(|c| c.name == "delta_hull[0]")
            .unwrap();
        let mut values = vec![0.0; model.num_vars()];
        values[upper.up[0].index()] = 0.8;
        values[upper.down[0].index()] = 0.4;
        assert!(hull.violation(&values) > 0.4);
    }
}
