//! Complementary slackness between the dispatch LP and its dual.
//!
//! Each pair couples a non-negative activity with a non-negative slack, and
//! at most one of them may be positive. Slacks (and negated non-positive
//! duals) get auxiliary columns tied by equality rows, so every pair is a
//! pair of plain variables that big-M rows or an SOS1 set can act on.

use std::fmt;

use prosumer_core::{AttackParameters, HouseParameters};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::dual::DualModel;
use super::primal::PrimalDispatch;
use super::solution::{BigMSide, BigMWarning, ComplementarityReport, PairResidual};
use crate::solver::{Assignment, LinExpr, LinearConstraint, Model, VarId};

/// Relative distance to M below which a value counts as sitting at the bound.
const BIG_M_PROXIMITY: f64 = 1e-6;

/// The ten complementarity families of the dispatch LP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairFamily {
    LimitPv,
    LimitBattery,
    Buy,
    Sell,
    BatteryOut,
    BatteryIn,
    BatteryBalance,
    PvBalance,
    CapacityBattery,
    CapacityPv,
}

impl PairFamily {
    pub const ALL: [PairFamily; 10] = [
        PairFamily::LimitPv,
        PairFamily::LimitBattery,
        PairFamily::Buy,
        PairFamily::Sell,
        PairFamily::BatteryOut,
        PairFamily::BatteryIn,
        PairFamily::BatteryBalance,
        PairFamily::PvBalance,
        PairFamily::CapacityBattery,
        PairFamily::CapacityPv,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PairFamily::LimitPv => "limit_pv",
            PairFamily::LimitBattery => "limit_battery",
            PairFamily::Buy => "buy",
            PairFamily::Sell => "sell",
            PairFamily::BatteryOut => "battery_out",
            PairFamily::BatteryIn => "battery_in",
            PairFamily::BatteryBalance => "battery_balance",
            PairFamily::PvBalance => "pv_balance",
            PairFamily::CapacityBattery => "capacity_battery",
            PairFamily::CapacityPv => "capacity_pv",
        }
    }
}

impl fmt::Display for PairFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exact single-level strategy of the attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reformulation {
    /// Binary indicator per pair with constant `m`.
    BigM { m: f64 },
    /// SOS1 set per pair.
    Sos1,
    /// SOS1 plus the valid inequality on the primal cost.
    Sos1Tightened,
}

impl Reformulation {
    pub fn name(&self) -> &'static str {
        match self {
            Reformulation::BigM { .. } => "big-m",
            Reformulation::Sos1 => "sos1",
            Reformulation::Sos1Tightened => "sos1-tightened",
        }
    }

    pub fn pair_encoding(&self) -> PairEncoding {
        match *self {
            Reformulation::BigM { m } => PairEncoding::BigM(m),
            Reformulation::Sos1 | Reformulation::Sos1Tightened => PairEncoding::Sos1,
        }
    }
}

impl fmt::Display for Reformulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reformulation::BigM { m } => write!(f, "big-m (M = {m})"),
            other => f.write_str(other.name()),
        }
    }
}

/// How a single pair is enforced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairEncoding {
    BigM(f64),
    Sos1,
}

/// Column handles of one complementarity pair.
#[derive(Debug, Clone)]
pub struct ComplementarityPair {
    pub family: PairFamily,
    pub hour: Option<usize>,
    pub activity: VarId,
    pub slack: VarId,
    /// Big-M indicator (`1` allows the activity to be positive).
    pub indicator: Option<VarId>,
}

/// All complementarity pairs of one model.
#[derive(Debug, Clone)]
pub struct Complementarity {
    pub pairs: Vec<ComplementarityPair>,
    pub encoding: PairEncoding,
}

enum Activity {
    /// A non-negative primal column.
    Column(VarId),
    /// Negation of a non-positive dual column.
    Negated(VarId),
}

struct PairBuilder<'m> {
    model: &'m mut Model,
    encoding: PairEncoding,
    pairs: Vec<ComplementarityPair>,
}

impl PairBuilder<'_> {
    fn add(&mut self, family: PairFamily, hour: Option<usize>, activity: Activity, slack: LinExpr) {
        let tag = match hour {
            Some(i) => format!("{family}[{i}]"),
            None => family.to_string(),
        };

        let activity = match activity {
            Activity::Column(var) => var,
            Activity::Negated(var) => {
                let aux = self
                    .model
                    .continuous(format!("cs_activity_{tag}"), 0.0, f64::INFINITY);
                self.model.add_constraint(
                    LinearConstraint::eq(aux, -var).named(format!("cs_activity_def_{tag}")),
                );
                aux
            }
        };

        let slack_var = self
            .model
            .continuous(format!("cs_slack_{tag}"), 0.0, f64::INFINITY);
        self.model
            .add_constraint(LinearConstraint::eq(slack_var, slack).named(format!("cs_slack_def_{tag}")));

        let indicator = match self.encoding {
            PairEncoding::BigM(m) => {
                let z = self.model.binary(format!("cs_on_{tag}"));
                self.model.add_constraint(
                    LinearConstraint::leq(activity, m * z).named(format!("cs_bigm_activity_{tag}")),
                );
                self.model.add_constraint(
                    LinearConstraint::leq(slack_var, m * (LinExpr::constant(1.0) - z))
                        .named(format!("cs_bigm_slack_{tag}")),
                );
                Some(z)
            }
            PairEncoding::Sos1 => {
                self.model
                    .add_sos1(format!("cs_{tag}"), vec![activity, slack_var]);
                None
            }
        };

        self.pairs.push(ComplementarityPair {
            family,
            hour,
            activity,
            slack: slack_var,
            indicator,
        });
    }
}

impl Complementarity {
    /// Adds every pair linking `primal` and `dual` to `model`.
    ///
    /// Capacity pairs are skipped for capacities fixed by `attack`.
    pub fn build(
        model: &mut Model,
        house: &HouseParameters,
        attack: &AttackParameters,
        primal: &PrimalDispatch,
        dual: &DualModel,
        encoding: PairEncoding,
    ) -> Self {
        let hours = house.hours();
        let p = &primal.vars;
        let d = &dual.vars;
        let avail = &house.pv_availability;
        let mut builder = PairBuilder {
            model,
            encoding,
            pairs: Vec::new(),
        };

        for i in 0..hours {
            let next = (i + 1) % hours;
            let h = Some(i);
            builder.add(
                PairFamily::LimitPv,
                h,
                Activity::Negated(d.mu_limit_pv[i]),
                avail[i] * p.capacity_pv - p.pv[i],
            );
            builder.add(
                PairFamily::LimitBattery,
                h,
                Activity::Negated(d.mu_limit_battery[i]),
                p.capacity_battery - p.soc[i],
            );
            builder.add(
                PairFamily::Buy,
                h,
                Activity::Column(p.buy[i]),
                LinExpr::constant(house.buy_price) - d.lambda_demand[i],
            );
            builder.add(
                PairFamily::Sell,
                h,
                Activity::Column(p.sell[i]),
                d.lambda_demand[i] - house.sell_price,
            );
            builder.add(
                PairFamily::BatteryOut,
                h,
                Activity::Column(p.battery_out[i]),
                d.lambda_battery[i] - d.lambda_demand[i],
            );
            builder.add(
                PairFamily::BatteryIn,
                h,
                Activity::Column(p.battery_in[i]),
                d.lambda_demand[i] - d.lambda_battery[i],
            );
            builder.add(
                PairFamily::BatteryBalance,
                h,
                Activity::Column(p.soc[i]),
                d.lambda_battery[i] - d.lambda_battery[next] - d.mu_limit_battery[i],
            );
            builder.add(
                PairFamily::PvBalance,
                h,
                Activity::Column(p.pv[i]),
                -d.lambda_demand[i] - d.mu_limit_pv[i],
            );
        }

        if attack.capacity_battery.is_none() {
            let slack = d
                .mu_limit_battery
                .iter()
                .map(|&m| LinExpr::from(m))
                .sum::<LinExpr>()
                + house.annualized_battery_cost();
            builder.add(
                PairFamily::CapacityBattery,
                None,
                Activity::Column(p.capacity_battery),
                slack,
            );
        }
        if attack.capacity_pv.is_none() {
            let slack = (0..hours)
                .map(|i| avail[i] * d.mu_limit_pv[i])
                .sum::<LinExpr>()
                + house.annualized_pv_cost();
            builder.add(
                PairFamily::CapacityPv,
                None,
                Activity::Column(p.capacity_pv),
                slack,
            );
        }

        Self {
            pairs: builder.pairs,
            encoding,
        }
    }

    /// Activity and slack values of every pair.
    pub fn report(&self, assignment: &Assignment) -> ComplementarityReport {
        ComplementarityReport::new(
            self.pairs
                .iter()
                .map(|pair| PairResidual {
                    family: pair.family,
                    hour: pair.hour,
                    activity: assignment.value(pair.activity),
                    slack: assignment.value(pair.slack),
                })
                .collect(),
        )
    }

    /// Pairs whose activity or slack reached the big-M constant.
    ///
    /// Empty for SOS1 encodings. Every hit is logged at `warn`.
    pub fn big_m_warnings(&self, assignment: &Assignment) -> Vec<BigMWarning> {
        let PairEncoding::BigM(m) = self.encoding else {
            return Vec::new();
        };
        let threshold = m * (1.0 - BIG_M_PROXIMITY);
        let mut warnings = Vec::new();
        for pair in &self.pairs {
            for (side, var) in [(BigMSide::Activity, pair.activity), (BigMSide::Slack, pair.slack)] {
                let value = assignment.value(var);
                if value >= threshold {
                    warn!(
                        family = %pair.family,
                        hour = ?pair.hour,
                        ?side,
                        value,
                        m,
                        "complementarity value at the big-M bound; the optimum may be cut off"
                    );
                    warnings.push(BigMWarning {
                        family: pair.family,
                        hour: pair.hour,
                        side,
                        value,
                        m,
                    });
                }
            }
        }
        warnings
    }
}

/// Adds `cost ≤ Σ lambda_demand[i]·d[i]·(1 + bounds[i]) + fixed terms`.
///
/// Valid for any `bounds[i] ≥ delta[i]` because `lambda_demand ≥ sell_price ≥ 0`.
pub fn add_valid_inequality(
    model: &mut Model,
    primal: &PrimalDispatch,
    dual: &DualModel,
    bounds: &[f64],
) {
    model.add_constraint(
        LinearConstraint::leq(primal.cost().clone(), dual.objective_at(bounds))
            .named("valid_inequality"),
    );
}

/// Data-derived big-M constant.
pub struct BigMAdvisor;

impl BigMAdvisor {
    /// Safety factor applied on top of the magnitude estimates.
    pub const SAFETY: f64 = 2.0;

    /// Upper estimate of every activity and slack in the reformulation.
    ///
    /// Primal quantities are bounded by the total perturbed demand, scaled up
    /// by the smallest positive PV availability for the PV capacity. Dual
    /// slacks are bounded by the prices and investment costs summed over the
    /// horizon. The result is an estimate, not a proof: check
    /// [`AttackOutcome::big_m_warnings`](super::AttackOutcome::big_m_warnings).
    pub fn suggest(house: &HouseParameters, attack: &AttackParameters) -> f64 {
        let hours = house.hours();
        let total_demand: f64 = (0..hours)
            .map(|i| house.demand(i) * (1.0 + attack.upper(i)))
            .sum();
        let min_avail = house
            .pv_availability
            .iter()
            .copied()
            .filter(|a| *a > 0.0)
            .fold(1.0, f64::min);
        let primal = total_demand / min_avail;
        let overrides = attack
            .capacity_battery
            .unwrap_or(0.0)
            .max(attack.capacity_pv.unwrap_or(0.0));
        let dual = hours as f64 * house.buy_price.max(house.sell_price)
            + house.annualized_battery_cost()
            + house.annualized_pv_cost();
        Self::SAFETY * primal.max(overrides).max(dual)
    }
}
