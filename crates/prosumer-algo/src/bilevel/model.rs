//! Canonical single-level model: upper level, primal and dual on one [`Model`].

use prosumer_core::{AttackParameters, HouseParameters};

use super::dual::DualModel;
use super::primal::{Perturbation, PrimalDispatch};
use super::upper::{AbsEncoding, UpperLevel};
use crate::solver::{Assignment, Model};

/// Upper-level, primal and dual variable groups sharing one model.
///
/// Complementarity, cuts and the objective are added by the caller, which
/// is how the exact reformulations and PADM share a single formulation.
#[derive(Debug, Clone)]
pub struct HouseModel {
    pub model: Model,
    pub upper: UpperLevel,
    pub primal: PrimalDispatch,
    pub dual: DualModel,
}

impl HouseModel {
    pub fn build(
        name: &str,
        house: &HouseParameters,
        attack: &AttackParameters,
        encoding: AbsEncoding,
    ) -> Self {
        let mut model = Model::new(name);
        let upper = UpperLevel::build(&mut model, house, attack, encoding);
        let primal = PrimalDispatch::build(
            &mut model,
            house,
            attack,
            Perturbation::Variable(&upper.delta),
        );
        let dual = DualModel::build(&mut model, house, attack);
        Self {
            model,
            upper,
            primal,
            dual,
        }
    }

    pub fn delta_values(&self, assignment: &Assignment) -> Vec<f64> {
        assignment.values_of(&self.upper.delta)
    }

    pub fn primal_objective(&self, assignment: &Assignment) -> f64 {
        assignment.eval(self.primal.cost())
    }

    pub fn dual_objective(&self, assignment: &Assignment) -> f64 {
        self.dual
            .evaluate(assignment, &self.delta_values(assignment))
    }

    /// Σ abs_delta of an assignment.
    pub fn total_deviation(&self, assignment: &Assignment) -> f64 {
        assignment.eval(&self.upper.total_deviation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_share_one_model() {
        let house = HouseParameters {
            total_demand: 10.0,
            buy_price: 0.2,
            ..HouseParameters::with_profiles(vec![0.5, 0.5], vec![0.0, 1.0])
        };
        let hm = HouseModel::build("kkt", &house, &AttackParameters::default(), AbsEncoding::Sos1);
        let total = hm.upper.variables().len() + hm.primal.variables().len() + hm.dual.variables().len();
        assert_eq!(total, hm.model.num_vars());
        assert_eq!(hm.model.name(), "kkt");
    }
}
