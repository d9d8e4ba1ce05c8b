//! Penalty alternating direction heuristic

use prosumer_algo::{AttackOrchestrator, PadmTermination};
use prosumer_core::{AttackParameters, HouseParameters, PadmParameters};

fn flat_house(hours: usize) -> HouseParameters {
    HouseParameters {
        lifetime: 14_400,
        pv_unit_price: 1000.0,
        battery_unit_price: 140.0,
        buy_price: 0.25,
        sell_price: 0.05,
        total_demand: 3500.0,
        ..HouseParameters::with_profiles(vec![1.0 / hours as f64; hours], vec![0.0; hours])
    }
}

#[test]
fn test_no_attack_converges_to_baseline() {
    let params = PadmParameters::default();
    let orchestrator =
        AttackOrchestrator::new(flat_house(24), AttackParameters::no_attack()).unwrap();
    let outcome = orchestrator.solve_padm(&params).unwrap();

    assert_eq!(outcome.termination, PadmTermination::Converged);
    assert!(outcome.converged);
    assert!(outcome.outer_iterations <= 2);
    assert!((outcome.primal_objective - 875.0).abs() < params.stationary_error * 875.0);
    assert!(outcome.duality_gap < params.penalty_error);
    assert!(outcome.upper_objective.abs() < 1e-9);
    assert_eq!(outcome.history.len(), outcome.inner_iterations);
}

#[test]
fn test_attack_run_reports_quality() {
    let params = PadmParameters {
        max_outer_iter: 4,
        max_stationary_iter: 10,
        ..PadmParameters::default()
    };
    let house = flat_house(6);
    let orchestrator =
        AttackOrchestrator::new(house.clone(), AttackParameters::bounded(-0.8, 0.8)).unwrap();
    let outcome = orchestrator.solve_padm(&params).unwrap();

    assert!(outcome.outer_iterations >= 1 && outcome.outer_iterations <= 4);
    assert_eq!(
        outcome.converged,
        outcome.termination == PadmTermination::Converged
    );
    assert!(outcome.upper_objective <= 4.8 + 1e-6);
    assert!(outcome.delta.iter().all(|d| (-0.8 - 1e-9..=0.8 + 1e-9).contains(d)));

    // Primal and dual are feasible at the same perturbation.
    assert!(outcome.primal_objective >= outcome.dual_objective - 1e-6 * 875.0);
    assert!(outcome.dispatch.max_balance_residual() < 1e-4);

    // The penalty only grows between outer iterations.
    let mus: Vec<f64> = outcome.history.iter().map(|it| it.mu).collect();
    assert!(mus.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(outcome.mu, *mus.last().unwrap());
}

#[test]
fn test_pv_and_battery_run_stays_feasible() {
    let house = HouseParameters {
        lifetime: 14_400,
        pv_unit_price: 1000.0,
        battery_unit_price: 140.0,
        buy_price: 0.25,
        sell_price: 0.01,
        total_demand: 100.0,
        ..HouseParameters::with_profiles(
            vec![0.1, 0.2, 0.3, 0.25, 0.15],
            vec![0.0, 0.6, 0.9, 0.4, 0.0],
        )
    };
    let params = PadmParameters::default();
    let orchestrator =
        AttackOrchestrator::new(house, AttackParameters::bounded(-0.5, 0.5)).unwrap();
    let outcome = orchestrator.solve_padm(&params).unwrap();

    assert!(outcome.converged);
    assert!(outcome.duality_gap < params.penalty_error);
    assert!(outcome.upper_objective <= 2.5 + 1e-6);
    assert!(outcome.dispatch.max_balance_residual() < 1e-4);
    assert!(outcome.dispatch.max_battery_residual() < 1e-4);
}

#[test]
fn test_invalid_parameters_fail_fast() {
    let orchestrator =
        AttackOrchestrator::new(flat_house(4), AttackParameters::no_attack()).unwrap();
    let params = PadmParameters {
        increase_factor: 0.5,
        ..PadmParameters::default()
    };
    assert!(matches!(
        orchestrator.solve_padm(&params),
        Err(prosumer_algo::AttackError::Config(_))
    ));
}
