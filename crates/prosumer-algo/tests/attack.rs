//! Exact KKT reformulations of the attack

use prosumer_algo::bilevel::PairFamily;
use prosumer_algo::{AttackOrchestrator, AttackOutcome, BigMAdvisor};
use prosumer_core::{AttackParameters, HouseParameters};

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

/// Five hours with PV in the middle of the day; selling is cheap enough
/// that PV investment stays bounded.
fn solar_house() -> HouseParameters {
    HouseParameters {
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
    }
}

fn orchestrator(hours: usize) -> AttackOrchestrator {
    AttackOrchestrator::new(flat_house(hours), AttackParameters::bounded(-0.8, 0.8)).unwrap()
}

fn assert_consistent(outcome: &AttackOutcome, house: &HouseParameters, cs_tol: f64) {
    let attacked = &outcome.attacked;
    assert!(attacked.max_balance_residual() < 1e-4);
    assert!(attacked.max_battery_residual() < 1e-4);

    let mass: f64 = outcome
        .delta
        .iter()
        .zip(&house.demand_shares)
        .map(|(d, s)| d * s)
        .sum();
    assert!(mass.abs() < 1e-6);
    assert!(outcome.delta.iter().all(|d| (-0.8 - 1e-9..=0.8 + 1e-9).contains(d)));

    assert_eq!(outcome.complementarity.pairs.len(), 8 * house.hours() + 2);
    assert!(
        outcome.complementarity.is_satisfied(cs_tol),
        "worst pair: {:?}",
        outcome.complementarity.worst()
    );
    assert!(outcome.duality_gap < 1e-5);
}

#[test]
fn test_big_m_attack_moves_every_hour() {
    let house = flat_house(6);
    let outcome = orchestrator(6).solve_big_m_attack(5000.0).unwrap();

    assert!((outcome.upper_objective - 4.8).abs() < 1e-4);
    assert!(outcome.big_m_warnings.is_empty());
    assert!(outcome.valid_inequality_bounds.is_none());
    assert_consistent(&outcome, &house, 1e-3);
}

#[test]
fn test_sos1_attack_matches_big_m() {
    let house = flat_house(6);
    let orchestrator = orchestrator(6);
    let sos1 = orchestrator.solve_sos1_attack().unwrap();
    let big_m = orchestrator.solve_big_m_attack(5000.0).unwrap();

    assert!((sos1.upper_objective - big_m.upper_objective).abs() < 1e-4);
    assert!((sos1.primal_objective - sos1.dual_objective).abs() < 1e-3);
    assert_consistent(&sos1, &house, 1e-6);

    // Baseline dispatch is part of every outcome.
    assert!((sos1.baseline.cost - 875.0).abs() < 1e-6);
}

#[test]
fn test_small_big_m_cuts_off_optimum() {
    let orchestrator = orchestrator(6);
    let sos1 = orchestrator.solve_sos1_attack().unwrap();
    let small = orchestrator.solve_big_m_attack(700.0).unwrap();

    // buy[i] ≤ 700 caps upward perturbations at 0.2.
    assert!((small.upper_objective - 1.6).abs() < 1e-4);
    assert!(small.upper_objective < sos1.upper_objective - 1e-3);
    assert!(small
        .big_m_warnings
        .iter()
        .any(|w| w.family == PairFamily::Buy));
}

#[test]
fn test_tightened_sos1_uses_per_hour_bounds() {
    let orchestrator = orchestrator(6);
    let bounds = orchestrator.valid_inequality_bounds().unwrap();
    assert_eq!(bounds.len(), 6);
    for bound in &bounds {
        assert!((bound - 0.8).abs() < 1e-6);
    }

    let tightened = orchestrator.solve_tightened_sos1_attack().unwrap();
    assert!((tightened.upper_objective - 4.8).abs() < 1e-4);
    assert_eq!(tightened.valid_inequality_bounds.as_deref(), Some(bounds.as_slice()));
    assert_consistent(&tightened, &flat_house(6), 1e-6);
}

#[test]
fn test_budget_limits_total_deviation() {
    let attack = AttackParameters {
        total_delta_ub: Some(1.0),
        ..AttackParameters::bounded(-0.8, 0.8)
    };
    let orchestrator = AttackOrchestrator::new(flat_house(6), attack).unwrap();
    let outcome = orchestrator.solve_sos1_attack().unwrap();

    assert!((outcome.upper_objective - 1.0).abs() < 1e-4);
    let total: f64 = outcome.delta.iter().map(|d| d.abs()).sum();
    assert!(total <= 1.0 + 1e-6);
}

#[test]
fn test_no_attack_reproduces_baseline() {
    let orchestrator =
        AttackOrchestrator::new(flat_house(6), AttackParameters::no_attack()).unwrap();
    let outcome = orchestrator.solve_sos1_attack().unwrap();

    assert!(outcome.upper_objective.abs() < 1e-9);
    assert!((outcome.primal_objective - 875.0).abs() < 1e-6);
    assert!((outcome.attacked.cost - outcome.baseline.cost).abs() < 1e-6);
}

#[test]
fn test_advised_big_m_is_not_binding() {
    let house = flat_house(6);
    let attack = AttackParameters::bounded(-0.8, 0.8);
    let m = BigMAdvisor::suggest(&house, &attack);
    let outcome = AttackOrchestrator::new(house, attack)
        .unwrap()
        .solve_big_m_attack(m)
        .unwrap();

    assert!((outcome.upper_objective - 4.8).abs() < 1e-4);
    assert!(outcome.big_m_warnings.is_empty());
}

#[test]
fn test_full_day_big_m_and_sos1_agree() {
    let house = flat_house(24);
    let orchestrator = orchestrator(24);
    let big_m = orchestrator.solve_big_m_attack(5000.0).unwrap();
    let sos1 = orchestrator.solve_sos1_attack().unwrap();

    assert!((big_m.upper_objective - 19.2).abs() < 1e-3);
    assert!((sos1.upper_objective - big_m.upper_objective).abs() < 1e-3);
    assert_consistent(&sos1, &house, 1e-6);
}

#[test]
fn test_strategies_agree_with_pv_and_battery() {
    let house = solar_house();
    let attack = AttackParameters::bounded(-0.5, 0.5);
    let m = BigMAdvisor::suggest(&house, &attack);
    let orchestrator = AttackOrchestrator::new(house.clone(), attack).unwrap();

    let sos1 = orchestrator.solve_sos1_attack().unwrap();
    let tightened = orchestrator.solve_tightened_sos1_attack().unwrap();
    let big_m = orchestrator.solve_big_m_attack(m).unwrap();

    assert!((sos1.upper_objective - 2.5).abs() < 1e-4);
    assert!((tightened.upper_objective - sos1.upper_objective).abs() < 1e-4);
    assert!((big_m.upper_objective - sos1.upper_objective).abs() < 1e-4);
    assert!((sos1.primal_objective - 3.7765).abs() < 1e-3);

    // The lower level actually invests in both technologies.
    assert!(sos1.attacked.capacity_pv > 1.0);
    assert!(sos1.attacked.capacity_battery > 1.0);

    for outcome in [&sos1, &tightened] {
        assert!(outcome.duality_gap < 1e-6);
        assert_consistent(outcome, &house, 1e-6);
    }
    assert!(big_m.big_m_warnings.is_empty());
    assert_consistent(&big_m, &house, 1e-4);
}
