//! End-to-end runs on small scenario files

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const FLAT_DAY: &str = r#"
[house]
total_demand = 3500.0
buy_price = 0.25
sell_price = 0.05

[series]
demand_file = "demand.csv"
pv_file = "pv.csv"
hours = 4

[attack]
lb = -0.8
ub = 0.8
"#;

/// Scenario directory with six hours of series, truncated to four.
fn scenario_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("scenario.toml"), FLAT_DAY).unwrap();
    fs::write(
        dir.path().join("demand.csv"),
        "2.5e-01\n2.5e-01\n2.5e-01\n2.5e-01\n0.0\n0.0\n",
    )
    .unwrap();
    fs::write(dir.path().join("pv.csv"), "0.0\n0.0\n0.0\n0.0\n0.0\n0.0\n").unwrap();
    dir
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_baseline_table() {
    let dir = scenario_dir();
    let mut cmd = cargo_bin_cmd!("prosumer");
    cmd.args(["baseline", "--config"])
        .arg(dir.path().join("scenario.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("primal cost"))
        .stdout(predicate::str::contains("875.0000"))
        .stdout(predicate::str::contains("HOUR"));
}

#[test]
fn test_baseline_json_to_file() {
    let dir = scenario_dir();
    let out = dir.path().join("baseline.json");
    let mut cmd = cargo_bin_cmd!("prosumer");
    cmd.args(["baseline", "--format", "json", "--config"])
        .arg(dir.path().join("scenario.toml"))
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let report = read_json(&out);
    let cost = report["primal_objective"].as_f64().unwrap();
    assert!((cost - 875.0).abs() < 1e-6);
    assert_eq!(report["dispatch"]["buy"].as_array().unwrap().len(), 4);
}

#[test]
fn test_sos1_attack_json() {
    let dir = scenario_dir();
    let out = dir.path().join("attack.json");
    let mut cmd = cargo_bin_cmd!("prosumer");
    cmd.args(["attack", "--strategy", "sos1", "--format", "json", "--config"])
        .arg(dir.path().join("scenario.toml"))
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let report = read_json(&out);
    assert_eq!(report["reformulation"]["kind"], "sos1");
    let deviation = report["upper_objective"].as_f64().unwrap();
    assert!((deviation - 3.2).abs() < 1e-4);
}

#[test]
fn test_bounds_table() {
    let dir = scenario_dir();
    let mut cmd = cargo_bin_cmd!("prosumer");
    cmd.args(["bounds", "--config"])
        .arg(dir.path().join("scenario.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("BOUND"))
        .stdout(predicate::str::contains("0.8000"));
}

#[test]
fn test_big_m_flag_needs_big_m_strategy() {
    let dir = scenario_dir();
    let mut cmd = cargo_bin_cmd!("prosumer");
    cmd.args(["attack", "--strategy", "sos1", "--big-m", "100", "--config"])
        .arg(dir.path().join("scenario.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--big-m only applies"));
}

#[test]
fn test_mismatched_series_fail_validation() {
    let dir = scenario_dir();
    fs::write(dir.path().join("pv.csv"), "0.0\n0.0\n").unwrap();
    let mut cmd = cargo_bin_cmd!("prosumer");
    cmd.args(["baseline", "--config"])
        .arg(dir.path().join("scenario.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("validating scenario"));
}
