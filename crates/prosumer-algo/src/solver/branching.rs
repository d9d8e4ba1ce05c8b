//! Depth-first branching over SOS1 sets and binary variables.
//!
//! The driver only manipulates variable bounds: every node is the root
//! model with some members fixed to zero (SOS1) or to 0/1 (binaries), and
//! its relaxation is solved by the caller-provided closure.

use std::time::Instant;

use tracing::{debug, warn};

use super::backend::{BackendError, SolveReport, SolveStatus, SolverConfig};
use super::model::{Assignment, Model, Sense, VarId, VarKind};

/// Column bounds of one node, indexed by variable.
pub(crate) type NodeBounds = Vec<(f64, f64)>;

enum Branch {
    /// Children are alternative sets of variables fixed to zero.
    Sos { zero_first: Vec<VarId>, zero_second: Vec<VarId> },
    /// Binary fixed to the nearer value first.
    Binary { var: VarId, first: f64 },
}

/// Runs branch-and-bound on `model` using `relax` for node relaxations.
///
/// `branch_binaries` is false when the engine already enforces integrality.
pub(crate) fn solve<F>(
    model: &Model,
    config: &SolverConfig,
    branch_binaries: bool,
    mut relax: F,
) -> Result<SolveReport, BackendError>
where
    F: FnMut(&[(f64, f64)]) -> Result<SolveReport, BackendError>,
{
    let start = Instant::now();
    let sense = model.objective().sense;
    let root: NodeBounds = model.vars().iter().map(|v| (v.lower, v.upper)).collect();

    let mut stack = vec![root];
    let mut incumbent: Option<Assignment> = None;
    let mut nodes = 0;
    let mut limited = false;

    while let Some(bounds) = stack.pop() {
        let out_of_time = config
            .time_limit()
            .is_some_and(|limit| start.elapsed() >= limit);
        if out_of_time || nodes >= config.max_nodes {
            limited = true;
            break;
        }
        nodes += 1;

        let report = relax(&bounds)?;
        let relaxed = match report.status {
            SolveStatus::Optimal => match report.assignment {
                Some(assignment) => assignment,
                None => continue,
            },
            SolveStatus::Infeasible => continue,
            SolveStatus::Unbounded if incumbent.is_none() && nodes == 1 => {
                return Ok(SolveReport::without_solution(
                    SolveStatus::Unbounded,
                    nodes,
                    start.elapsed(),
                ));
            }
            SolveStatus::Unbounded => continue,
            SolveStatus::TimeLimited | SolveStatus::NumericalError => {
                return Ok(SolveReport {
                    status: report.status,
                    assignment: incumbent,
                    nodes,
                    elapsed: start.elapsed(),
                });
            }
        };

        if let Some(best) = &incumbent {
            if !improves(sense, relaxed.objective(), best.objective(), config.optimality_tol) {
                continue;
            }
        }

        match select_branch(model, &relaxed, config, branch_binaries) {
            None => {
                let violation = model.max_violation(relaxed.values(), config.sos_tol);
                if violation > config.feasibility_tol {
                    warn!(
                        model = model.name(),
                        node = nodes,
                        violation,
                        "incumbent violates the model beyond feasibility_tol"
                    );
                }
                debug!(
                    node = nodes,
                    objective = relaxed.objective(),
                    violation,
                    "new incumbent"
                );
                incumbent = Some(relaxed);
            }
            Some(Branch::Sos {
                zero_first,
                zero_second,
            }) => {
                // Pushed in reverse so `zero_first` is explored next.
                if let Some(child) = with_zeros(&bounds, &zero_second) {
                    stack.push(child);
                }
                if let Some(child) = with_zeros(&bounds, &zero_first) {
                    stack.push(child);
                }
            }
            Some(Branch::Binary { var, first }) => {
                for value in [1.0 - first, first] {
                    let mut child = bounds.clone();
                    child[var.index()] = (value, value);
                    stack.push(child);
                }
            }
        }
    }

    let status = match (&incumbent, limited) {
        (_, true) => SolveStatus::TimeLimited,
        (Some(_), false) => SolveStatus::Optimal,
        (None, false) => SolveStatus::Infeasible,
    };
    debug!(
        model = model.name(),
        nodes,
        %status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "branching finished"
    );
    Ok(SolveReport {
        status,
        assignment: incumbent,
        nodes,
        elapsed: start.elapsed(),
    })
}

fn improves(sense: Sense, candidate: f64, best: f64, tol: f64) -> bool {
    let margin = tol * best.abs().max(1.0);
    match sense {
        Sense::Minimize => candidate < best - margin,
        Sense::Maximize => candidate > best + margin,
    }
}

/// Copy of `bounds` with `vars` fixed to zero, or `None` if zero is excluded.
fn with_zeros(bounds: &[(f64, f64)], vars: &[VarId]) -> Option<NodeBounds> {
    let mut child = bounds.to_vec();
    for var in vars {
        let (lower, upper) = child[var.index()];
        if lower > 0.0 || upper < 0.0 {
            return None;
        }
        child[var.index()] = (0.0, 0.0);
    }
    Some(child)
}

fn select_branch(
    model: &Model,
    relaxed: &Assignment,
    config: &SolverConfig,
    branch_binaries: bool,
) -> Option<Branch> {
    sos_branch(model, relaxed, config.sos_tol).or_else(|| {
        if branch_binaries {
            binary_branch(model, relaxed, config.integrality_tol)
        } else {
            None
        }
    })
}

/// Splits the most violated SOS1 set, measured by the mass outside its
/// largest member.
fn sos_branch(model: &Model, relaxed: &Assignment, tol: f64) -> Option<Branch> {
    let mut best: Option<(f64, usize)> = None;
    for (k, set) in model.sos1_sets().iter().enumerate() {
        let mags: Vec<f64> = set.vars.iter().map(|&v| relaxed.value(v).abs()).collect();
        if mags.iter().filter(|&&m| m > tol).count() < 2 {
            continue;
        }
        let total: f64 = mags.iter().sum();
        let largest = mags.iter().copied().fold(0.0, f64::max);
        let score = total - largest;
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, k));
        }
    }

    let (_, k) = best?;
    let vars = &model.sos1_sets()[k].vars;
    let nonzero: Vec<usize> = (0..vars.len())
        .filter(|&p| relaxed.value(vars[p]).abs() > tol)
        .collect();
    let (first, last) = (nonzero[0], nonzero[nonzero.len() - 1]);
    let split = (first + last) / 2;

    // Left child keeps 0..=split, right child keeps split+1.. .
    let left_zero = vars[split + 1..].to_vec();
    let right_zero = vars[..=split].to_vec();
    let mass = |ids: &[VarId]| ids.iter().map(|&v| relaxed.value(v).abs()).sum::<f64>();
    // Explore the child that zeroes less mass first.
    if mass(&left_zero) <= mass(&right_zero) {
        Some(Branch::Sos {
            zero_first: left_zero,
            zero_second: right_zero,
        })
    } else {
        Some(Branch::Sos {
            zero_first: right_zero,
            zero_second: left_zero,
        })
    }
}

/// Picks the most fractional binary.
fn binary_branch(model: &Model, relaxed: &Assignment, tol: f64) -> Option<Branch> {
    model
        .vars()
        .iter()
        .enumerate()
        .filter(|(_, def)| def.kind == VarKind::Binary)
        .map(|(idx, _)| {
            let value = relaxed.values()[idx];
            (idx, value, (value - value.round()).abs())
        })
        .filter(|(_, _, frac)| *frac > tol)
        .max_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(idx, value, _)| Branch::Binary {
            var: VarId::from_index(idx),
            first: value.round(),
        })
}
