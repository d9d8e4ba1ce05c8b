//! `prosumer attack`

use anyhow::{bail, Context, Result};
use prosumer_algo::{BigMAdvisor, Reformulation};
use prosumer_cli::output::{emit, write_dispatch, write_summary};
use prosumer_cli::{CommonArgs, Scenario, Strategy};
use tracing::info;

pub fn handle(common: &CommonArgs, strategy: Strategy, big_m: Option<f64>) -> Result<()> {
    if big_m.is_some() && strategy != Strategy::BigM {
        bail!("--big-m only applies to --strategy big-m");
    }
    let scenario = Scenario::load(&common.config)?;
    let orchestrator = scenario.orchestrator()?;

    let reformulation = match strategy {
        Strategy::BigM => {
            let m = match big_m {
                Some(m) => m,
                None => {
                    let m = BigMAdvisor::suggest(&scenario.house, &scenario.attack);
                    info!(m, "big-M constant derived from scenario data");
                    m
                }
            };
            Reformulation::BigM { m }
        }
        Strategy::Sos1 => Reformulation::Sos1,
        Strategy::Sos1Tightened => Reformulation::Sos1Tightened,
    };
    let outcome = orchestrator
        .solve_attack(reformulation)
        .with_context(|| format!("solving {reformulation} attack"))?;

    if !outcome.big_m_warnings.is_empty() {
        eprintln!(
            "Warning: {} complementarity values reached the big-M constant; the optimum may be cut off",
            outcome.big_m_warnings.len()
        );
    }

    emit(common.format, common.out.as_deref(), &outcome, |w| {
        write_summary(
            w,
            &[
                ("strategy", reformulation.to_string()),
                ("deviation", format!("{:.4}", outcome.upper_objective)),
                ("baseline cost", format!("{:.4}", outcome.baseline.cost)),
                ("attacked cost", format!("{:.4}", outcome.primal_objective)),
                ("dual objective", format!("{:.4}", outcome.dual_objective)),
                ("duality gap", format!("{:.2e}", outcome.duality_gap)),
                (
                    "complementarity",
                    format!("{:.2e}", outcome.complementarity.max_violation),
                ),
                ("nodes", outcome.nodes.to_string()),
                (
                    "solve time",
                    format!("{} ms", outcome.solve_time.as_millis()),
                ),
            ],
        )?;
        write_dispatch(w, &outcome.attacked, Some(&outcome.baseline.demand))
    })
}
