//! `prosumer padm`

use anyhow::{Context, Result};
use prosumer_cli::output::{emit, write_dispatch, write_summary};
use prosumer_cli::{CommonArgs, Scenario};

pub fn handle(common: &CommonArgs) -> Result<()> {
    let scenario = Scenario::load(&common.config)?;
    let orchestrator = scenario.orchestrator()?;
    let outcome = orchestrator
        .solve_padm(&scenario.padm)
        .context("running PADM")?;

    if !outcome.converged {
        eprintln!(
            "Warning: PADM stopped at the outer iteration limit with duality gap {:.2e}",
            outcome.duality_gap
        );
    }

    let baseline = scenario.house.baseline_demand();
    emit(common.format, common.out.as_deref(), &outcome, |w| {
        write_summary(
            w,
            &[
                ("termination", outcome.termination.to_string()),
                ("deviation", format!("{:.4}", outcome.upper_objective)),
                ("primal cost", format!("{:.4}", outcome.primal_objective)),
                ("dual objective", format!("{:.4}", outcome.dual_objective)),
                ("duality gap", format!("{:.2e}", outcome.duality_gap)),
                ("stationarity", format!("{:.2e}", outcome.stationarity)),
                ("outer iterations", outcome.outer_iterations.to_string()),
                ("inner iterations", outcome.inner_iterations.to_string()),
                ("penalty", format!("{:.3e}", outcome.mu)),
                (
                    "solve time",
                    format!("{} ms", outcome.solve_time.as_millis()),
                ),
            ],
        )?;
        write_dispatch(w, &outcome.dispatch, Some(&baseline))
    })
}
