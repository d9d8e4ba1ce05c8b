//! `prosumer baseline`

use anyhow::{Context, Result};
use prosumer_cli::output::{emit, write_dispatch, write_summary};
use prosumer_cli::{CommonArgs, Scenario};

pub fn handle(common: &CommonArgs) -> Result<()> {
    let scenario = Scenario::load(&common.config)?;
    let orchestrator = scenario.orchestrator()?;
    let outcome = orchestrator
        .solve_baseline()
        .context("solving baseline dispatch")?;

    emit(common.format, common.out.as_deref(), &outcome, |w| {
        write_summary(
            w,
            &[
                ("primal cost", format!("{:.4}", outcome.primal_objective)),
                ("dual objective", format!("{:.4}", outcome.dual_objective)),
                ("duality gap", format!("{:.2e}", outcome.duality_gap)),
                (
                    "PV capacity",
                    format!("{:.4}", outcome.dispatch.capacity_pv),
                ),
                (
                    "battery capacity",
                    format!("{:.4}", outcome.dispatch.capacity_battery),
                ),
                (
                    "solve time",
                    format!("{} ms", outcome.solve_time.as_millis()),
                ),
            ],
        )?;
        write_dispatch(w, &outcome.dispatch, None)
    })
}
