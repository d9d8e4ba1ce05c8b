//! `prosumer bounds`

use anyhow::{Context, Result};
use prosumer_cli::output::emit;
use prosumer_cli::{CommonArgs, Scenario};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct BoundsReport {
    /// Largest achievable perturbation per hour.
    bounds: Vec<f64>,
    /// Configured upper bound per hour.
    ub: Vec<f64>,
}

pub fn handle(common: &CommonArgs) -> Result<()> {
    let scenario = Scenario::load(&common.config)?;
    let orchestrator = scenario.orchestrator()?;
    let bounds = orchestrator
        .valid_inequality_bounds()
        .context("computing valid-inequality bounds")?;
    let report = BoundsReport {
        ub: scenario.attack.ub.expand(bounds.len()),
        bounds,
    };

    emit(common.format, common.out.as_deref(), &report, |w| {
        writeln!(w, "HOUR\tBOUND\tUB")?;
        for (i, (bound, ub)) in report.bounds.iter().zip(&report.ub).enumerate() {
            writeln!(w, "{i}\t{bound:.4}\t{ub:.4}")?;
        }
        Ok(())
    })
}
