//! Scenario files.
//!
//! A scenario is a TOML document with five tables, all optional except the
//! time series:
//!
//! ```toml
//! [house]
//! total_demand = 3500.0
//! buy_price = 0.25
//!
//! [series]
//! demand_file = "time_series/demand.csv"
//! pv_file = "time_series/pv.csv"
//! hours = 24
//!
//! [attack]
//! lb = -0.8
//! ub = 0.8
//!
//! [padm]
//! initial_mu = 1.0
//!
//! [solver]
//! engine = "microlp"
//! timeout_seconds = 600
//! ```
//!
//! Relative series paths are resolved against the scenario file's directory.

use anyhow::{anyhow, bail, Context, Result};
use prosumer_algo::{AttackOrchestrator, GoodLpBackend, LpEngine, SolverConfig};
use prosumer_core::{AttackParameters, HouseParameters, PadmParameters};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::series::{read_series, truncate};

/// Prices and totals of the household.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseSection {
    pub lifetime: u32,
    pub pv_unit_price: f64,
    pub battery_unit_price: f64,
    pub buy_price: f64,
    pub sell_price: f64,
    pub total_demand: f64,
}

impl Default for HouseSection {
    fn default() -> Self {
        Self {
            lifetime: 12 * 10 * 30 * 4,
            pv_unit_price: 1000.0,
            battery_unit_price: 140.0,
            buy_price: 0.25,
            sell_price: 0.05,
            total_demand: 3500.0,
        }
    }
}

/// Hourly profiles, given inline or as files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesSection {
    pub demand_shares: Option<Vec<f64>>,
    pub pv_availability: Option<Vec<f64>>,
    pub demand_file: Option<PathBuf>,
    pub pv_file: Option<PathBuf>,
    /// Keep only the first `hours` values of both profiles.
    pub hours: Option<usize>,
}

/// Backend selection plus limits and tolerances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSection {
    pub engine: LpEngine,
    #[serde(flatten)]
    pub limits: SolverConfig,
}

/// Raw contents of a scenario file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub house: HouseSection,
    pub series: SeriesSection,
    pub attack: AttackParameters,
    pub padm: PadmParameters,
    pub solver: SolverSection,
}

impl ScenarioConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing scenario TOML")
    }
}

/// A scenario with its time series loaded.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub house: HouseParameters,
    pub attack: AttackParameters,
    pub padm: PadmParameters,
    pub solver: SolverSection,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading scenario file: {}", path.display()))?;
        let config = ScenarioConfig::from_toml(&text)
            .with_context(|| format!("in scenario file {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_config(config, base)
    }

    /// Resolves the series of `config`, reading files relative to `base`.
    pub fn from_config(config: ScenarioConfig, base: &Path) -> Result<Self> {
        let series = &config.series;
        let demand_shares = resolve(
            "demand",
            series.demand_shares.as_ref(),
            series.demand_file.as_deref(),
            base,
        )?;
        let pv_availability = resolve(
            "pv",
            series.pv_availability.as_ref(),
            series.pv_file.as_deref(),
            base,
        )?;

        let h = &config.house;
        let house = HouseParameters {
            lifetime: h.lifetime,
            pv_unit_price: h.pv_unit_price,
            battery_unit_price: h.battery_unit_price,
            buy_price: h.buy_price,
            sell_price: h.sell_price,
            total_demand: h.total_demand,
            demand_shares: truncate(demand_shares, series.hours),
            pv_availability: truncate(pv_availability, series.hours),
        };
        info!(hours = house.hours(), "scenario loaded");

        Ok(Self {
            house,
            attack: config.attack,
            padm: config.padm,
            solver: config.solver,
        })
    }

    /// Validated orchestrator on the configured backend.
    pub fn orchestrator(&self) -> Result<AttackOrchestrator> {
        let backend = GoodLpBackend::new(self.solver.engine);
        debug!(engine = self.solver.engine.id(), "using good_lp backend");
        let orchestrator = AttackOrchestrator::new(self.house.clone(), self.attack.clone())
            .context("validating scenario")?
            .with_backend(Arc::new(backend))
            .with_config(self.solver.limits.clone());
        Ok(orchestrator)
    }
}

fn resolve(
    name: &str,
    inline: Option<&Vec<f64>>,
    file: Option<&Path>,
    base: &Path,
) -> Result<Vec<f64>> {
    match (inline, file) {
        (Some(values), None) => Ok(values.clone()),
        (None, Some(file)) => {
            let path = if file.is_absolute() {
                file.to_path_buf()
            } else {
                base.join(file)
            };
            read_series(&path).with_context(|| format!("loading {name} series"))
        }
        (Some(_), Some(_)) => bail!("{name} series given both inline and as a file"),
        (None, None) => Err(anyhow!("missing {name} series in [series]")),
    }
}
