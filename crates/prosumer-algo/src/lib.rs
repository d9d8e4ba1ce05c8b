//! # prosumer-algo: bilevel attack models on a prosumer's dispatch
//!
//! A prosumer with PV and a battery sizes its assets and dispatches them
//! hour by hour to minimize cost. An attacker who controls a bounded
//! perturbation of the demand profile wants the largest deviation that
//! keeps the dispatch optimal for the prosumer. This crate builds that
//! bilevel program and solves it three exact ways plus a heuristic:
//!
//! | Strategy | Complementarity | Call |
//! |----------|-----------------|------|
//! | big-M | binary indicator per pair | [`AttackOrchestrator::solve_big_m_attack`] |
//! | SOS1 | one SOS1 set per pair | [`AttackOrchestrator::solve_sos1_attack`] |
//! | SOS1 + cut | SOS1 and a bound on the primal cost | [`AttackOrchestrator::solve_tightened_sos1_attack`] |
//! | PADM | penalty on the duality gap | [`AttackOrchestrator::solve_padm`] |
//!
//! ## Architecture
//!
//! - [`solver`]: typed LP/MILP model, scoped bound pinning and the
//!   [`MilpBackend`] trait. [`GoodLpBackend`] runs `good_lp` engines and
//!   branches on SOS1 sets itself.
//! - [`bilevel`]: the canonical formulation, shared by every strategy.
//!
//! ## Example
//!
//! ```ignore
//! use prosumer_algo::AttackOrchestrator;
//! use prosumer_core::{AttackParameters, HouseParameters};
//!
//! let house: HouseParameters = toml::from_str(&std::fs::read_to_string("house.toml")?)?;
//! let orchestrator = AttackOrchestrator::new(house, AttackParameters::bounded(-0.8, 0.8))?;
//!
//! let baseline = orchestrator.solve_baseline()?;
//! let attack = orchestrator.solve_sos1_attack()?;
//! println!("cost {} -> {}", baseline.primal_objective, attack.primal_objective);
//! ```

pub mod bilevel;
pub mod solver;

pub use bilevel::{
    AttackError, AttackOrchestrator, AttackOutcome, BaselineOutcome, BigMAdvisor,
    DispatchSolution, DualBaselineOutcome, PadmOutcome, PadmTermination, Reformulation,
    SolveStage,
};
pub use solver::{GoodLpBackend, LpEngine, MilpBackend, SolveStatus, SolverConfig};
