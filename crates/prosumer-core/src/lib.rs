//! # prosumer-core: parameter sets for the bilevel prosumer models
//!
//! Immutable inputs shared by every model the workspace builds:
//!
//! - [`HouseParameters`]: investment and energy prices plus the hourly demand
//!   share and PV availability profiles.
//! - [`AttackParameters`]: perturbation bounds, capacity overrides, objective
//!   norm and deviation budget of the attacker.
//! - [`PadmParameters`]: penalty schedule and tolerances of the PADM heuristic.
//!
//! All containers are `serde`-enabled so they can be read from a scenario
//! file, and expose a `validate` method that fails fast with a
//! [`ConfigError`] before any optimization model is built.

pub mod attack;
pub mod error;
pub mod house;
pub mod padm;

pub use attack::{AttackParameters, HourlyBound, ObjectiveNorm};
pub use error::{ConfigError, ConfigResult};
pub use house::HouseParameters;
pub use padm::PadmParameters;
