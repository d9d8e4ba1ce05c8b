pub mod cli;
pub mod config;
pub mod output;
pub mod series;

pub use cli::{build_cli_command, Cli, Commands, CommonArgs, OutputFormat, Strategy};
pub use config::{Scenario, ScenarioConfig};
