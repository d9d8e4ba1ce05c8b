use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "prosumer",
    author,
    version,
    about = "Bilevel attack analysis of a prosumer's PV and battery dispatch",
    long_about = None
)]
pub struct Cli {
    /// Set the logging level; RUST_LOG adds per-target directives
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments shared by every command.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Scenario file (TOML)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve the unperturbed dispatch and check strong duality
    Baseline {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Solve the attack with an exact KKT reformulation
    Attack {
        #[command(flatten)]
        common: CommonArgs,

        /// Complementarity encoding
        #[arg(long, value_enum, default_value_t = Strategy::Sos1)]
        strategy: Strategy,

        /// Big-M constant (big-m strategy only); derived from the data when omitted
        #[arg(long)]
        big_m: Option<f64>,
    },
    /// Run the penalty alternating direction heuristic
    Padm {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Per-hour perturbation bounds used by the tightened SOS1 strategy
    Bounds {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Binary indicator per complementarity pair
    BigM,
    /// One SOS1 set per complementarity pair
    Sos1,
    /// SOS1 plus a valid inequality on the primal cost
    Sos1Tightened,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn test_attack_arguments() {
        let cli = Cli::try_parse_from([
            "prosumer",
            "attack",
            "--config",
            "scenario.toml",
            "--strategy",
            "big-m",
            "--big-m",
            "5000",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Attack {
                common,
                strategy,
                big_m,
            } => {
                assert_eq!(common.config, PathBuf::from("scenario.toml"));
                assert_eq!(common.format, OutputFormat::Json);
                assert_eq!(strategy, Strategy::BigM);
                assert_eq!(big_m, Some(5000.0));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
