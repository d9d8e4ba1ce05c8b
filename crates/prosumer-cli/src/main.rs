use anyhow::Result;
use clap::Parser;
use prosumer_cli::cli::{Cli, Commands};
use std::io;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Baseline { common } => commands::baseline::handle(common),
        Commands::Attack {
            common,
            strategy,
            big_m,
        } => commands::attack::handle(common, *strategy, *big_m),
        Commands::Padm { common } => commands::padm::handle(common),
        Commands::Bounds { common } => commands::bounds::handle(common),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(cli.log_level.into()))
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => {
            info!("done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("command failed: {err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
