// halo_replay/src/main.rs

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry, EnvFilter};

use halo_replay::cli::Cli;
use halo_replay::config::ScenarioConfig;
use halo_replay::replay;

fn main() -> ExitCode {
    let cli = Cli::parse();
    registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())))
        .with(fmt::layer())
        .init();

    // --- 1. Load Scenario Configuration ---
    info!("Loading scenario from: {}", cli.scenario.display());
    let mut config = match ScenarioConfig::load(&cli.scenario) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);

    // --- 2. Run ---
    match replay::run(&config) {
        Ok(report) => {
            report.log_summary();
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Replay aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
