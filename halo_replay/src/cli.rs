// halo_replay/src/cli.rs

use clap::{Parser, ValueEnum};
use halo_core::config::StrategyKind;
use std::path::PathBuf;

use crate::config::ScenarioConfig;

/// Halo replay: drives the pose extrapolator with a synthetic sensor stream.
///
/// This struct defines the command-line arguments of the `halo_replay` binary.
/// Every flag that is given overrides the corresponding scenario value.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/default.toml")]
    pub scenario: PathBuf,

    /// Seed for the noise generator.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Replay duration in seconds.
    #[arg(long)]
    pub duration: Option<f64>,

    /// Prediction strategy of the primary extrapolator.
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Enable debug logging for the extrapolator.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Incremental,
    StateIntegration,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Incremental => StrategyKind::Incremental,
            StrategyArg::StateIntegration => StrategyKind::StateIntegration,
        }
    }
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut ScenarioConfig) {
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
        if let Some(duration) = self.duration {
            config.simulation.duration_seconds = duration;
        }
        if let Some(strategy) = self.strategy {
            config.extrapolator.strategy = strategy.into();
        }
    }

    /// Default `RUST_LOG` directive when the environment does not set one.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "info,halo_core=debug,halo_replay=debug"
        } else {
            "info"
        }
    }
}
