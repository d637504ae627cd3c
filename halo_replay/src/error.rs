// halo_replay/src/error.rs

use halo_core::error::ExtrapolationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to load scenario: {0}")]
    Config(#[from] figment::Error),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error(transparent)]
    Extrapolation(#[from] ExtrapolationError),
}

impl ReplayError {
    /// Whether the replay must stop. Everything except "not ready" is fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            ReplayError::Extrapolation(e) => e.is_fatal(),
            _ => true,
        }
    }
}
