// halo_replay/src/config.rs

use figment::{
    providers::{Format, Toml},
    Figment,
};
use halo_core::config::{ExtrapolatorConfig, StrategyKind};
use halo_core::types::Time;
use nalgebra::Vector3;
use serde::Deserialize;
use std::path::Path;

use crate::error::ReplayError;

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// # ScenarioConfig
/// Root of the data parsed from a `scenario.toml` file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)] // Use default if the [simulation] section is missing
    pub simulation: Simulation,

    #[serde(default)]
    pub motion: Motion,

    #[serde(default)]
    pub imu: ImuConfig,

    #[serde(default)]
    pub odometry: OdometryConfig,

    #[serde(default)]
    pub observer: ObserverConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub extrapolator: ExtrapolatorConfig,
}

impl ScenarioConfig {
    /// Loads and validates a scenario file.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        // Figment treats a missing file as an empty one.
        if !path.is_file() {
            return Err(ReplayError::InvalidScenario(format!(
                "scenario file not found: {}",
                path.display()
            )));
        }
        let config: ScenarioConfig = Figment::new().merge(Toml::file(path)).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ReplayError> {
        let config: ScenarioConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReplayError> {
        self.extrapolator.validate()?;
        let rates = [
            ("imu.rate", self.imu.rate),
            ("odometry.rate", self.odometry.rate),
            ("pipeline.scan_rate", self.pipeline.scan_rate),
        ];
        for (name, rate) in rates {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(ReplayError::InvalidScenario(format!(
                    "{} must be positive, got {}",
                    name, rate
                )));
            }
        }
        if self.pipeline.scans_per_accumulation == 0 {
            return Err(ReplayError::InvalidScenario(
                "pipeline.scans_per_accumulation must be at least 1".to_string(),
            ));
        }
        if !self.simulation.duration_seconds.is_finite() || self.simulation.duration_seconds < 0.0 {
            return Err(ReplayError::InvalidScenario(format!(
                "simulation.duration_seconds must be non-negative, got {}",
                self.simulation.duration_seconds
            )));
        }
        Ok(())
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in a scenario.toml file.
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Simulation {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Duration of the replay in seconds.
    pub duration_seconds: Time,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: None,
            duration_seconds: 10.0,
        }
    }
}

/// Ground-truth motion of the platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")] // The "type" field decides which variant to parse
#[serde(rename_all = "PascalCase")]
pub enum Motion {
    Stationary,
    ConstantVelocity {
        #[serde(with = "serde_helpers::vec3_from_array")]
        velocity: Vector3<f64>,
    },
    ConstantAcceleration {
        #[serde(with = "serde_helpers::vec3_from_array")]
        acceleration: Vector3<f64>,
    },
    /// Driving a horizontal circle counter-clockwise, facing along the path.
    Circle {
        radius: f64,
        /// rad/s
        angular_speed: f64,
    },
}

impl Default for Motion {
    fn default() -> Self {
        Motion::Circle {
            radius: 5.0,
            angular_speed: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImuConfig {
    /// Hz
    pub rate: f64,
    /// Magnitude of gravity in m/s^2.
    pub gravity: f64,
    // Be explicit about what the noise values mean
    pub accel_noise_stddev: [f64; 3], // [x, y, z]
    pub gyro_noise_stddev: [f64; 3],  // [roll, pitch, yaw]
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            rate: 200.0,
            gravity: 9.81,
            accel_noise_stddev: [0.0; 3],
            gyro_noise_stddev: [0.0; 3],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OdometryConfig {
    pub enabled: bool,
    /// Hz
    pub rate: f64,
    /// Per-axis translation noise, m.
    pub translation_noise_stddev: f64,
    /// Yaw noise, rad.
    pub rotation_noise_stddev: f64,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: 50.0,
            translation_noise_stddev: 0.0,
            rotation_noise_stddev: 0.0,
        }
    }
}

/// Noise of the stand-in scan matcher that refines predicted poses.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObserverConfig {
    pub translation_noise_stddev: f64,
    pub rotation_noise_stddev: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            translation_noise_stddev: 0.01,
            rotation_noise_stddev: 0.002,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Range scans per second.
    pub scan_rate: f64,
    /// Scans accumulated before one match is run.
    pub scans_per_accumulation: usize,
    /// Run a second extrapolator fed only with its own predictions.
    pub cross_validate: bool,
    pub cross_validation_strategy: StrategyKind,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scan_rate: 10.0,
            scans_per_accumulation: 1,
            cross_validate: true,
            cross_validation_strategy: StrategyKind::StateIntegration,
        }
    }
}

pub mod serde_helpers {
    pub mod vec3_from_array {
        use nalgebra::Vector3;
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Vector3<f64>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let arr: [f64; 3] = Deserialize::deserialize(deserializer)?;
            Ok(Vector3::new(arr[0], arr[1], arr[2]))
        }
    }
}
