// halo_core/src/config.rs

use serde::Deserialize;

use crate::error::{ExtrapolationError, Result};
use crate::types::Time;

/// Which prediction strategy an `Extrapolator` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Newest pose + estimated velocity + gravity-corrected gyro rotation.
    #[default]
    Incremental,
    /// Explicit position/orientation/velocity integration from raw IMU data.
    StateIntegration,
}

/// Construction parameters of an `Extrapolator`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtrapolatorConfig {
    /// How much pose history is kept for velocity estimation, in seconds.
    pub pose_queue_duration: Time,
    /// Time constant of the gravity-direction low-pass filter, in seconds.
    pub imu_gravity_time_constant: f64,
    pub strategy: StrategyKind,
}

impl Default for ExtrapolatorConfig {
    fn default() -> Self {
        Self {
            // Poses are usually further apart than this, so the last two are used.
            pose_queue_duration: 0.001,
            imu_gravity_time_constant: 10.0,
            strategy: StrategyKind::Incremental,
        }
    }
}

impl ExtrapolatorConfig {
    pub fn new(pose_queue_duration: Time, imu_gravity_time_constant: f64) -> Self {
        Self {
            pose_queue_duration,
            imu_gravity_time_constant,
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.pose_queue_duration.is_finite() || self.pose_queue_duration < 0.0 {
            return Err(ExtrapolationError::InvalidConfig(format!(
                "pose_queue_duration must be finite and non-negative, got {}",
                self.pose_queue_duration
            )));
        }
        if !self.imu_gravity_time_constant.is_finite() || self.imu_gravity_time_constant <= 0.0 {
            return Err(ExtrapolationError::InvalidConfig(format!(
                "imu_gravity_time_constant must be finite and positive, got {}",
                self.imu_gravity_time_constant
            )));
        }
        Ok(())
    }
}
