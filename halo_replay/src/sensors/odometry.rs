// halo_replay/src/sensors/odometry.rs

use halo_core::types::OdometrySample;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rand_distr::{Distribution, Normal};

use crate::config::OdometryConfig;
use crate::error::ReplayError;
use crate::motion::GroundTruth;
use crate::prng::ReplayRng;
use crate::sensors::RateClock;

/// Wheel-odometry stand-in: reports the true pose with independent
/// per-reading planar noise.
#[derive(Debug, Clone)]
pub struct OdometrySimulator {
    pub clock: RateClock,
    translation_noise: Normal<f64>,
    yaw_noise: Normal<f64>,
}

impl OdometrySimulator {
    pub fn new(config: &OdometryConfig) -> Result<Self, ReplayError> {
        let normal = |s: f64| {
            Normal::new(0.0, s)
                .map_err(|e| ReplayError::InvalidScenario(format!("bad odometry noise {}: {}", s, e)))
        };
        Ok(Self {
            clock: RateClock::new(config.rate),
            translation_noise: normal(config.translation_noise_stddev)?,
            yaw_noise: normal(config.rotation_noise_stddev)?,
        })
    }

    pub fn measure(&self, truth: &GroundTruth, rng: &mut ReplayRng) -> OdometrySample {
        let offset = Vector3::new(
            self.translation_noise.sample(&mut rng.0),
            self.translation_noise.sample(&mut rng.0),
            0.0,
        );
        let yaw = UnitQuaternion::from_euler_angles(0.0, 0.0, self.yaw_noise.sample(&mut rng.0));
        let pose = Isometry3::from_parts(
            Translation3::from(truth.pose.translation.vector + offset),
            truth.pose.rotation * yaw,
        );
        OdometrySample::new(truth.time, pose)
    }
}
