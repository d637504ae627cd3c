// halo_replay/src/sensors/imu.rs

use halo_core::types::ImuSample;
use nalgebra::Vector3;
use rand_distr::{Distribution, Normal};

use crate::config::ImuConfig;
use crate::error::ReplayError;
use crate::motion::GroundTruth;
use crate::prng::ReplayRng;
use crate::sensors::RateClock;

// =========================================================================
// == IMU Simulator ==
// =========================================================================

/// A body-mounted 6-DoF IMU with additive Gaussian noise.
#[derive(Debug, Clone)]
pub struct ImuSimulator {
    pub clock: RateClock,
    gravity: f64,
    accel_noise: [Normal<f64>; 3], // X, Y, Z
    gyro_noise: [Normal<f64>; 3],  // X, Y, Z
}

fn normals(stddev: &[f64; 3]) -> Result<[Normal<f64>; 3], ReplayError> {
    let make = |s: f64| {
        Normal::new(0.0, s)
            .map_err(|e| ReplayError::InvalidScenario(format!("bad noise stddev {}: {}", s, e)))
    };
    Ok([make(stddev[0])?, make(stddev[1])?, make(stddev[2])?])
}

impl ImuSimulator {
    pub fn new(config: &ImuConfig) -> Result<Self, ReplayError> {
        Ok(Self {
            clock: RateClock::new(config.rate),
            gravity: config.gravity,
            accel_noise: normals(&config.accel_noise_stddev)?,
            gyro_noise: normals(&config.gyro_noise_stddev)?,
        })
    }

    /// Measures `truth` in the body frame.
    pub fn measure(&self, truth: &GroundTruth, rng: &mut ReplayRng) -> ImuSample {
        // --- 1. Proper acceleration: coordinate acceleration minus gravity ---
        // For a stationary platform: [0,0,0] - [0,0,-g] = [0,0,+g]
        let gravity_world = Vector3::new(0.0, 0.0, -self.gravity);
        let proper_accel_world = truth.linear_acceleration - gravity_world;

        // --- 2. Express it in the body frame ---
        let body_from_world = truth.pose.rotation.inverse();
        let perfect_accel = body_from_world * proper_accel_world;
        let perfect_gyro = truth.angular_velocity;

        // --- 3. Add noise ---
        let noisy_accel = Vector3::new(
            perfect_accel.x + self.accel_noise[0].sample(&mut rng.0),
            perfect_accel.y + self.accel_noise[1].sample(&mut rng.0),
            perfect_accel.z + self.accel_noise[2].sample(&mut rng.0),
        );
        let noisy_gyro = Vector3::new(
            perfect_gyro.x + self.gyro_noise[0].sample(&mut rng.0),
            perfect_gyro.y + self.gyro_noise[1].sample(&mut rng.0),
            perfect_gyro.z + self.gyro_noise[2].sample(&mut rng.0),
        );
        ImuSample::new(truth.time, noisy_accel, noisy_gyro)
    }
}
