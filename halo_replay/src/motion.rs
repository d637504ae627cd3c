// halo_replay/src/motion.rs

use halo_core::types::{Rigid3, Time};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use crate::config::Motion;

/// The true kinematic state of the platform at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTruth {
    pub time: Time,
    pub pose: Rigid3,
    /// World frame, m/s.
    pub linear_velocity: Vector3<f64>,
    /// Coordinate acceleration in the world frame, m/s^2 (gravity not included).
    pub linear_acceleration: Vector3<f64>,
    /// Body frame, rad/s.
    pub angular_velocity: Vector3<f64>,
}

impl Motion {
    /// Evaluates the analytic trajectory at `time`. Every motion starts at the
    /// identity pose at t=0.
    pub fn ground_truth(&self, time: Time) -> GroundTruth {
        match self {
            Motion::Stationary => GroundTruth {
                time,
                pose: Isometry3::identity(),
                linear_velocity: Vector3::zeros(),
                linear_acceleration: Vector3::zeros(),
                angular_velocity: Vector3::zeros(),
            },
            Motion::ConstantVelocity { velocity } => GroundTruth {
                time,
                pose: Isometry3::from_parts(Translation3::from(velocity * time), UnitQuaternion::identity()),
                linear_velocity: *velocity,
                linear_acceleration: Vector3::zeros(),
                angular_velocity: Vector3::zeros(),
            },
            Motion::ConstantAcceleration { acceleration } => GroundTruth {
                time,
                pose: Isometry3::from_parts(
                    Translation3::from(acceleration * (0.5 * time * time)),
                    UnitQuaternion::identity(),
                ),
                linear_velocity: acceleration * time,
                linear_acceleration: *acceleration,
                angular_velocity: Vector3::zeros(),
            },
            Motion::Circle { radius, angular_speed } => {
                let (r, w) = (*radius, *angular_speed);
                let (sin, cos) = (w * time).sin_cos();
                GroundTruth {
                    time,
                    pose: Isometry3::from_parts(
                        Translation3::new(r * sin, r * (1.0 - cos), 0.0),
                        UnitQuaternion::from_euler_angles(0.0, 0.0, w * time),
                    ),
                    linear_velocity: Vector3::new(r * w * cos, r * w * sin, 0.0),
                    linear_acceleration: Vector3::new(-r * w * w * sin, r * w * w * cos, 0.0),
                    angular_velocity: Vector3::new(0.0, 0.0, w),
                }
            }
        }
    }
}
