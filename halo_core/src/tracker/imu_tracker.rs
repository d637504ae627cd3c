// halo_core/src/tracker/imu_tracker.rs

use nalgebra::{UnitQuaternion, Vector3};
use tracing::warn;

use crate::tracker::OrientationTracker;
use crate::types::{axis_angle_to_rotation, Time};

/// Gyro integration with a low-pass gravity-direction correction.
///
/// The accelerometer is exponentially averaged with time constant
/// `gravity_time_constant`; after each averaging step the orientation is
/// nudged so that the averaged gravity direction maps onto +Z.
#[derive(Debug, Clone)]
pub struct ImuTracker {
    gravity_time_constant: f64,
    time: Time,
    last_linear_acceleration_time: Option<Time>,
    orientation: UnitQuaternion<f64>,
    /// Averaged specific force in the body frame.
    gravity_vector: Vector3<f64>,
    angular_velocity: Vector3<f64>,
    gravity_velocity: Vector3<f64>,
}

impl ImuTracker {
    pub fn new(gravity_time_constant: f64, start_time: Time) -> Self {
        Self {
            gravity_time_constant,
            time: start_time,
            last_linear_acceleration_time: None,
            orientation: UnitQuaternion::identity(),
            gravity_vector: Vector3::z(),
            angular_velocity: Vector3::zeros(),
            gravity_velocity: Vector3::zeros(),
        }
    }

    /// Factory matching [`crate::tracker::TrackerFactory`].
    pub fn boxed(gravity_time_constant: f64, start_time: Time) -> Box<dyn OrientationTracker> {
        Box::new(Self::new(gravity_time_constant, start_time))
    }

    /// The averaged specific force in the body frame.
    pub fn gravity_vector(&self) -> Vector3<f64> {
        self.gravity_vector
    }
}

impl OrientationTracker for ImuTracker {
    fn advance(&mut self, time: Time) {
        assert!(
            time >= self.time,
            "ImuTracker::advance: cannot go back from {} to {}",
            self.time,
            time
        );
        let delta_t = time - self.time;
        let rotation = axis_angle_to_rotation(&(self.angular_velocity * delta_t));

        // The world-frame gravity is invariant under this step, so integrate it first.
        self.gravity_velocity += (self.orientation * self.gravity_vector) * delta_t;

        self.orientation = UnitQuaternion::new_normalize((self.orientation * rotation).into_inner());
        self.gravity_vector = rotation.inverse() * self.gravity_vector;
        self.time = time;
    }

    fn observe_linear_acceleration(&mut self, linear_acceleration: &Vector3<f64>) {
        // Full trust in the very first reading.
        let alpha = match self.last_linear_acceleration_time {
            Some(last) => 1.0 - (-(self.time - last) / self.gravity_time_constant).exp(),
            None => 1.0,
        };
        self.last_linear_acceleration_time = Some(self.time);
        self.gravity_vector = self.gravity_vector * (1.0 - alpha) + linear_acceleration * alpha;

        // Rotate the orientation so that it agrees with the averaged gravity.
        let up_in_body = self.orientation.inverse() * Vector3::z();
        let correction = match UnitQuaternion::rotation_between(&self.gravity_vector, &up_in_body) {
            Some(r) => r,
            None => {
                warn!(
                    "Gravity estimate {:?} is degenerate against up {:?}; skipping alignment.",
                    self.gravity_vector, up_in_body
                );
                UnitQuaternion::identity()
            }
        };
        self.orientation =
            UnitQuaternion::new_normalize((self.orientation * correction).into_inner());
    }

    fn observe_angular_velocity(&mut self, angular_velocity: &Vector3<f64>) {
        self.angular_velocity = *angular_velocity;
    }

    fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientation
    }

    fn time(&self) -> Time {
        self.time
    }

    fn gravity_velocity(&self) -> Vector3<f64> {
        self.gravity_velocity
    }
}
