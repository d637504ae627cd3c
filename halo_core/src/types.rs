// halo_core/src/types.rs

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

// --- Core Type Aliases ---
/// Timestamps and durations are expressed in seconds.
pub type Time = f64;
/// A rigid 3D transform: translation plus unit-quaternion rotation.
pub type Rigid3 = Isometry3<f64>;

/// Anything that lives on a timeline and can be stored in a `TimedBuffer`.
pub trait Timestamped {
    fn time(&self) -> Time;
}

// =========================================================================
// == Sensor Samples ==
// =========================================================================

/// A pose observation anchored in time, usually the refined output of scan matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPose {
    pub time: Time,
    pub pose: Rigid3,
}

/// One inertial reading, expressed in the tracking (body) frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    pub time: Time,
    /// Specific force in m/s^2. A level, stationary sensor reads roughly (0, 0, +g).
    pub linear_acceleration: Vector3<f64>,
    /// Angular velocity in rad/s.
    pub angular_velocity: Vector3<f64>,
}

/// One odometry reading: the pose reported by the wheel/visual odometry source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometrySample {
    pub time: Time,
    pub pose: Rigid3,
}

impl TimedPose {
    pub fn new(time: Time, pose: Rigid3) -> Self {
        Self { time, pose }
    }
}

impl ImuSample {
    pub fn new(
        time: Time,
        linear_acceleration: Vector3<f64>,
        angular_velocity: Vector3<f64>,
    ) -> Self {
        Self {
            time,
            linear_acceleration,
            angular_velocity,
        }
    }
}

impl OdometrySample {
    pub fn new(time: Time, pose: Rigid3) -> Self {
        Self { time, pose }
    }
}

impl Timestamped for TimedPose {
    fn time(&self) -> Time {
        self.time
    }
}

impl Timestamped for ImuSample {
    fn time(&self) -> Time {
        self.time
    }
}

impl Timestamped for OdometrySample {
    fn time(&self) -> Time {
        self.time
    }
}

// =========================================================================
// == Predicted Platform State ==
// =========================================================================

/// Full predicted platform state used by the state-integration strategy.
/// Velocity is expressed in the world (tracking) frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub velocity: Vector3<f64>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
        }
    }
}

impl State {
    pub fn new(
        position: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
        velocity: Vector3<f64>,
    ) -> Self {
        Self {
            position,
            orientation,
            velocity,
        }
    }

    /// The pose part of the state.
    pub fn pose(&self) -> Rigid3 {
        Isometry3::from_parts(Translation3::from(self.position), self.orientation)
    }
}

/// Converts a rotation into its axis-angle vector (axis scaled by angle in radians).
pub fn rotation_to_axis_angle(rotation: &UnitQuaternion<f64>) -> Vector3<f64> {
    rotation.scaled_axis()
}

/// Builds a rotation from an axis-angle vector (the SO(3) exponential map).
pub fn axis_angle_to_rotation(axis_angle: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_scaled_axis(*axis_angle)
}
