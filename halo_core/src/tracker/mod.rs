// halo_core/src/tracker/mod.rs

use crate::types::Time;
use dyn_clone::DynClone;
use nalgebra::{UnitQuaternion, Vector3};
use std::fmt::Debug;

// --- ORIENTATION TRACKER TRAIT ---
/// The contract for anything that maintains a continuously advancing,
/// gravity-corrected orientation estimate.
///
/// The extrapolator owns exactly one authoritative tracker per trajectory.
/// Trackers must be cheaply clonable: non-mutating "what would the orientation
/// be at T" queries run on a disposable copy (see [`lookahead`]).
pub trait OrientationTracker: DynClone + Debug + Send + Sync {
    /// Propagates the orientation to `time` using the most recently observed
    /// angular velocity. `time` must not be before [`OrientationTracker::time`].
    fn advance(&mut self, time: Time);

    /// Registers the latest accelerometer reading (specific force, body frame).
    fn observe_linear_acceleration(&mut self, linear_acceleration: &Vector3<f64>);

    /// Registers the latest gyroscope reading (rad/s, body frame).
    fn observe_angular_velocity(&mut self, angular_velocity: &Vector3<f64>);

    /// Current estimate of the rotation from the body frame to the
    /// gravity-aligned tracking frame.
    fn orientation(&self) -> UnitQuaternion<f64>;

    /// The time the tracker has been advanced to.
    fn time(&self) -> Time;

    /// Running world-frame integral of the gravitational specific force since
    /// the tracker was created. Differences between two readings give the
    /// velocity attributable to gravity over that interval.
    fn gravity_velocity(&self) -> Vector3<f64>;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn OrientationTracker>`.
dyn_clone::clone_trait_object!(OrientationTracker);

/// Builds a tracker from a gravity time constant and a start time.
pub type TrackerFactory = fn(gravity_time_constant: f64, start_time: Time) -> Box<dyn OrientationTracker>;

mod imu_tracker;
pub mod lookahead;

pub use imu_tracker::ImuTracker;
