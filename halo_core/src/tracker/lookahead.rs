// halo_core/src/tracker/lookahead.rs

//! Advancing a tracker through buffered IMU data.
//!
//! `advance_tracker` mutates the tracker it is given; `tracker_at` and
//! `orientation_at` take an immutable snapshot and work on a disposable copy,
//! so answering "what would the orientation be at T" never disturbs the
//! authoritative tracker.

use nalgebra::{UnitQuaternion, Vector3};

use crate::buffer::TimedBuffer;
use crate::error::{ExtrapolationError, Result};
use crate::tracker::OrientationTracker;
use crate::types::{ImuSample, Time};

/// Advances `tracker` to `time`, feeding it every buffered IMU sample on the way.
///
/// When no IMU data covers `time`, the tracker is advanced with the given
/// `fallback_angular_velocity` and a fake +Z gravity observation, which keeps
/// planar platforms without an IMU stable.
pub fn advance_tracker(
    tracker: &mut dyn OrientationTracker,
    imu: &TimedBuffer<ImuSample>,
    fallback_angular_velocity: &Vector3<f64>,
    time: Time,
) -> Result<()> {
    if time < tracker.time() {
        return Err(ExtrapolationError::IntoThePast {
            requested: time,
            newest: tracker.time(),
        });
    }

    let oldest_imu_time = match imu.oldest_time() {
        Some(t) if time >= t => t,
        _ => {
            // No IMU data until `time`.
            tracker.advance(time);
            tracker.observe_linear_acceleration(&Vector3::z());
            tracker.observe_angular_velocity(fallback_angular_velocity);
            return Ok(());
        }
    };

    if tracker.time() < oldest_imu_time {
        tracker.advance(oldest_imu_time);
    }

    let mut index = imu.lower_bound(tracker.time());
    while let Some(sample) = imu.get(index) {
        if sample.time >= time {
            break;
        }
        tracker.advance(sample.time);
        tracker.observe_linear_acceleration(&sample.linear_acceleration);
        tracker.observe_angular_velocity(&sample.angular_velocity);
        index += 1;
    }
    tracker.advance(time);
    Ok(())
}

/// A copy of `tracker` advanced to `time`. The given tracker is left untouched.
pub fn tracker_at(
    tracker: &(dyn OrientationTracker + 'static),
    imu: &TimedBuffer<ImuSample>,
    fallback_angular_velocity: &Vector3<f64>,
    time: Time,
) -> Result<Box<dyn OrientationTracker>> {
    let mut copy = dyn_clone::clone_box(tracker);
    advance_tracker(copy.as_mut(), imu, fallback_angular_velocity, time)?;
    Ok(copy)
}

/// The orientation `tracker` would report at `time`.
pub fn orientation_at(
    tracker: &(dyn OrientationTracker + 'static),
    imu: &TimedBuffer<ImuSample>,
    fallback_angular_velocity: &Vector3<f64>,
    time: Time,
) -> Result<UnitQuaternion<f64>> {
    Ok(tracker_at(tracker, imu, fallback_angular_velocity, time)?.orientation())
}
