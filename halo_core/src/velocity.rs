// halo_core/src/velocity.rs

use nalgebra::{UnitQuaternion, Vector3};
use tracing::warn;

use crate::buffer::TimedBuffer;
use crate::types::{rotation_to_axis_angle, OdometrySample, Rigid3, Time, TimedPose};

/// Pose pairs spanning less than this are rejected as numerically unstable.
pub const MIN_VELOCITY_ESTIMATION_SPAN: Time = 0.001;

/// Linear and angular velocity of the platform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityEstimate {
    /// m/s, world frame.
    pub linear: Vector3<f64>,
    /// rad/s, axis-angle rate.
    pub angular: Vector3<f64>,
}

/// Where the velocity used for extrapolation comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelocitySource {
    Poses,
    Odometry,
}

/// Finite-difference velocity between two timed poses, or `None` if they are
/// less than [`MIN_VELOCITY_ESTIMATION_SPAN`] apart.
fn finite_difference(
    oldest_time: Time,
    oldest: &Rigid3,
    newest_time: Time,
    newest: &Rigid3,
) -> Option<(Vector3<f64>, UnitQuaternion<f64>, f64)> {
    let span = newest_time - oldest_time;
    if span < MIN_VELOCITY_ESTIMATION_SPAN {
        return None;
    }
    let translation_delta = newest.translation.vector - oldest.translation.vector;
    let rotation_delta = oldest.rotation.inverse() * newest.rotation;
    Some((translation_delta, rotation_delta, span))
}

/// Velocity implied by the two extreme poses of the pose window.
/// Returns `None` (and warns) when the window is too short.
pub fn velocity_from_poses(poses: &TimedBuffer<TimedPose>) -> Option<VelocityEstimate> {
    if poses.len() < 2 {
        // We need two poses to estimate velocities.
        return None;
    }
    let oldest = poses.front()?;
    let newest = poses.back()?;
    match finite_difference(oldest.time, &oldest.pose, newest.time, &newest.pose) {
        Some((translation_delta, rotation_delta, span)) => Some(VelocityEstimate {
            linear: translation_delta / span,
            angular: rotation_to_axis_angle(&rotation_delta) / span,
        }),
        None => {
            warn!(
                "Queue too short for velocity estimation. Queue duration: {:.3} ms",
                (newest.time - oldest.time) * 1e3
            );
            None
        }
    }
}

/// Velocity implied by the two extreme odometry samples, with the linear part
/// expressed in the tracking frame at the newest odometry time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometryDelta {
    pub newest_time: Time,
    pub angular: Vector3<f64>,
    pub linear_in_tracking_frame: Vector3<f64>,
}

pub fn odometry_delta(odometry: &TimedBuffer<OdometrySample>) -> Option<OdometryDelta> {
    if odometry.len() < 2 {
        return None;
    }
    let oldest = odometry.front()?;
    let newest = odometry.back()?;
    match finite_difference(oldest.time, &oldest.pose, newest.time, &newest.pose) {
        Some((translation_delta, rotation_delta, span)) => Some(OdometryDelta {
            newest_time: newest.time,
            angular: rotation_to_axis_angle(&rotation_delta) / span,
            linear_in_tracking_frame: newest.pose.rotation.inverse() * translation_delta / span,
        }),
        None => {
            warn!(
                "Odometry too short for velocity estimation. Duration: {:.3} ms",
                (newest.time - oldest.time) * 1e3
            );
            None
        }
    }
}

/// Holds the latest pose- and odometry-derived estimates and picks one.
#[derive(Debug, Clone, Default)]
pub struct VelocityEstimator {
    from_poses: VelocityEstimate,
    from_odometry: VelocityEstimate,
}

impl VelocityEstimator {
    /// Recomputes the pose-derived estimate. The previous estimate is kept if
    /// the window is degenerate. Returns whether an update happened.
    pub fn update_from_poses(&mut self, poses: &TimedBuffer<TimedPose>) -> bool {
        match velocity_from_poses(poses) {
            Some(estimate) => {
                self.from_poses = estimate;
                true
            }
            None => false,
        }
    }

    pub fn set_odometry_angular(&mut self, angular: Vector3<f64>) {
        self.from_odometry.angular = angular;
    }

    /// `linear` must already be in the world frame.
    pub fn set_odometry_linear(&mut self, linear: Vector3<f64>) {
        self.from_odometry.linear = linear;
    }

    pub fn from_poses(&self) -> &VelocityEstimate {
        &self.from_poses
    }

    pub fn from_odometry(&self) -> &VelocityEstimate {
        &self.from_odometry
    }

    /// Odometry wins whenever at least two odometry samples are buffered.
    pub fn source(odometry_len: usize) -> VelocitySource {
        if odometry_len < 2 {
            VelocitySource::Poses
        } else {
            VelocitySource::Odometry
        }
    }

    pub fn select(&self, odometry_len: usize) -> &VelocityEstimate {
        match Self::source(odometry_len) {
            VelocitySource::Poses => &self.from_poses,
            VelocitySource::Odometry => &self.from_odometry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RetentionPolicy;
    use crate::error::SampleKind;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Isometry3, Translation3};

    fn pose_at(time: Time, x: f64, yaw: f64) -> TimedPose {
        TimedPose::new(
            time,
            Isometry3::from_parts(
                Translation3::new(x, 0.0, 0.0),
                UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
            ),
        )
    }

    fn poses(samples: &[TimedPose]) -> TimedBuffer<TimedPose> {
        let mut buffer = TimedBuffer::new(SampleKind::Pose, RetentionPolicy::poses(1.0));
        for s in samples {
            buffer.push(*s).unwrap();
        }
        buffer
    }

    #[test]
    fn test_linear_velocity_from_two_poses() {
        let buffer = poses(&[pose_at(0.0, 0.0, 0.0), pose_at(0.1, 1.0, 0.0)]);
        let estimate = velocity_from_poses(&buffer).unwrap();
        assert_abs_diff_eq!(estimate.linear, Vector3::new(10.0, 0.0, 0.0), epsilon = 1e-9);
        assert_abs_diff_eq!(estimate.angular, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_angular_velocity_from_two_poses() {
        let buffer = poses(&[pose_at(0.0, 0.0, 0.1), pose_at(0.5, 0.0, 0.6)]);
        let estimate = velocity_from_poses(&buffer).unwrap();
        assert_abs_diff_eq!(estimate.angular, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_short_window_keeps_previous_estimate() {
        let mut estimator = VelocityEstimator::default();
        let degenerate = poses(&[pose_at(0.0, 0.0, 0.0), pose_at(0.0005, 100.0, 0.0)]);
        assert!(!estimator.update_from_poses(&degenerate));
        assert_eq!(estimator.from_poses().linear, Vector3::zeros());

        let good = poses(&[pose_at(0.0, 0.0, 0.0), pose_at(0.1, 1.0, 0.0)]);
        assert!(estimator.update_from_poses(&good));
        let degenerate_later = poses(&[pose_at(1.0, 0.0, 0.0), pose_at(1.0005, 100.0, 0.0)]);
        assert!(!estimator.update_from_poses(&degenerate_later));
        assert_abs_diff_eq!(estimator.from_poses().linear.x, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_single_pose_gives_no_estimate() {
        assert!(velocity_from_poses(&poses(&[pose_at(0.0, 0.0, 0.0)])).is_none());
    }

    #[test]
    fn test_odometry_delta_is_in_newest_tracking_frame() {
        let mut odometry = TimedBuffer::new(SampleKind::Odometry, RetentionPolicy::odometry());
        // Facing +y (yaw 90 deg) and moving along world +y: forward in the body frame.
        let yaw = std::f64::consts::FRAC_PI_2;
        odometry.push(OdometrySample::new(0.0, pose_at(0.0, 0.0, yaw).pose)).unwrap();
        let moved = Isometry3::from_parts(
            Translation3::new(0.0, 2.0, 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
        );
        odometry.push(OdometrySample::new(1.0, moved)).unwrap();
        let delta = odometry_delta(&odometry).unwrap();
        assert_abs_diff_eq!(delta.linear_in_tracking_frame, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-9);
        assert_abs_diff_eq!(delta.angular, Vector3::zeros(), epsilon = 1e-12);
        assert_eq!(delta.newest_time, 1.0);
    }

    #[test]
    fn test_odometry_is_preferred_with_two_samples() {
        let mut estimator = VelocityEstimator::default();
        estimator.update_from_poses(&poses(&[pose_at(0.0, 0.0, 0.0), pose_at(0.1, 1.0, 0.0)]));
        estimator.set_odometry_linear(Vector3::new(-3.0, 0.0, 0.0));
        assert_eq!(VelocityEstimator::source(1), VelocitySource::Poses);
        assert_abs_diff_eq!(estimator.select(1).linear.x, 10.0, epsilon = 1e-9);
        assert_eq!(VelocityEstimator::source(2), VelocitySource::Odometry);
        assert_abs_diff_eq!(estimator.select(2).linear.x, -3.0, epsilon = 1e-12);
    }
}
