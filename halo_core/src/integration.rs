// halo_core/src/integration.rs

//! First-order strapdown integration of buffered IMU samples.
//!
//! The integrator is generic over the scalar type `T` used for the velocity
//! terms, so the same routine can run on `f64` for prediction and on a dual /
//! jet number type when derivatives with respect to the linear-acceleration
//! calibration are needed. Rotations are always kept as `f64` quaternions.

use nalgebra::{Matrix3, RealField, UnitQuaternion, Vector3};

use crate::buffer::TimedBuffer;
use crate::types::{axis_angle_to_rotation, ImuSample, Time};

/// Position of the integrator inside an IMU buffer. Callers keep it alive
/// across a monotonic series of `integrate_imu` calls to reuse prior work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImuCursor(pub usize);

impl ImuCursor {
    /// Finds the cursor that brackets `time`: the newest sample at or before it.
    /// Returns `None` if every buffered sample is after `time`.
    pub fn bracketing(imu: &TimedBuffer<ImuSample>, time: Time) -> Option<Self> {
        imu.last_at_or_before(time).map(ImuCursor)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Sensor-extrinsics hooks applied to raw readings before use.
#[derive(Debug, Clone, PartialEq)]
pub struct ImuCalibration<T: RealField + Copy> {
    pub linear_acceleration: Matrix3<T>,
    pub angular_velocity: Matrix3<f64>,
}

impl<T: RealField + Copy> Default for ImuCalibration<T> {
    fn default() -> Self {
        Self {
            linear_acceleration: Matrix3::identity(),
            angular_velocity: Matrix3::identity(),
        }
    }
}

/// Relative motion accumulated between two timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct ImuIntegration<T: RealField + Copy> {
    /// Rotation from the frame at `start_time` to the frame at `end_time`.
    pub delta_rotation: UnitQuaternion<f64>,
    /// Velocity change expressed in the frame at `start_time`, *not* gravity compensated.
    pub delta_velocity: Vector3<T>,
}

/// Integrates angular velocity and linear acceleration from `start_time` to
/// `end_time`, starting at `cursor` and advancing it past consumed samples.
///
/// # Panics
/// If `start_time > end_time`, or if `cursor` does not bracket `start_time`
/// (its sample must be at or before `start_time`, and the next one, if any,
/// strictly after it).
pub fn integrate_imu<T: RealField + Copy>(
    imu: &TimedBuffer<ImuSample>,
    start_time: Time,
    end_time: Time,
    cursor: &mut ImuCursor,
    calibration: &ImuCalibration<T>,
) -> ImuIntegration<T> {
    assert!(
        start_time <= end_time,
        "integrate_imu: start time {} is after end time {}",
        start_time,
        end_time
    );
    let current = match imu.get(cursor.0) {
        Some(sample) => sample,
        None => panic!("integrate_imu: cursor is past the end of the IMU buffer"),
    };
    assert!(
        current.time <= start_time,
        "integrate_imu: cursor sample at {} is after start time {}",
        current.time,
        start_time
    );
    if let Some(next) = imu.get(cursor.0 + 1) {
        assert!(
            next.time > start_time,
            "integrate_imu: cursor does not bracket start time {}",
            start_time
        );
    }

    let mut delta_rotation = UnitQuaternion::identity();
    let mut delta_velocity = Vector3::from_element(T::zero());

    let mut current_time = start_time;
    while current_time < end_time {
        let Some(sample) = imu.get(cursor.0) else {
            break;
        };
        let next_sample_time = imu.get(cursor.0 + 1).map(|s| s.time);
        let next_time = match next_sample_time {
            Some(t) => t.min(end_time),
            None => end_time,
        };
        let dt = next_time - current_time;

        // --- 1. Rotation: body-frame exponential map of the calibrated rate ---
        let delta_angle = (calibration.angular_velocity * sample.angular_velocity) * dt;
        delta_rotation *= axis_angle_to_rotation(&delta_angle);

        // --- 2. Velocity: rotate each acceleration increment into the start frame ---
        let dt_t: T = nalgebra::convert(dt);
        let accel: Vector3<T> =
            calibration.linear_acceleration * sample.linear_acceleration.cast::<T>();
        let rotation_t: Matrix3<T> = delta_rotation.to_rotation_matrix().into_inner().cast::<T>();
        delta_velocity += rotation_t * (accel * dt_t);

        current_time = next_time;
        if Some(current_time) == next_sample_time {
            cursor.0 += 1;
        }
    }

    ImuIntegration {
        delta_rotation,
        delta_velocity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RetentionPolicy;
    use crate::error::SampleKind;
    use approx::assert_abs_diff_eq;

    fn buffer_of(samples: &[ImuSample]) -> TimedBuffer<ImuSample> {
        let mut buffer = TimedBuffer::new(SampleKind::Imu, RetentionPolicy::imu());
        for s in samples {
            buffer.push(*s).unwrap();
        }
        buffer
    }

    #[test]
    fn test_zero_inputs_yield_identity() {
        let imu = buffer_of(&[
            ImuSample::new(0.0, Vector3::zeros(), Vector3::zeros()),
            ImuSample::new(0.5, Vector3::zeros(), Vector3::zeros()),
        ]);
        let mut cursor = ImuCursor(0);
        let result = integrate_imu::<f64>(&imu, 0.0, 2.0, &mut cursor, &ImuCalibration::default());
        assert_abs_diff_eq!(result.delta_rotation.angle(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.delta_velocity, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_constant_rate_integrates_across_samples() {
        let omega = Vector3::new(0.0, 0.0, 0.5);
        let imu = buffer_of(&[
            ImuSample::new(0.0, Vector3::zeros(), omega),
            ImuSample::new(0.3, Vector3::zeros(), omega),
            ImuSample::new(0.7, Vector3::zeros(), omega),
        ]);
        let mut cursor = ImuCursor(0);
        let result = integrate_imu::<f64>(&imu, 0.1, 1.1, &mut cursor, &ImuCalibration::default());
        assert_abs_diff_eq!(result.delta_rotation.angle(), 0.5, epsilon = 1e-12);
        // Both later samples were consumed.
        assert_eq!(cursor.index(), 2);
    }

    #[test]
    fn test_cursor_is_reusable_across_calls() {
        let accel = Vector3::new(1.0, 0.0, 0.0);
        let imu = buffer_of(&[
            ImuSample::new(0.0, accel, Vector3::zeros()),
            ImuSample::new(0.5, accel, Vector3::zeros()),
            ImuSample::new(1.0, accel, Vector3::zeros()),
        ]);
        let calibration = ImuCalibration::default();
        let mut cursor = ImuCursor(0);
        let first = integrate_imu::<f64>(&imu, 0.0, 0.5, &mut cursor, &calibration);
        assert_eq!(cursor, ImuCursor(1));
        let second = integrate_imu::<f64>(&imu, 0.5, 1.2, &mut cursor, &calibration);
        assert_eq!(cursor, ImuCursor(2));

        let total = first.delta_velocity + second.delta_velocity;
        assert_abs_diff_eq!(total, Vector3::new(1.2, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_acceleration_is_rotated_into_start_frame() {
        // Quarter turn about z over one second while accelerating along body x.
        let omega = Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let samples: Vec<ImuSample> = (0..1000)
            .map(|i| ImuSample::new(i as f64 * 1e-3, Vector3::x(), omega))
            .collect();
        let imu = buffer_of(&samples);
        let mut cursor = ImuCursor(0);
        let result = integrate_imu::<f64>(&imu, 0.0, 1.0, &mut cursor, &ImuCalibration::default());

        // Integral of (cos(wt), sin(wt)) over [0, 1] with w = pi/2 is (2/pi, 2/pi).
        let expected = 2.0 / std::f64::consts::PI;
        assert_abs_diff_eq!(result.delta_velocity.x, expected, epsilon = 2e-3);
        assert_abs_diff_eq!(result.delta_velocity.y, expected, epsilon = 2e-3);
        assert_abs_diff_eq!(result.delta_rotation.angle(), std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_calibration_is_applied() {
        let imu = buffer_of(&[ImuSample::new(0.0, Vector3::new(1.0, 2.0, 3.0), Vector3::zeros())]);
        let calibration = ImuCalibration::<f64> {
            linear_acceleration: Matrix3::from_diagonal(&Vector3::new(2.0, 0.0, 1.0)),
            angular_velocity: Matrix3::identity(),
        };
        let mut cursor = ImuCursor(0);
        let result = integrate_imu(&imu, 0.0, 0.5, &mut cursor, &calibration);
        assert_abs_diff_eq!(result.delta_velocity, Vector3::new(1.0, 0.0, 1.5), epsilon = 1e-12);
    }

    #[test]
    fn test_generic_over_f32() {
        let imu = buffer_of(&[
            ImuSample::new(0.0, Vector3::new(0.0, 0.0, 9.8), Vector3::zeros()),
            ImuSample::new(0.5, Vector3::new(0.0, 0.0, 9.8), Vector3::zeros()),
        ]);
        let mut cursor = ImuCursor(0);
        let result = integrate_imu::<f32>(&imu, 0.0, 1.0, &mut cursor, &ImuCalibration::default());
        assert_abs_diff_eq!(result.delta_velocity.z, 9.8_f32, epsilon = 1e-5);
    }

    #[test]
    fn test_bracketing_cursor() {
        let imu = buffer_of(&[
            ImuSample::new(0.0, Vector3::zeros(), Vector3::zeros()),
            ImuSample::new(1.0, Vector3::zeros(), Vector3::zeros()),
        ]);
        assert_eq!(ImuCursor::bracketing(&imu, 0.5), Some(ImuCursor(0)));
        assert_eq!(ImuCursor::bracketing(&imu, 1.0), Some(ImuCursor(1)));
        assert_eq!(ImuCursor::bracketing(&imu, -0.1), None);
    }

    #[test]
    #[should_panic(expected = "cursor does not bracket")]
    fn test_unbracketed_cursor_panics() {
        let imu = buffer_of(&[
            ImuSample::new(0.0, Vector3::zeros(), Vector3::zeros()),
            ImuSample::new(0.2, Vector3::zeros(), Vector3::zeros()),
        ]);
        let mut cursor = ImuCursor(0);
        let _ = integrate_imu::<f64>(&imu, 0.5, 1.0, &mut cursor, &ImuCalibration::default());
    }
}
