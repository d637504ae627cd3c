// halo_core/src/prediction/state_integration.rs

use nalgebra::Vector3;
use tracing::trace;

use crate::config::StrategyKind;
use crate::error::{ExtrapolationError, NotReadyReason, Result};
use crate::integration::{integrate_imu, ImuCalibration, ImuCursor};
use crate::prediction::{PredictionContext, PredictionStrategy};
use crate::types::{ImuSample, Rigid3, State, Time};

/// Dead-reckons an explicit `State` from raw IMU data.
///
/// Every prediction integrates the IMU samples between the previous
/// prediction time and the requested time, then removes the gravity
/// contribution accumulated by the orientation tracker over the same span.
/// The state is never corrected by incoming poses.
#[derive(Debug, Clone)]
pub struct StateIntegrationStrategy {
    state: State,
    last_predicted_time: Option<Time>,
    // Cumulative tracker gravity velocity at `last_predicted_time`.
    gravity_velocity_at_last_prediction: Vector3<f64>,
    calibration: ImuCalibration<f64>,
}

impl Default for StateIntegrationStrategy {
    fn default() -> Self {
        Self::new(State::default())
    }
}

impl StateIntegrationStrategy {
    pub fn new(initial_state: State) -> Self {
        Self {
            state: initial_state,
            last_predicted_time: None,
            gravity_velocity_at_last_prediction: Vector3::zeros(),
            calibration: ImuCalibration::default(),
        }
    }

    pub fn with_calibration(mut self, calibration: ImuCalibration<f64>) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn last_predicted_time(&self) -> Option<Time> {
        self.last_predicted_time
    }

    /// Integrates the state forward to `time`.
    ///
    /// Returns `NotReady` while fewer than two IMU samples are buffered.
    pub fn advance_state(&mut self, ctx: &PredictionContext<'_>, time: Time) -> Result<State> {
        let available = ctx.imu.len();
        let start = match self.last_predicted_time {
            Some(start) if available >= 2 => start,
            _ => {
                return Err(ExtrapolationError::NotReady(
                    NotReadyReason::InsufficientImu { available },
                ))
            }
        };
        if time < start {
            return Err(ExtrapolationError::IntoThePast {
                requested: time,
                newest: start,
            });
        }

        let mut cursor = ImuCursor::bracketing(ctx.imu, start)
            .ok_or(ExtrapolationError::UnbracketedStart { start })?;
        let gravity_velocity = ctx.tracker_at(time)?.gravity_velocity();
        let integration = integrate_imu(ctx.imu, start, time, &mut cursor, &self.calibration);

        // Semi-implicit: position advances with the velocity from before this step.
        let dt = time - start;
        let start_orientation = self.state.orientation;
        self.state = State {
            position: self.state.position + dt * self.state.velocity,
            orientation: start_orientation * integration.delta_rotation,
            velocity: self.state.velocity + start_orientation * integration.delta_velocity
                - (gravity_velocity - self.gravity_velocity_at_last_prediction),
        };
        self.gravity_velocity_at_last_prediction = gravity_velocity;
        self.last_predicted_time = Some(time);
        trace!(time, position = ?self.state.position, "state integrated");
        Ok(self.state)
    }
}

impl PredictionStrategy for StateIntegrationStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StateIntegration
    }

    fn predict(&mut self, ctx: &PredictionContext<'_>, time: Time) -> Result<Rigid3> {
        match self.advance_state(ctx, time) {
            Ok(state) => Ok(state.pose()),
            // Not enough IMU data yet: report the state as it stands.
            Err(ExtrapolationError::NotReady(NotReadyReason::InsufficientImu { .. })) => {
                Ok(self.state.pose())
            }
            Err(e) => Err(e),
        }
    }

    fn on_imu_sample(&mut self, ctx: &PredictionContext<'_>, sample: &ImuSample) {
        if self.last_predicted_time.is_some() {
            return;
        }
        self.last_predicted_time = Some(sample.time);
        self.gravity_velocity_at_last_prediction = ctx
            .tracker_at(sample.time)
            .map_or_else(|_| Vector3::zeros(), |tracker| tracker.gravity_velocity());
    }

    fn on_pose(&mut self, ctx: &PredictionContext<'_>, time: Time) -> Result<()> {
        // Consume IMU data up to the pose before trimming discards it.
        match self.last_predicted_time {
            Some(last) if last < time && ctx.imu.len() >= 2 => {
                self.advance_state(ctx, time).map(|_| ())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{RetentionPolicy, TimedBuffer};
    use crate::error::SampleKind;
    use crate::tracker::{ImuTracker, OrientationTracker};
    use crate::types::{OdometrySample, TimedPose};
    use crate::velocity::VelocityEstimator;
    use approx::assert_abs_diff_eq;
    use nalgebra::UnitQuaternion;

    struct Fixture {
        poses: TimedBuffer<TimedPose>,
        imu: TimedBuffer<ImuSample>,
        odometry: TimedBuffer<OdometrySample>,
        tracker: ImuTracker,
        velocities: VelocityEstimator,
    }

    impl Fixture {
        fn new(gravity_time_constant: f64) -> Self {
            Self {
                poses: TimedBuffer::new(SampleKind::Pose, RetentionPolicy::poses(0.001)),
                imu: TimedBuffer::new(SampleKind::Imu, RetentionPolicy::imu()),
                odometry: TimedBuffer::new(SampleKind::Odometry, RetentionPolicy::odometry()),
                tracker: ImuTracker::new(gravity_time_constant, 0.0),
                velocities: VelocityEstimator::default(),
            }
        }

        fn ctx(&self) -> PredictionContext<'_> {
            let tracker: &(dyn OrientationTracker + 'static) = &self.tracker;
            PredictionContext {
                poses: &self.poses,
                imu: &self.imu,
                odometry: &self.odometry,
                tracker: Some(tracker),
                velocities: &self.velocities,
            }
        }

        fn feed(&mut self, strategy: &mut StateIntegrationStrategy, sample: ImuSample) {
            self.imu.push(sample).unwrap();
            strategy.on_imu_sample(&self.ctx(), &sample);
        }
    }

    fn resting(time: Time) -> ImuSample {
        ImuSample::new(time, Vector3::new(0.0, 0.0, 9.8), Vector3::zeros())
    }

    #[test]
    fn test_single_sample_returns_unmodified_state() {
        let mut fixture = Fixture::new(10.0);
        let mut strategy = StateIntegrationStrategy::default();
        fixture.feed(&mut strategy, resting(0.0));

        let pose = strategy.predict(&fixture.ctx(), 0.5).unwrap();
        assert_eq!(pose, Rigid3::identity());
        assert_eq!(strategy.last_predicted_time(), Some(0.0));
        assert!(matches!(
            strategy.advance_state(&fixture.ctx(), 0.5),
            Err(ExtrapolationError::NotReady(NotReadyReason::InsufficientImu { available: 1 }))
        ));
    }

    #[test]
    fn test_stationary_platform_stays_at_rest() {
        let mut fixture = Fixture::new(10.0);
        let mut strategy = StateIntegrationStrategy::default();
        for i in 0..=100 {
            fixture.feed(&mut strategy, resting(i as f64 * 0.01));
        }

        let pose = strategy.predict(&fixture.ctx(), 1.0).unwrap();
        assert_abs_diff_eq!(pose.translation.vector, Vector3::zeros(), epsilon = 1e-9);
        assert_abs_diff_eq!(strategy.state().velocity, Vector3::zeros(), epsilon = 1e-9);
        assert_abs_diff_eq!(pose.rotation.angle(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_forward_acceleration_is_integrated_semi_implicitly() {
        // A very slow gravity filter keeps the tracked gravity direction on +Z.
        let mut fixture = Fixture::new(1e6);
        let mut strategy = StateIntegrationStrategy::default();
        fixture.feed(&mut strategy, resting(0.0));
        for i in 1..=200 {
            let sample = ImuSample::new(i as f64 * 0.01, Vector3::new(1.0, 0.0, 9.8), Vector3::zeros());
            fixture.feed(&mut strategy, sample);
        }

        strategy.predict(&fixture.ctx(), 1.0).unwrap();
        // The first 10 ms are integrated with the resting sample.
        assert_abs_diff_eq!(strategy.state().velocity.x, 0.99, epsilon = 1e-4);
        assert_abs_diff_eq!(strategy.state().position.x, 0.0, epsilon = 1e-12);

        let pose = strategy.predict(&fixture.ctx(), 2.0).unwrap();
        assert_abs_diff_eq!(strategy.state().velocity.x, 1.99, epsilon = 1e-4);
        assert_abs_diff_eq!(pose.translation.vector.x, 0.99, epsilon = 1e-4);
        assert_abs_diff_eq!(strategy.state().velocity.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_initial_velocity_carries_position() {
        let mut fixture = Fixture::new(10.0);
        let initial = State::new(
            Vector3::new(1.0, 0.0, 0.0),
            UnitQuaternion::identity(),
            Vector3::new(2.0, 0.0, 0.0),
        );
        let mut strategy = StateIntegrationStrategy::new(initial);
        for i in 0..=100 {
            fixture.feed(&mut strategy, resting(i as f64 * 0.01));
        }

        let pose = strategy.predict(&fixture.ctx(), 0.5).unwrap();
        assert_abs_diff_eq!(pose.translation.vector.x, 2.0, epsilon = 1e-9);
        let pose = strategy.predict(&fixture.ctx(), 1.0).unwrap();
        assert_abs_diff_eq!(pose.translation.vector.x, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(strategy.state().velocity, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_constant_yaw_rate_rotates_state() {
        let mut fixture = Fixture::new(10.0);
        let mut strategy = StateIntegrationStrategy::default();
        for i in 0..=100 {
            let sample = ImuSample::new(i as f64 * 0.01, Vector3::new(0.0, 0.0, 9.8), Vector3::new(0.0, 0.0, 0.5));
            fixture.feed(&mut strategy, sample);
        }
        let pose = strategy.predict(&fixture.ctx(), 1.0).unwrap();
        let (_, _, yaw) = pose.rotation.euler_angles();
        assert_abs_diff_eq!(yaw, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_time_before_last_prediction() {
        let mut fixture = Fixture::new(10.0);
        let mut strategy = StateIntegrationStrategy::default();
        for i in 0..=10 {
            fixture.feed(&mut strategy, resting(i as f64 * 0.1));
        }
        strategy.predict(&fixture.ctx(), 0.5).unwrap();
        let err = strategy.predict(&fixture.ctx(), 0.4).unwrap_err();
        assert!(matches!(err, ExtrapolationError::IntoThePast { .. }));
        assert_eq!(strategy.last_predicted_time(), Some(0.5));
    }

    #[test]
    fn test_unbracketed_start_is_fatal() {
        let mut fixture = Fixture::new(10.0);
        let mut strategy = StateIntegrationStrategy::default();
        fixture.feed(&mut strategy, resting(0.0));
        fixture.feed(&mut strategy, resting(0.1));
        fixture.feed(&mut strategy, resting(0.2));
        // Drop the samples that bracket the prediction marker at t=0.
        fixture.imu.trim(0.2);
        fixture.imu.push(resting(0.3)).unwrap();

        let err = strategy.predict(&fixture.ctx(), 0.3).unwrap_err();
        assert_eq!(err, ExtrapolationError::UnbracketedStart { start: 0.0 });
        assert!(err.is_fatal());
    }
}
