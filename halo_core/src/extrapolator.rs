// halo_core/src/extrapolator.rs

use nalgebra::{Isometry3, Translation3, UnitQuaternion};
use tracing::debug;

use crate::buffer::{RetentionPolicy, TimedBuffer};
use crate::config::{ExtrapolatorConfig, StrategyKind};
use crate::error::{ExtrapolationError, Result, SampleKind};
use crate::prediction::{strategy_for, PredictionContext, PredictionStrategy};
use crate::tracker::{lookahead, ImuTracker, OrientationTracker, TrackerFactory};
use crate::types::{ImuSample, OdometrySample, Rigid3, Time, TimedPose};
use crate::velocity::{odometry_delta, VelocityEstimate, VelocityEstimator, VelocitySource};

/// Lifecycle of an `Extrapolator`. There is no terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrapolatorPhase {
    Empty,
    /// An orientation tracker exists but no pose has been added.
    ImuPrimed,
    /// At least one pose is known, but no pose-derived velocity yet.
    PoseAnchored,
    /// At least two poses and a valid pose-derived velocity.
    SteadyState,
}

/// Predicts the platform pose at arbitrary future times from buffered IMU,
/// odometry and pose data. One instance per trajectory.
///
/// All timestamps fed in must be non-decreasing relative to the newest pose.
/// Violations are returned as fatal errors and leave the buffers untouched.
#[derive(Debug, Clone)]
pub struct Extrapolator {
    config: ExtrapolatorConfig,
    poses: TimedBuffer<TimedPose>,
    imu: TimedBuffer<ImuSample>,
    odometry: TimedBuffer<OdometrySample>,
    tracker: Option<Box<dyn OrientationTracker>>,
    tracker_factory: TrackerFactory,
    velocities: VelocityEstimator,
    has_pose_velocity: bool,
    strategy: Box<dyn PredictionStrategy>,
}

impl Extrapolator {
    pub fn new(config: ExtrapolatorConfig) -> Result<Self> {
        Self::with_tracker_factory(config, ImuTracker::boxed)
    }

    /// Like [`Extrapolator::new`], with a custom orientation tracker implementation.
    pub fn with_tracker_factory(
        config: ExtrapolatorConfig,
        tracker_factory: TrackerFactory,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            poses: TimedBuffer::new(
                SampleKind::Pose,
                RetentionPolicy::poses(config.pose_queue_duration),
            ),
            imu: TimedBuffer::new(SampleKind::Imu, RetentionPolicy::imu()),
            odometry: TimedBuffer::new(SampleKind::Odometry, RetentionPolicy::odometry()),
            tracker: None,
            tracker_factory,
            velocities: VelocityEstimator::default(),
            has_pose_velocity: false,
            strategy: strategy_for(config.strategy),
            config,
        })
    }

    /// Builds an extrapolator from a first IMU sample: the tracker is seeded
    /// with the sample and a rotation-only pose is added at its time.
    pub fn initialize_with_first_imu_sample(
        pose_queue_duration: Time,
        imu_gravity_time_constant: f64,
        sample: ImuSample,
    ) -> Result<Self> {
        Self::initialize_with_config(
            ExtrapolatorConfig::new(pose_queue_duration, imu_gravity_time_constant),
            sample,
        )
    }

    pub fn initialize_with_config(config: ExtrapolatorConfig, sample: ImuSample) -> Result<Self> {
        let strategy = strategy_for(config.strategy);
        Self::initialize_with_strategy(config, strategy, sample)
    }

    /// Bootstraps with a caller-built strategy, e.g. a calibrated
    /// `StateIntegrationStrategy`. `config.strategy` is overridden by its kind.
    pub fn initialize_with_strategy(
        config: ExtrapolatorConfig,
        strategy: Box<dyn PredictionStrategy>,
        sample: ImuSample,
    ) -> Result<Self> {
        let mut extrapolator = Self::new(config)?.with_strategy(strategy);
        extrapolator.add_imu_sample(sample)?;

        let mut orientation = UnitQuaternion::identity();
        if let Some(tracker) = extrapolator.tracker.as_mut() {
            tracker.observe_linear_acceleration(&sample.linear_acceleration);
            tracker.observe_angular_velocity(&sample.angular_velocity);
            tracker.advance(sample.time);
            orientation = tracker.orientation();
        }
        extrapolator.add_pose(
            sample.time,
            Isometry3::from_parts(Translation3::identity(), orientation),
        )?;
        Ok(extrapolator)
    }

    /// Replaces the prediction strategy.
    ///
    /// # Panics
    /// If any sample or pose has already been added.
    pub fn with_strategy(mut self, strategy: Box<dyn PredictionStrategy>) -> Self {
        assert!(
            self.phase() == ExtrapolatorPhase::Empty && self.odometry.is_empty(),
            "Extrapolator::with_strategy: strategy must be set before any data is added"
        );
        self.config.strategy = strategy.kind();
        self.strategy = strategy;
        self
    }

    // =========================================================================
    // == Ingestion ==
    // =========================================================================

    pub fn add_imu_sample(&mut self, sample: ImuSample) -> Result<()> {
        self.check_not_before_newest_pose(SampleKind::Imu, sample.time)?;
        let phase = self.phase();
        self.imu.push(sample)?;
        if self.tracker.is_none() {
            self.create_tracker(sample.time);
        }
        if let Some(newest) = self.last_pose_time() {
            self.imu.trim(newest);
        }
        let (strategy, ctx) = self.strategy_and_context();
        strategy.on_imu_sample(&ctx, &sample);
        self.log_phase_change(phase);
        Ok(())
    }

    pub fn add_odometry_sample(&mut self, sample: OdometrySample) -> Result<()> {
        self.check_not_before_newest_pose(SampleKind::Odometry, sample.time)?;
        self.odometry.push(sample)?;
        let newest_pose = self.poses.back().copied();
        if let Some(newest) = &newest_pose {
            self.odometry.trim(newest.time);
        }

        let Some(delta) = odometry_delta(&self.odometry) else {
            return Ok(());
        };
        self.velocities.set_odometry_angular(delta.angular);
        // The linear term needs a world-frame anchor.
        let Some(newest) = newest_pose else {
            return Ok(());
        };
        let rotation = self.context().extrapolate_rotation(delta.newest_time)?;
        let orientation_at_newest_odometry = newest.pose.rotation * rotation;
        self.velocities
            .set_odometry_linear(orientation_at_newest_odometry * delta.linear_in_tracking_frame);
        Ok(())
    }

    pub fn add_pose(&mut self, time: Time, pose: Rigid3) -> Result<()> {
        self.check_not_before_newest_pose(SampleKind::Pose, time)?;
        if let Some(tracker) = &self.tracker {
            if time < tracker.time() {
                return Err(ExtrapolationError::IntoThePast {
                    requested: time,
                    newest: tracker.time(),
                });
            }
        }
        let phase = self.phase();

        if self.tracker.is_none() {
            let start = self.imu.oldest_time().map_or(time, |t| t.min(time));
            self.create_tracker(start);
        }

        let (strategy, ctx) = self.strategy_and_context();
        strategy.on_pose(&ctx, time)?;

        self.poses.push(TimedPose::new(time, pose))?;
        self.poses.trim(time);
        if self.velocities.update_from_poses(&self.poses) {
            self.has_pose_velocity = true;
        }

        let fallback = self.velocities.select(self.odometry.len()).angular;
        if let Some(tracker) = self.tracker.as_mut() {
            lookahead::advance_tracker(tracker.as_mut(), &self.imu, &fallback, time)?;
        }
        self.imu.trim(time);
        self.odometry.trim(time);
        self.log_phase_change(phase);
        Ok(())
    }

    // =========================================================================
    // == Queries ==
    // =========================================================================

    /// The predicted pose at `time`, which must not be before the newest pose.
    pub fn extrapolate_pose(&mut self, time: Time) -> Result<Rigid3> {
        if let Some(newest) = self.last_pose_time() {
            if time < newest {
                return Err(ExtrapolationError::IntoThePast {
                    requested: time,
                    newest,
                });
            }
        }
        let (strategy, ctx) = self.strategy_and_context();
        strategy.predict(&ctx, time)
    }

    /// Gravity-aligned orientation at `time`, independent of translation.
    pub fn estimate_gravity_orientation(&self, time: Time) -> Result<UnitQuaternion<f64>> {
        self.context().orientation_at(time)
    }

    pub fn last_pose_time(&self) -> Option<Time> {
        self.poses.newest_time()
    }

    pub fn phase(&self) -> ExtrapolatorPhase {
        if self.poses.len() >= 2 && self.has_pose_velocity {
            ExtrapolatorPhase::SteadyState
        } else if !self.poses.is_empty() {
            ExtrapolatorPhase::PoseAnchored
        } else if self.tracker.is_some() {
            ExtrapolatorPhase::ImuPrimed
        } else {
            ExtrapolatorPhase::Empty
        }
    }

    pub fn config(&self) -> &ExtrapolatorConfig {
        &self.config
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn has_tracker(&self) -> bool {
        self.tracker.is_some()
    }

    /// The velocity the next extrapolation will use.
    pub fn velocity(&self) -> &VelocityEstimate {
        self.velocities.select(self.odometry.len())
    }

    pub fn velocity_source(&self) -> VelocitySource {
        VelocityEstimator::source(self.odometry.len())
    }

    pub fn poses(&self) -> &TimedBuffer<TimedPose> {
        &self.poses
    }

    pub fn imu(&self) -> &TimedBuffer<ImuSample> {
        &self.imu
    }

    pub fn odometry(&self) -> &TimedBuffer<OdometrySample> {
        &self.odometry
    }

    // --- Internals ---

    fn check_not_before_newest_pose(&self, kind: SampleKind, time: Time) -> Result<()> {
        match self.last_pose_time() {
            Some(newest) if time < newest => Err(ExtrapolationError::OutOfOrder {
                kind,
                time,
                newest,
            }),
            _ => Ok(()),
        }
    }

    fn create_tracker(&mut self, start_time: Time) {
        debug!(start_time, "creating orientation tracker");
        self.tracker = Some((self.tracker_factory)(
            self.config.imu_gravity_time_constant,
            start_time,
        ));
    }

    fn context(&self) -> PredictionContext<'_> {
        PredictionContext {
            poses: &self.poses,
            imu: &self.imu,
            odometry: &self.odometry,
            tracker: self.tracker.as_deref(),
            velocities: &self.velocities,
        }
    }

    fn strategy_and_context(&mut self) -> (&mut dyn PredictionStrategy, PredictionContext<'_>) {
        let ctx = PredictionContext {
            poses: &self.poses,
            imu: &self.imu,
            odometry: &self.odometry,
            tracker: self.tracker.as_deref(),
            velocities: &self.velocities,
        };
        (self.strategy.as_mut(), ctx)
    }

    fn log_phase_change(&self, before: ExtrapolatorPhase) {
        let after = self.phase();
        if after != before {
            debug!(?before, ?after, "extrapolator phase changed");
        }
    }
}
