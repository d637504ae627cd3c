// halo_core/src/prediction/mod.rs

use dyn_clone::DynClone;
use nalgebra::{UnitQuaternion, Vector3};
use std::fmt::Debug;

use crate::buffer::TimedBuffer;
use crate::config::StrategyKind;
use crate::error::{ExtrapolationError, NotReadyReason, Result};
use crate::tracker::{lookahead, OrientationTracker};
use crate::types::{ImuSample, OdometrySample, Rigid3, Time, TimedPose};
use crate::velocity::{VelocityEstimate, VelocityEstimator};

/// A read-only view of everything an `Extrapolator` owns, handed to its
/// prediction strategy. Strategies never mutate the shared buffers.
pub struct PredictionContext<'a> {
    pub poses: &'a TimedBuffer<TimedPose>,
    pub imu: &'a TimedBuffer<ImuSample>,
    pub odometry: &'a TimedBuffer<OdometrySample>,
    pub tracker: Option<&'a (dyn OrientationTracker + 'static)>,
    pub velocities: &'a VelocityEstimator,
}

impl<'a> PredictionContext<'a> {
    pub fn newest_pose(&self) -> Result<&'a TimedPose> {
        self.poses
            .back()
            .ok_or(ExtrapolationError::NotReady(NotReadyReason::NoPoses))
    }

    pub fn tracker(&self) -> Result<&'a (dyn OrientationTracker + 'static)> {
        self.tracker
            .ok_or(ExtrapolationError::NotReady(NotReadyReason::NoTracker))
    }

    /// The velocity currently selected for extrapolation (odometry if at
    /// least two odometry samples are buffered, poses otherwise).
    pub fn velocity(&self) -> &'a VelocityEstimate {
        self.velocities.select(self.odometry.len())
    }

    /// A disposable copy of the authoritative tracker, advanced to `time`.
    pub fn tracker_at(&self, time: Time) -> Result<Box<dyn OrientationTracker>> {
        lookahead::tracker_at(self.tracker()?, self.imu, &self.velocity().angular, time)
    }

    /// Gravity-aligned orientation at `time`.
    pub fn orientation_at(&self, time: Time) -> Result<UnitQuaternion<f64>> {
        Ok(self.tracker_at(time)?.orientation())
    }

    /// Rotation between the authoritative tracker's orientation and the
    /// orientation it would have at `time`.
    pub fn extrapolate_rotation(&self, time: Time) -> Result<UnitQuaternion<f64>> {
        let last_orientation = self.tracker()?.orientation();
        Ok(last_orientation.inverse() * self.orientation_at(time)?)
    }

    /// Constant-velocity translation from the newest pose to `time`.
    pub fn extrapolate_translation(&self, time: Time) -> Result<Vector3<f64>> {
        let newest = self.newest_pose()?;
        Ok((time - newest.time) * self.velocity().linear)
    }
}

// --- PREDICTION STRATEGY TRAIT ---
/// How an `Extrapolator` turns its buffers into a pose at a requested time.
pub trait PredictionStrategy: DynClone + Debug + Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Predicts the platform pose at `time`. The extrapolator has already
    /// checked that `time` is not before the newest known pose.
    fn predict(&mut self, ctx: &PredictionContext<'_>, time: Time) -> Result<Rigid3>;

    /// Called after an IMU sample has been buffered.
    fn on_imu_sample(&mut self, _ctx: &PredictionContext<'_>, _sample: &ImuSample) {}

    /// Called before a pose at `time` is inserted and the buffers are trimmed,
    /// so strategies can consume data that is about to be dropped.
    fn on_pose(&mut self, _ctx: &PredictionContext<'_>, _time: Time) -> Result<()> {
        Ok(())
    }
}

dyn_clone::clone_trait_object!(PredictionStrategy);

/// Builds the strategy selected by configuration.
pub fn strategy_for(kind: StrategyKind) -> Box<dyn PredictionStrategy> {
    match kind {
        StrategyKind::Incremental => Box::new(IncrementalStrategy),
        StrategyKind::StateIntegration => Box::new(StateIntegrationStrategy::default()),
    }
}

mod incremental;
mod state_integration;

pub use incremental::IncrementalStrategy;
pub use state_integration::StateIntegrationStrategy;
