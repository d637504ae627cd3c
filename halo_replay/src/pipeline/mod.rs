// halo_replay/src/pipeline/mod.rs

//! The local trajectory builder: seeds each match with an extrapolated pose,
//! refines it with the pose observer and feeds the result back, closing the
//! loop. Optionally runs a second, never-corrected extrapolator alongside it
//! for cross-validation.

pub mod accumulator;

use halo_core::config::{ExtrapolatorConfig, StrategyKind};
use halo_core::extrapolator::Extrapolator;
use halo_core::types::{ImuSample, OdometrySample, Rigid3, Time, TimedPose};
use nalgebra::UnitQuaternion;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::ReplayError;
use crate::observer::PoseObserver;
use crate::prng::ReplayRng;
use accumulator::{AccumulationSummary, Accumulator};

/// Output of one completed accumulation.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingResult {
    pub time: Time,
    pub summary: AccumulationSummary,
    /// Extrapolated pose used to seed the match.
    pub pose_prediction: Rigid3,
    /// Refined pose fed back into the primary extrapolator.
    pub pose_estimate: Rigid3,
    pub ground_truth: Rigid3,
    pub gravity_alignment: UnitQuaternion<f64>,
    /// Pose of the cross-validation extrapolator, if enabled.
    pub halo_pose: Option<Rigid3>,
}

#[derive(Debug)]
pub struct TrajectoryBuilder {
    extrapolator_config: ExtrapolatorConfig,
    cross_validation_strategy: Option<StrategyKind>,
    extrapolator: Option<Extrapolator>,
    halo_extrapolator: Option<Extrapolator>,
    accumulator: Accumulator,
    observer: Box<dyn PoseObserver>,
    halo_trajectory_nodes: Vec<TimedPose>,
}

impl TrajectoryBuilder {
    pub fn new(
        extrapolator_config: ExtrapolatorConfig,
        pipeline: &PipelineConfig,
        observer: Box<dyn PoseObserver>,
    ) -> Self {
        Self {
            extrapolator_config,
            cross_validation_strategy: pipeline
                .cross_validate
                .then_some(pipeline.cross_validation_strategy),
            extrapolator: None,
            halo_extrapolator: None,
            accumulator: Accumulator::new(pipeline.scans_per_accumulation),
            observer,
            halo_trajectory_nodes: Vec::new(),
        }
    }

    pub fn add_imu_sample(&mut self, sample: ImuSample) -> Result<(), ReplayError> {
        match self.extrapolator.as_mut() {
            Some(extrapolator) => extrapolator.add_imu_sample(sample)?,
            None => {
                self.extrapolator = Some(Extrapolator::initialize_with_config(
                    self.extrapolator_config.clone(),
                    sample,
                )?);
            }
        }

        if let Some(strategy) = self.cross_validation_strategy {
            match self.halo_extrapolator.as_mut() {
                Some(halo) => halo.add_imu_sample(sample)?,
                None => {
                    let config = self.extrapolator_config.clone().with_strategy(strategy);
                    self.halo_extrapolator =
                        Some(Extrapolator::initialize_with_config(config, sample)?);
                }
            }
        }
        Ok(())
    }

    pub fn add_odometry_sample(&mut self, sample: OdometrySample) -> Result<(), ReplayError> {
        let Some(extrapolator) = self.extrapolator.as_mut() else {
            // Until the first IMU sample arrives there is nothing to anchor odometry to.
            info!("Extrapolator not yet initialized.");
            return Ok(());
        };
        extrapolator.add_odometry_sample(sample)?;
        Ok(())
    }

    /// Registers one scan taken at `time`. Returns a result once an
    /// accumulation is complete.
    pub fn add_scan(
        &mut self,
        time: Time,
        ground_truth: &Rigid3,
        rng: &mut ReplayRng,
    ) -> Result<Option<MatchingResult>, ReplayError> {
        let Some(extrapolator) = self.extrapolator.as_mut() else {
            // Without an IMU sample the scan's orientation is unknown.
            info!("IMU not yet initialized.");
            return Ok(None);
        };

        let pose_prediction = extrapolator.extrapolate_pose(time)?;
        let Some(summary) = self.accumulator.add_scan(time, pose_prediction) else {
            return Ok(None);
        };
        debug!(
            scans = summary.scans,
            duration = summary.duration(),
            "accumulation complete"
        );

        // --- 1. Refine the prediction and close the loop ---
        let pose_estimate = self.observer.refine(&pose_prediction, ground_truth, rng);
        extrapolator.add_pose(time, pose_estimate)?;

        // --- 2. Cross-validation: the halo extrapolator only ever sees its own predictions ---
        let halo_pose = match self.halo_extrapolator.as_mut() {
            Some(halo) => {
                let halo_pose = halo.extrapolate_pose(time)?;
                halo.add_pose(time, halo_pose)?;
                self.halo_trajectory_nodes.push(TimedPose::new(time, halo_pose));
                Some(halo_pose)
            }
            None => None,
        };

        // --- 3. Gravity alignment for downstream consumers ---
        let gravity_alignment = extrapolator.estimate_gravity_orientation(time)?;

        Ok(Some(MatchingResult {
            time,
            summary,
            pose_prediction,
            pose_estimate,
            ground_truth: *ground_truth,
            gravity_alignment,
            halo_pose,
        }))
    }

    pub fn extrapolator(&self) -> Option<&Extrapolator> {
        self.extrapolator.as_ref()
    }

    pub fn halo_extrapolator(&self) -> Option<&Extrapolator> {
        self.halo_extrapolator.as_ref()
    }

    pub fn halo_trajectory_nodes(&self) -> &[TimedPose] {
        &self.halo_trajectory_nodes
    }
}
