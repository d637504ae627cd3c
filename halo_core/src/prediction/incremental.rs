// halo_core/src/prediction/incremental.rs

use nalgebra::Translation3;

use crate::config::StrategyKind;
use crate::error::{ExtrapolationError, Result};
use crate::prediction::{PredictionContext, PredictionStrategy};
use crate::types::{Rigid3, Time};

/// Newest pose, shifted by the estimated linear velocity and rotated by the
/// gravity-corrected gyro rotation since that pose.
///
/// Translation and rotation are extrapolated independently: translation as
/// constant velocity, rotation by running a disposable tracker copy forward.
/// The cost is linear in the number of IMU samples between the two times.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementalStrategy;

impl PredictionStrategy for IncrementalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Incremental
    }

    fn predict(&mut self, ctx: &PredictionContext<'_>, time: Time) -> Result<Rigid3> {
        let newest = ctx.newest_pose()?;
        if time < newest.time {
            return Err(ExtrapolationError::IntoThePast {
                requested: time,
                newest: newest.time,
            });
        }
        let translation = Translation3::from(ctx.extrapolate_translation(time)?);
        let rotation = ctx.extrapolate_rotation(time)?;
        Ok(translation * newest.pose * rotation)
    }
}
