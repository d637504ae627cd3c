// halo_replay/src/observer.rs

use halo_core::types::Rigid3;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rand_distr::{Distribution, Normal};
use std::fmt::Debug;

use crate::config::ObserverConfig;
use crate::error::ReplayError;
use crate::prng::ReplayRng;

/// Refines a predicted pose against a scan, the role a scan matcher plays
/// in a real trajectory builder.
pub trait PoseObserver: Debug {
    /// `initial_guess` is the extrapolated pose; `truth` is what the scan
    /// actually saw.
    fn refine(&mut self, initial_guess: &Rigid3, truth: &Rigid3, rng: &mut ReplayRng) -> Rigid3;
}

/// Ignores the initial guess and reports the true pose with Gaussian noise.
#[derive(Debug, Clone)]
pub struct NoisyGroundTruthObserver {
    translation_noise: Normal<f64>,
    rotation_noise: Normal<f64>,
}

impl NoisyGroundTruthObserver {
    pub fn new(config: &ObserverConfig) -> Result<Self, ReplayError> {
        let normal = |s: f64| {
            Normal::new(0.0, s)
                .map_err(|e| ReplayError::InvalidScenario(format!("bad observer noise {}: {}", s, e)))
        };
        Ok(Self {
            translation_noise: normal(config.translation_noise_stddev)?,
            rotation_noise: normal(config.rotation_noise_stddev)?,
        })
    }
}

impl PoseObserver for NoisyGroundTruthObserver {
    fn refine(&mut self, _initial_guess: &Rigid3, truth: &Rigid3, rng: &mut ReplayRng) -> Rigid3 {
        let mut sample = |d: &Normal<f64>| d.sample(&mut rng.0);
        let offset = Vector3::new(
            sample(&self.translation_noise),
            sample(&self.translation_noise),
            sample(&self.translation_noise),
        );
        let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(
            sample(&self.rotation_noise),
            sample(&self.rotation_noise),
            sample(&self.rotation_noise),
        ));
        Isometry3::from_parts(
            Translation3::from(truth.translation.vector + offset),
            truth.rotation * rotation,
        )
    }
}
