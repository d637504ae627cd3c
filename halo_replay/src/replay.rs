// halo_replay/src/replay.rs

use halo_core::types::{Time, TimedPose};
use tracing::{debug, info, warn};

use crate::config::ScenarioConfig;
use crate::error::ReplayError;
use crate::observer::NoisyGroundTruthObserver;
use crate::pipeline::{MatchingResult, TrajectoryBuilder};
use crate::prng::ReplayRng;
use crate::sensors::{ImuSimulator, OdometrySimulator, RateClock};

/// Everything a replay produced.
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    pub results: Vec<MatchingResult>,
    pub halo_trajectory_nodes: Vec<TimedPose>,
    pub imu_samples: usize,
    pub odometry_samples: usize,
    pub scans: usize,
}

impl ReplayReport {
    /// Mean distance between the extrapolated and the true pose at match time.
    pub fn mean_prediction_error(&self) -> Option<f64> {
        mean(self.results.iter().map(|r| {
            (r.pose_prediction.translation.vector - r.ground_truth.translation.vector).norm()
        }))
    }

    /// Mean distance between the cross-validation pose and the refined pose.
    pub fn mean_cross_validation_divergence(&self) -> Option<f64> {
        mean(self.results.iter().filter_map(|r| {
            r.halo_pose
                .map(|halo| (halo.translation.vector - r.pose_estimate.translation.vector).norm())
        }))
    }

    pub fn log_summary(&self) {
        info!(
            imu = self.imu_samples,
            odometry = self.odometry_samples,
            scans = self.scans,
            matches = self.results.len(),
            "replay finished"
        );
        if let Some(error) = self.mean_prediction_error() {
            info!("Mean prediction error: {:.4} m", error);
        }
        if let Some(divergence) = self.mean_cross_validation_divergence() {
            info!("Mean cross-validation divergence: {:.4} m", divergence);
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Logs and swallows "not ready" errors; everything else aborts the replay.
fn tolerate_not_ready<T>(result: Result<T, ReplayError>) -> Result<Option<T>, ReplayError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if !e.is_fatal() => {
            debug!("skipping: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Imu,
    Odometry,
    Scan,
}

/// Runs a scenario to completion. Sensor events are delivered in time order;
/// at equal timestamps IMU comes first, then odometry, then scans.
pub fn run(config: &ScenarioConfig) -> Result<ReplayReport, ReplayError> {
    config.validate()?;
    let mut rng = ReplayRng::new(config.simulation.seed);
    let mut imu = ImuSimulator::new(&config.imu)?;
    let mut odometry = if config.odometry.enabled {
        Some(OdometrySimulator::new(&config.odometry)?)
    } else {
        None
    };
    let mut scan_clock = RateClock::new(config.pipeline.scan_rate);
    let observer = NoisyGroundTruthObserver::new(&config.observer)?;
    let mut builder = TrajectoryBuilder::new(
        config.extrapolator.clone(),
        &config.pipeline,
        Box::new(observer),
    );
    let duration: Time = config.simulation.duration_seconds;
    info!(
        duration,
        strategy = ?config.extrapolator.strategy,
        "starting replay"
    );

    let mut report = ReplayReport::default();
    loop {
        // --- 1. Pick the earliest pending sensor event ---
        let (mut event, mut time) = (Event::Imu, imu.clock.next_time());
        if let Some(odometry) = &odometry {
            if odometry.clock.next_time() < time {
                (event, time) = (Event::Odometry, odometry.clock.next_time());
            }
        }
        if scan_clock.next_time() < time {
            (event, time) = (Event::Scan, scan_clock.next_time());
        }
        if time > duration {
            break;
        }

        // --- 2. Measure the ground truth and feed the pipeline ---
        match event {
            Event::Imu => {
                let truth = config.motion.ground_truth(imu.clock.tick());
                let sample = imu.measure(&truth, &mut rng);
                tolerate_not_ready(builder.add_imu_sample(sample))?;
                report.imu_samples += 1;
            }
            Event::Odometry => {
                if let Some(odometry) = odometry.as_mut() {
                    let truth = config.motion.ground_truth(odometry.clock.tick());
                    let sample = odometry.measure(&truth, &mut rng);
                    tolerate_not_ready(builder.add_odometry_sample(sample))?;
                    report.odometry_samples += 1;
                }
            }
            Event::Scan => {
                let truth = config.motion.ground_truth(scan_clock.tick());
                if let Some(Some(result)) =
                    tolerate_not_ready(builder.add_scan(truth.time, &truth.pose, &mut rng))?
                {
                    report.results.push(result);
                }
                report.scans += 1;
            }
        }
    }

    if report.results.is_empty() {
        warn!("No accumulation completed; the scenario is too short.");
    }
    report.halo_trajectory_nodes = builder.halo_trajectory_nodes().to_vec();
    Ok(report)
}
