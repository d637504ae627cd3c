// halo_replay/src/pipeline/accumulator.rs

use halo_core::types::{Rigid3, Time};

/// What a completed accumulation covered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulationSummary {
    pub scans: usize,
    pub first_time: Time,
    pub last_time: Time,
    /// Extrapolated pose at the first scan of the accumulation.
    pub first_pose_estimate: Rigid3,
    /// Motion from the first scan to the last one, in the first scan's frame.
    pub tracking_delta: Rigid3,
}

impl AccumulationSummary {
    pub fn duration(&self) -> Time {
        self.last_time - self.first_time
    }
}

/// Groups consecutive scans so one match is run per `scans_per_accumulation`
/// scans. All bookkeeping is per instance.
#[derive(Debug, Clone)]
pub struct Accumulator {
    scans_per_accumulation: usize,
    num_accumulated: usize,
    first_time: Option<Time>,
    first_pose_estimate: Option<Rigid3>,
}

impl Accumulator {
    pub fn new(scans_per_accumulation: usize) -> Self {
        Self {
            scans_per_accumulation: scans_per_accumulation.max(1),
            num_accumulated: 0,
            first_time: None,
            first_pose_estimate: None,
        }
    }

    pub fn num_accumulated(&self) -> usize {
        self.num_accumulated
    }

    /// Registers one scan. Returns the summary and resets once the
    /// accumulation is complete.
    pub fn add_scan(&mut self, time: Time, pose_estimate: Rigid3) -> Option<AccumulationSummary> {
        if self.num_accumulated == 0 {
            self.first_time = Some(time);
            self.first_pose_estimate = Some(pose_estimate);
        }
        self.num_accumulated += 1;
        if self.num_accumulated < self.scans_per_accumulation {
            return None;
        }

        let first_pose_estimate = self.first_pose_estimate.unwrap_or(pose_estimate);
        let summary = AccumulationSummary {
            scans: self.num_accumulated,
            first_time: self.first_time.unwrap_or(time),
            last_time: time,
            first_pose_estimate,
            tracking_delta: first_pose_estimate.inverse() * pose_estimate,
        };
        self.num_accumulated = 0;
        self.first_time = None;
        self.first_pose_estimate = None;
        Some(summary)
    }
}
