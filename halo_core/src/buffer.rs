// halo_core/src/buffer.rs

use std::collections::VecDeque;

use crate::error::{ExtrapolationError, Result, SampleKind};
use crate::types::{Time, Timestamped};

/// How much history a `TimedBuffer` keeps once trimmed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionPolicy {
    /// Trimming never reduces the buffer below this many entries.
    pub min_retained: usize,
    /// The front entry is dropped only while the *second* entry is at or
    /// before `reference_time - lookback`.
    pub lookback: Time,
}

impl RetentionPolicy {
    /// Poses: keep two for velocity estimation, and keep a whole window of them.
    pub fn poses(window_duration: Time) -> Self {
        Self {
            min_retained: 2,
            lookback: window_duration,
        }
    }

    /// IMU: one sample at or before the newest pose is enough to bracket it.
    pub fn imu() -> Self {
        Self {
            min_retained: 1,
            lookback: 0.0,
        }
    }

    /// Odometry: two samples are needed for a velocity estimate.
    pub fn odometry() -> Self {
        Self {
            min_retained: 2,
            lookback: 0.0,
        }
    }
}

/// An append-only, time-ordered sequence of samples that trims itself from
/// the front according to its `RetentionPolicy`.
#[derive(Debug, Clone)]
pub struct TimedBuffer<S> {
    kind: SampleKind,
    policy: RetentionPolicy,
    samples: VecDeque<S>,
}

impl<S: Timestamped> TimedBuffer<S> {
    pub fn new(kind: SampleKind, policy: RetentionPolicy) -> Self {
        Self {
            kind,
            policy,
            samples: VecDeque::new(),
        }
    }

    /// Appends a sample. Fails if it would break time ordering; the buffer is
    /// left untouched in that case.
    pub fn push(&mut self, sample: S) -> Result<()> {
        if let Some(newest) = self.newest_time() {
            if sample.time() < newest {
                return Err(ExtrapolationError::OutOfOrder {
                    kind: self.kind,
                    time: sample.time(),
                    newest,
                });
            }
        }
        self.samples.push_back(sample);
        Ok(())
    }

    /// Drops entries from the front while more than `min_retained` remain and
    /// the second oldest entry is at or before `reference_time - lookback`.
    /// Returns how many entries were dropped.
    pub fn trim(&mut self, reference_time: Time) -> usize {
        let horizon = reference_time - self.policy.lookback;
        let mut dropped = 0;
        while self.samples.len() > self.policy.min_retained
            && self.samples[1].time() <= horizon
        {
            self.samples.pop_front();
            dropped += 1;
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&S> {
        self.samples.get(index)
    }

    pub fn front(&self) -> Option<&S> {
        self.samples.front()
    }

    pub fn back(&self) -> Option<&S> {
        self.samples.back()
    }

    pub fn oldest_time(&self) -> Option<Time> {
        self.front().map(Timestamped::time)
    }

    pub fn newest_time(&self) -> Option<Time> {
        self.back().map(Timestamped::time)
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> + '_ {
        self.samples.iter()
    }

    /// Index of the first entry whose time is not before `time`
    /// (the buffer's `lower_bound`).
    pub fn lower_bound(&self, time: Time) -> usize {
        self.samples.partition_point(|s| s.time() < time)
    }

    /// Index of the newest entry at or before `time`, if any.
    pub fn last_at_or_before(&self, time: Time) -> Option<usize> {
        self.samples
            .partition_point(|s| s.time() <= time)
            .checked_sub(1)
    }
}
