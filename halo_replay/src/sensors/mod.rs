// halo_replay/src/sensors/mod.rs

use halo_core::types::Time;

pub mod imu;
pub mod odometry;

pub use imu::ImuSimulator;
pub use odometry::OdometrySimulator;

/// Fires at a fixed rate starting at t=0. Ticks are computed from an integer
/// counter so long runs do not accumulate rounding drift.
#[derive(Debug, Clone)]
pub struct RateClock {
    period: Time,
    ticks: u64,
}

impl RateClock {
    pub fn new(rate_hz: f64) -> Self {
        Self {
            period: 1.0 / rate_hz,
            ticks: 0,
        }
    }

    /// Time of the next tick.
    pub fn next_time(&self) -> Time {
        self.ticks as f64 * self.period
    }

    /// Consumes the next tick and returns its time.
    pub fn tick(&mut self) -> Time {
        let time = self.next_time();
        self.ticks += 1;
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_clock_ticks_at_rate() {
        let mut clock = RateClock::new(4.0);
        assert_eq!(clock.tick(), 0.0);
        assert_abs_diff_eq!(clock.tick(), 0.25);
        assert_abs_diff_eq!(clock.next_time(), 0.5);
    }
}
