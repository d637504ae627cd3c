// halo_core/src/error.rs

use crate::types::Time;
use thiserror::Error;

/// Which stream a sample belongs to, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Pose,
    Imu,
    Odometry,
}

impl std::fmt::Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SampleKind::Pose => "pose",
            SampleKind::Imu => "IMU",
            SampleKind::Odometry => "odometry",
        };
        f.write_str(name)
    }
}

/// Why a query could not be answered yet. None of these indicate a bug;
/// the caller should simply wait for more data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// No pose has been added, so there is nothing to extrapolate from.
    NoPoses,
    /// No orientation tracker exists yet (no IMU sample and no pose so far).
    NoTracker,
    /// State integration needs at least two IMU samples.
    InsufficientImu { available: usize },
}

impl std::fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotReadyReason::NoPoses => f.write_str("no pose has been added yet"),
            NotReadyReason::NoTracker => f.write_str("no orientation tracker exists yet"),
            NotReadyReason::InsufficientImu { available } => {
                write!(f, "need at least 2 IMU samples, have {}", available)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtrapolationError {
    #[error("{kind} sample at t={time} precedes the newest known time t={newest}")]
    OutOfOrder {
        kind: SampleKind,
        time: Time,
        newest: Time,
    },

    #[error("cannot extrapolate to t={requested}, newest known time is t={newest}")]
    IntoThePast { requested: Time, newest: Time },

    #[error("no IMU sample at or before integration start t={start}")]
    UnbracketedStart { start: Time },

    #[error("not ready: {0}")]
    NotReady(NotReadyReason),

    #[error("invalid extrapolator configuration: {0}")]
    InvalidConfig(String),
}

impl ExtrapolationError {
    /// Fatal errors are contract violations by the caller. They must never be
    /// retried; the pipeline that produced them is broken.
    pub fn is_fatal(&self) -> bool {
        match self {
            ExtrapolationError::OutOfOrder { .. }
            | ExtrapolationError::IntoThePast { .. }
            | ExtrapolationError::UnbracketedStart { .. }
            | ExtrapolationError::InvalidConfig(_) => true,
            ExtrapolationError::NotReady(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtrapolationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_is_not_fatal() {
        let err = ExtrapolationError::NotReady(NotReadyReason::NoPoses);
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "not ready: no pose has been added yet");
    }

    #[test]
    fn test_out_of_order_is_fatal() {
        let err = ExtrapolationError::OutOfOrder {
            kind: SampleKind::Imu,
            time: 0.5,
            newest: 1.0,
        };
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("IMU sample at t=0.5"));
    }
}
