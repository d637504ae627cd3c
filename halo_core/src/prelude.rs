// halo_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::prediction::{PredictionContext, PredictionStrategy};
pub use crate::tracker::{OrientationTracker, TrackerFactory};
pub use crate::types::Timestamped;

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::buffer::{RetentionPolicy, TimedBuffer};
pub use crate::types::{ImuSample, OdometrySample, Rigid3, State, Time, TimedPose};
pub use crate::velocity::{VelocityEstimate, VelocitySource};

// --- Orchestration ---
pub use crate::config::{ExtrapolatorConfig, StrategyKind};
pub use crate::error::{ExtrapolationError, NotReadyReason, SampleKind};
pub use crate::extrapolator::{Extrapolator, ExtrapolatorPhase};

// --- Concrete Implementations (Export common ones for convenience) ---
pub use crate::integration::{integrate_imu, ImuCalibration, ImuCursor, ImuIntegration};
pub use crate::prediction::{IncrementalStrategy, StateIntegrationStrategy};
pub use crate::tracker::ImuTracker;
