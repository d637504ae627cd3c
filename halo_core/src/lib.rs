// halo_core/src/lib.rs

// Short-horizon pose extrapolation from IMU, odometry and pose observations.
// Pure library: no I/O, no threads, no global state.
pub mod buffer;
pub mod config;
pub mod error;
pub mod extrapolator;
pub mod integration;
pub mod prediction;
pub mod prelude;
pub mod tracker;
pub mod types;
pub mod velocity;
