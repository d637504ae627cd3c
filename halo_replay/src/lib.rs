// halo_replay/src/lib.rs

// The host pipeline around `halo_core`: synthetic sensors, a stand-in scan
// matcher and the accumulation stage, driven from a scenario file.
pub mod cli;
pub mod config;
pub mod error;
pub mod motion;
pub mod observer;
pub mod pipeline;
pub mod prng;
pub mod replay;
pub mod sensors;
