//! ridlink Test Harness - Device simulation and stream chaos
//!
//! This crate provides:
//! - A simulated gyb_detect device producing realistic message streams
//! - Chaos fragmentation of byte streams (arbitrary chunking, line noise)
//! - Replay helpers that drive the pipeline or a live session manager

pub mod chaos;
pub mod replay;
pub mod simulator;

pub use chaos::*;
pub use replay::*;
pub use simulator::*;
