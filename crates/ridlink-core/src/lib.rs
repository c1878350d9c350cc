//! ridlink Core - Fundamental types for Remote ID ingestion
//!
//! This crate defines the types shared by every stage of the pipeline:
//! - Identifiers (TrackId) and timestamps
//! - Code tables (receive method, UA type, operational status)
//! - Decoded messages (DeviceInfo, BatteryStatus, Detection)
//! - The error taxonomy

pub mod class;
pub mod detection;
pub mod error;
pub mod id;
pub mod message;
pub mod time;

pub use class::*;
pub use detection::*;
pub use error::*;
pub use id::*;
pub use message::*;
pub use time::*;
