//! ridlink Track - Detection to tactical track conversion
//!
//! This crate provides:
//! - The location gate that keeps unusable detections out of the display
//! - The track event model handed to the display/federation layer
//! - Detection to track event conversion
//! - Cursor on Target XML rendering

pub mod convert;
pub mod event;
pub mod normalize;
pub mod xml;

pub use convert::*;
pub use event::*;
pub use normalize::*;
