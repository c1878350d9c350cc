//! ridlink Runtime - Session orchestration
//!
//! This crate ties the layers together:
//! 1. Open a byte stream on an endpoint
//! 2. Read chunks on a cancellable loop
//! 3. Frame complete JSON objects
//! 4. Classify and decode messages
//! 5. Gate detections on location validity
//! 6. Convert detections to track events
//! 7. Dispatch everything to listeners on one callback task

pub mod config;
pub mod listener;
pub mod logging;
pub mod manager;
pub mod pipeline;
mod reader;

pub use config::*;
pub use listener::*;
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use manager::*;
pub use pipeline::*;
