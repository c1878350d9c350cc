//! ridlink Transport Layer - Endpoints and byte-stream adapters
//!
//! This crate provides:
//! - The endpoint model (identity and pairing state)
//! - The `TransportAdapter` seam to the platform discovery/pairing subsystem
//! - A TCP adapter for devices bridged onto the network
//! - An in-memory adapter for tests and simulation

pub mod adapter;
pub mod endpoint;
pub mod memory;
pub mod tcp;

pub use adapter::*;
pub use endpoint::*;
pub use memory::MemoryTransport;
pub use tcp::TcpTransport;
