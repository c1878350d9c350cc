//! Error types for ridlink

use thiserror::Error;

/// Core ridlink errors
#[derive(Error, Debug)]
pub enum RidError {
    // Transport errors
    #[error("Transport not available")]
    TransportUnavailable,

    #[error("{0} permission not granted")]
    PermissionDenied(&'static str),

    #[error("Already connected, disconnect first")]
    AlreadyConnected,

    #[error("Not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timed out")]
    ConnectTimeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Framing / decoding errors
    #[error("Message too large: {size} bytes exceeds limit of {limit}")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Unknown message type")]
    UnknownMessage,

    // Track conversion errors
    #[error("Detection has no usable location")]
    InvalidLocation,

    #[error("Conversion failed: {0}")]
    Conversion(String),

    // Discovery / pairing errors
    #[error("Failed to start discovery: {0}")]
    DiscoveryFailed(String),

    #[error("Pairing failed: {0}")]
    PairingFailed(String),

    #[error("No paired {0} devices found")]
    NoPairedDevices(String),

    // Configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for ridlink operations
pub type RidResult<T> = Result<T, RidError>;
