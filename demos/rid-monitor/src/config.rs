//! Monitor configuration file
//!
//! ```toml
//! [device]
//! name = "gyb_detect-01"
//! address = "192.168.4.1:8888"
//!
//! [manager]
//! connect_timeout_ms = 5000
//! reconnect = { mode = "backoff", max_attempts = 5, initial_delay_ms = 500, max_delay_ms = 8000 }
//!
//! [logging]
//! level = "info,ridlink_wire=debug"
//! format = "json"
//!
//! [output]
//! format = "xml"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use ridlink_core::{RidError, RidResult};
use ridlink_runtime::{LoggingConfig, ManagerConfig};
use ridlink_transport::Endpoint;

/// Receiver to connect to
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DeviceConfig {
    pub name: Option<String>,
    /// `host:port` of the serial-to-TCP bridge
    pub address: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            name: Some("gyb_detect".to_string()),
            address: "127.0.0.1:8888".to_string(),
        }
    }
}

impl DeviceConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.name.clone(), self.address.as_str())
    }
}

/// How each track event is printed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One summary line per track
    #[default]
    Summary,
    /// Full Cursor on Target document
    Xml,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub device: DeviceConfig,
    pub manager: ManagerConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

impl MonitorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> RidResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| RidError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(text: &str) -> RidResult<Self> {
        let config: MonitorConfig =
            toml::from_str(text).map_err(|e| RidError::Config(e.to_string()))?;
        config.manager.validate()?;
        Ok(config)
    }
}
