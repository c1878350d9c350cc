//! Session manager configuration

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use ridlink_core::{RidError, RidResult};
use ridlink_wire::DEFAULT_MAX_MESSAGE_LEN;

/// Name prefix of the detection device
pub const DEFAULT_DEVICE_PREFIX: &str = "gyb_detect";

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// What to do after the read loop loses the link
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Stay disconnected until told otherwise
    #[default]
    Never,
    /// Retry with exponential backoff
    Backoff {
        max_attempts: u32,
        #[serde(rename = "initial_delay_ms", deserialize_with = "millis")]
        initial_delay: Duration,
        #[serde(rename = "max_delay_ms", deserialize_with = "millis")]
        max_delay: Duration,
    },
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based), or `None` when exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::Never => None,
            ReconnectPolicy::Backoff {
                max_attempts,
                initial_delay,
                max_delay,
            } => {
                if attempt == 0 || attempt > max_attempts {
                    return None;
                }
                let factor = 1u32 << (attempt - 1).min(16);
                Some(initial_delay.saturating_mul(factor).min(max_delay))
            }
        }
    }
}

/// Session manager configuration
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Bonded endpoints are listed only if their name starts with this
    pub device_name_prefix: String,
    /// Bytes requested per stream read
    pub read_buffer_size: usize,
    /// Largest JSON object the framer will buffer
    pub max_message_len: usize,
    #[serde(rename = "connect_timeout_ms", deserialize_with = "millis")]
    pub connect_timeout: Duration,
    /// How long `disconnect` waits for the read loop before aborting it
    #[serde(rename = "join_timeout_ms", deserialize_with = "millis")]
    pub join_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            device_name_prefix: DEFAULT_DEVICE_PREFIX.to_string(),
            read_buffer_size: 1024,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            connect_timeout: Duration::from_secs(10),
            join_timeout: Duration::from_secs(2),
            reconnect: ReconnectPolicy::Never,
        }
    }
}

impl ManagerConfig {
    pub fn from_json(text: &str) -> RidResult<Self> {
        let config: ManagerConfig =
            serde_json::from_str(text).map_err(|e| RidError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RidResult<()> {
        if self.read_buffer_size == 0 {
            return Err(RidError::Config("read_buffer_size must be positive".into()));
        }
        if self.max_message_len == 0 {
            return Err(RidError::Config("max_message_len must be positive".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(RidError::Config("connect_timeout must be positive".into()));
        }
        if let ReconnectPolicy::Backoff {
            initial_delay,
            max_delay,
            ..
        } = self.reconnect
        {
            if initial_delay > max_delay {
                return Err(RidError::Config(
                    "reconnect initial delay exceeds max delay".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.device_name_prefix, "gyb_detect");
        assert_eq!(config.read_buffer_size, 1024);
        assert_eq!(config.max_message_len, 64 * 1024);
        assert_eq!(config.join_timeout, Duration::from_secs(2));
        assert_eq!(config.reconnect, ReconnectPolicy::Never);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = ManagerConfig::from_json(
            r#"{"connect_timeout_ms": 2500,
                "reconnect": {"mode": "backoff", "max_attempts": 3,
                              "initial_delay_ms": 100, "max_delay_ms": 1000}}"#,
        )
        .unwrap();
        assert_eq!(config.connect_timeout, Duration::from_millis(2500));
        assert_eq!(config.read_buffer_size, 1024);
        assert_eq!(
            config.reconnect,
            ReconnectPolicy::Backoff {
                max_attempts: 3,
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_millis(1000),
            }
        );
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            ManagerConfig::from_json(r#"{"read_buffer_size": 0}"#),
            Err(RidError::Config(_))
        ));
        assert!(ManagerConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_backoff_delays() {
        let policy = ReconnectPolicy::Backoff {
            max_attempts: 4,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(0), None);
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for(5), None);
        assert_eq!(ReconnectPolicy::Never.delay_for(1), None);
    }
}
