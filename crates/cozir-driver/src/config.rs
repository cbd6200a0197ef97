//! Driver configuration

use std::path::Path;
use std::time::Duration;

use cozir_protocol::{timing, DEFAULT_BAUD_RATE};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DriverError};

/// Configuration for a single sensor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverConfig {
    /// Serial port path, e.g. `/dev/ttyUSB0`
    pub port: String,
    /// Feed identifier attached to every reading
    #[serde(alias = "feedId")]
    pub feed_id: String,
    /// Minutes to wait between poll cycles (must be > 0)
    #[serde(alias = "cozirPollInterval")]
    pub poll_interval_minutes: u32,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Events buffered per subscriber before the oldest are skipped
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_event_capacity() -> usize {
    256
}

impl DriverConfig {
    /// Create a configuration with default baud rate and event capacity
    pub fn new(
        port: impl Into<String>,
        feed_id: impl Into<String>,
        poll_interval_minutes: u32,
    ) -> Self {
        Self {
            port: port.into(),
            feed_id: feed_id.into(),
            poll_interval_minutes,
            baud_rate: default_baud_rate(),
            event_capacity: default_event_capacity(),
        }
    }

    /// Check the configuration for values the driver cannot run with
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.port.trim().is_empty() {
            return Err(DriverError::InvalidConfig("port must not be empty".into()));
        }
        if self.poll_interval_minutes == 0 {
            return Err(DriverError::InvalidConfig(
                "poll interval must be at least one minute".into(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(DriverError::InvalidConfig("baud rate must be non-zero".into()));
        }
        if self.event_capacity == 0 {
            return Err(DriverError::InvalidConfig(
                "event capacity must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Wait between the humidity query and the next cycle
    pub fn poll_interval(&self) -> Duration {
        timing::poll_interval(self.poll_interval_minutes)
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::new("/dev/ttyUSB0", "feed-1", 5);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.event_capacity, 256);
        assert_eq!(config.poll_interval(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = DriverConfig::new("/dev/ttyUSB0", "feed-1", 0);
        assert!(matches!(
            config.validate(),
            Err(DriverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_port_rejected() {
        let config = DriverConfig::new("  ", "feed-1", 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_with_legacy_keys() {
        let json = r#"{
            "feedId": "SJepT1uSb-",
            "cozirPollInterval": 1,
            "port": "/dev/ttyUSB0",
            "type": "COZIR",
            "id": "c/t/h"
        }"#;
        let config = DriverConfig::from_json_str(json).unwrap();
        assert_eq!(config.feed_id, "SJepT1uSb-");
        assert_eq!(config.poll_interval_minutes, 1);
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
    }

    #[test]
    fn test_json_round_trip_fields() {
        let json = r#"{
            "port": "/dev/ttyS1",
            "feed_id": "lab",
            "poll_interval_minutes": 10,
            "baud_rate": 19200,
            "event_capacity": 16
        }"#;
        let config = DriverConfig::from_json_str(json).unwrap();
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.event_capacity, 16);
    }

    #[test]
    fn test_json_validation_failure() {
        let json = r#"{"port": "/dev/ttyS1", "feed_id": "lab", "poll_interval_minutes": 0}"#;
        assert!(matches!(
            DriverConfig::from_json_str(json),
            Err(ConfigError::Invalid(DriverError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            DriverConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
    }
}
