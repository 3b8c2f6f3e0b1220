//! Configuration Types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::relay::RelayOptions;

/// Address listeners bind to unless configured otherwise
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Upper bound on a single outbound connect
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub relay: RelayOptions,
    pub establish: EstablishConfig,
    pub logging: LoggingConfig,
}

/// Establishment configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EstablishConfig {
    pub bind_host: String,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    pub backoff: BackoffConfig,
}

/// Retry backoff configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    #[serde(with = "humantime_serde")]
    pub initial: Duration,
    #[serde(with = "humantime_serde")]
    pub max: Duration,
    pub multiplier: u32,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for EstablishConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            backoff: BackoffConfig::default(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(5),
            multiplier: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
