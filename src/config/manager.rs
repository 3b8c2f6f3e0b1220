//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

/// Largest accepted chunk length (64 MiB)
const MAX_CHUNK_LENGTH: usize = 64 * 1024 * 1024;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config = Self::parse(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse and validate TOML configuration text
    pub fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        config
            .validate()
            .context("Configuration validation failed")?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Override fields from `NAPT_*` variables resolved through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(chunk_length) = lookup("NAPT_CHUNK_LENGTH") {
            self.relay.chunk_length = chunk_length
                .parse::<NonZeroUsize>()
                .with_context(|| format!("Invalid NAPT_CHUNK_LENGTH: {}", chunk_length))?;
        }

        if let Some(expiration) = lookup("NAPT_EXPIRATION") {
            self.relay.expiration = humantime::parse_duration(&expiration)
                .with_context(|| format!("Invalid NAPT_EXPIRATION: {}", expiration))?;
        }

        if let Some(poll_interval) = lookup("NAPT_POLL_INTERVAL") {
            self.relay.poll_interval = humantime::parse_duration(&poll_interval)
                .with_context(|| format!("Invalid NAPT_POLL_INTERVAL: {}", poll_interval))?;
        }

        if let Some(connect_timeout) = lookup("NAPT_CONNECT_TIMEOUT") {
            self.establish.connect_timeout = humantime::parse_duration(&connect_timeout)
                .with_context(|| format!("Invalid NAPT_CONNECT_TIMEOUT: {}", connect_timeout))?;
        }

        if let Some(bind_host) = lookup("NAPT_BIND_HOST") {
            self.establish.bind_host = bind_host;
        }

        if let Some(log_level) = lookup("NAPT_LOG_LEVEL") {
            self.logging.level = log_level;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_relay_config()
            .context("Relay configuration validation failed")?;

        self.validate_establish_config()
            .context("Establishment configuration validation failed")?;

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", VALID_LOG_LEVELS.join(", "));
        }

        Ok(())
    }

    fn validate_relay_config(&self) -> Result<()> {
        let relay = &self.relay;

        if relay.chunk_length.get() > MAX_CHUNK_LENGTH {
            bail!("chunk_length cannot exceed {} bytes", MAX_CHUNK_LENGTH);
        }

        if relay.expiration.is_zero() {
            bail!("expiration must be greater than 0");
        }

        if relay.poll_interval.is_zero() {
            bail!("poll_interval must be greater than 0");
        }

        if relay.poll_interval > relay.expiration {
            bail!("poll_interval cannot exceed expiration");
        }

        if relay.peek_window.get() > MAX_CHUNK_LENGTH {
            bail!("peek_window cannot exceed {} bytes", MAX_CHUNK_LENGTH);
        }

        Ok(())
    }

    fn validate_establish_config(&self) -> Result<()> {
        let establish = &self.establish;

        if establish.bind_host.trim().is_empty() {
            bail!("bind_host must not be empty");
        }

        if establish.connect_timeout.is_zero() {
            bail!("connect_timeout must be greater than 0");
        }

        if establish.backoff.initial.is_zero() {
            bail!("backoff.initial must be greater than 0");
        }

        if establish.backoff.initial > establish.backoff.max {
            bail!("backoff.initial cannot exceed backoff.max");
        }

        if establish.backoff.multiplier == 0 {
            bail!("backoff.multiplier must be at least 1");
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        chunk_length: Option<NonZeroUsize>,
        expiration: Option<Duration>,
        poll_interval: Option<Duration>,
        connect_timeout: Option<Duration>,
        bind_host: Option<&str>,
    ) {
        if let Some(chunk_length) = chunk_length {
            self.relay.chunk_length = chunk_length;
            tracing::info!("CLI override: chunk length set to {} bytes", chunk_length);
        }

        if let Some(expiration) = expiration {
            self.relay.expiration = expiration;
            tracing::info!("CLI override: expiration set to {:?}", expiration);
        }

        if let Some(poll_interval) = poll_interval {
            self.relay.poll_interval = poll_interval;
            tracing::info!("CLI override: poll interval set to {:?}", poll_interval);
        }

        if let Some(connect_timeout) = connect_timeout {
            self.establish.connect_timeout = connect_timeout;
            tracing::info!("CLI override: connect timeout set to {:?}", connect_timeout);
        }

        if let Some(bind_host) = bind_host {
            self.establish.bind_host = bind_host.to_string();
            tracing::info!("CLI override: bind host set to {}", bind_host);
        }
    }
}
