//! Configuration file loading tests

use anyhow::Result;
use napt::config::{Config, ConfigManager};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_full_config_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("napt.toml");

    fs::write(
        &config_path,
        r#"
[relay]
chunk_length = 4096
expiration = "2s"
poll_interval = "20ms"
peek_window = 65536

[establish]
bind_host = "127.0.0.1"
connect_timeout = "3s"

[establish.backoff]
initial = "50ms"
max = "1s"
multiplier = 3

[logging]
level = "debug"
"#,
    )?;

    let config = ConfigManager::load_from_file(&config_path)?;

    assert_eq!(config.relay.chunk_length.get(), 4096);
    assert_eq!(config.relay.expiration, Duration::from_secs(2));
    assert_eq!(config.relay.poll_interval, Duration::from_millis(20));
    assert_eq!(config.relay.peek_window.get(), 65536);
    assert_eq!(config.establish.bind_host, "127.0.0.1");
    assert_eq!(config.establish.connect_timeout, Duration::from_secs(3));
    assert_eq!(config.establish.backoff.initial, Duration::from_millis(50));
    assert_eq!(config.establish.backoff.max, Duration::from_secs(1));
    assert_eq!(config.establish.backoff.multiplier, 3);
    assert_eq!(config.logging.level, "debug");

    Ok(())
}

#[test]
fn test_partial_config_uses_defaults() -> Result<()> {
    let config = ConfigManager::parse("[relay]\nchunk_length = 100000\n")?;

    let defaults = Config::default();
    assert_eq!(config.relay.chunk_length.get(), 100_000);
    assert_eq!(config.relay.expiration, defaults.relay.expiration);
    assert_eq!(config.establish, defaults.establish);
    assert_eq!(config.logging, defaults.logging);

    Ok(())
}

#[test]
fn test_missing_file_falls_back_to_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = ConfigManager::load_from_file(&temp_dir.path().join("absent.toml"))?;

    assert_eq!(config, Config::default());
    Ok(())
}

#[test]
fn test_invalid_files_are_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("napt.toml");

    for content in [
        "invalid toml content [[[",
        "[relay]\nchunk_length = 0\n",
        "[relay]\nexpiration = \"soon\"\n",
        "[relay]\nexpiration = \"1s\"\npoll_interval = \"2s\"\n",
        "[establish.backoff]\ninitial = \"10s\"\nmax = \"1s\"\n",
        "[logging]\nlevel = \"loud\"\n",
    ] {
        fs::write(&config_path, content)?;
        assert!(
            ConfigManager::load_from_file(&config_path).is_err(),
            "accepted invalid config: {}",
            content
        );
    }

    Ok(())
}

#[test]
fn test_config_round_trips_through_toml() -> Result<()> {
    let config = Config::default();
    let rendered = toml::to_string(&config)?;
    assert_eq!(ConfigManager::parse(&rendered)?, config);
    Ok(())
}
