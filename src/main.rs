//! NAPT - TCP port translation relay
//!
//! Pairs two TCP connections, accepted on local ports or dialed to remote
//! hosts, and relays bytes between them untouched.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use napt::{config::ConfigManager, Config, Establisher, ShutdownCoordinator};

/// CLI arguments for NAPT
#[derive(Parser, Debug)]
#[command(name = "napt")]
#[command(about = "Byte-transparent TCP port translation relay")]
#[command(version)]
#[command(long_about = "
Byte-transparent TCP port translation relay.

Every pair of connections becomes one relay session. Bytes are forwarded in
both directions until each side has reached end of stream, gone quiet for
longer than the expiration, or failed.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  NAPT_CHUNK_LENGTH     - Bytes moved per read/write cycle
  NAPT_EXPIRATION       - Max wait for data before a direction stops (e.g. 10s)
  NAPT_POLL_INTERVAL    - Wait granularity (e.g. 50ms)
  NAPT_CONNECT_TIMEOUT  - Outbound connect timeout (e.g. 10s)
  NAPT_BIND_HOST        - Address listeners bind to
  NAPT_LOG_LEVEL        - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    #[command(subcommand)]
    pub mode: Mode,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        default_value = "napt.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Bytes moved per read/write cycle")]
    pub chunk_length: Option<NonZeroUsize>,

    #[arg(
        long,
        global = true,
        value_parser = humantime::parse_duration,
        help = "Max wait for data (e.g. 10s)"
    )]
    pub expiration: Option<Duration>,

    #[arg(
        long,
        global = true,
        value_parser = humantime::parse_duration,
        help = "Wait granularity (e.g. 50ms)"
    )]
    pub poll_interval: Option<Duration>,

    #[arg(
        long,
        global = true,
        value_parser = humantime::parse_duration,
        help = "Outbound connect timeout"
    )]
    pub connect_timeout: Option<Duration>,

    #[arg(long, global = true, help = "Address listeners bind to")]
    pub bind_host: Option<String>,

    /// Validate configuration and exit
    #[arg(long, global = true, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

/// Establishment topology
#[derive(Subcommand, Debug, Clone)]
pub enum Mode {
    /// Accept on two local ports and pair the connections
    ListenListen { port0: u16, port1: u16 },
    /// Accept on a local port and dial a remote host for each connection
    ListenConnect { port0: u16, host1: String, port1: u16 },
    /// Dial two remote hosts and pair the connections
    ConnectConnect {
        host0: String,
        port0: u16,
        host1: String,
        port1: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Configuration priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(
        args.chunk_length,
        args.expiration,
        args.poll_interval,
        args.connect_timeout,
        args.bind_host.as_deref(),
    );
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    init_tracing(&args, &config)?;

    config
        .validate()
        .context("Final configuration validation failed")?;

    info!("Starting napt v{}", env!("CARGO_PKG_VERSION"));

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Chunk length: {} bytes", config.relay.chunk_length);
        info!("  Expiration: {:?}", config.relay.expiration);
        info!("  Poll interval: {:?}", config.relay.poll_interval);
        info!("  Connect timeout: {:?}", config.establish.connect_timeout);
        info!("  Bind host: {}", config.establish.bind_host);
        return Ok(());
    }

    let shutdown_coordinator = Arc::new(ShutdownCoordinator::new());
    let signals = Arc::clone(&shutdown_coordinator);
    tokio::spawn(async move {
        if let Err(e) = signals.listen_for_signals().await {
            error!("Error setting up signal handlers: {}", e);
        }
    });

    let establisher = Establisher::from_config(&config);
    if let Some(result) = shutdown_coordinator
        .run_until_shutdown(run_mode(establisher, args.mode))
        .await
    {
        if let Err(e) = &result {
            error!("Relay stopped: {:#}", e);
        }
        result?;
    }

    info!("Shutdown complete");
    Ok(())
}

async fn run_mode(establisher: Establisher, mode: Mode) -> Result<()> {
    match mode {
        Mode::ListenListen { port0, port1 } => establisher.listen_listen(port0, port1).await,
        Mode::ListenConnect { port0, host1, port1 } => {
            establisher.listen_connect(port0, &host1, port1).await
        }
        Mode::ConnectConnect {
            host0,
            port0,
            host1,
            port1,
        } => {
            establisher
                .connect_connect(&host0, port0, &host1, port1)
                .await
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, config: &Config) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
