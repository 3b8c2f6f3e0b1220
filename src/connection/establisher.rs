//! Endpoint Establisher
//!
//! Produces connected socket pairs by listening, connecting, or both, and
//! hands every pair to a freshly spawned relay session. Each mode loops
//! forever; a failed attempt is logged, the partial pair is dropped and the
//! retry policy decides how long to pause before the next try.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::retry::{ExponentialBackoff, RetryPolicy};
use crate::config::{Config, DEFAULT_BIND_HOST, DEFAULT_CONNECT_TIMEOUT};
use crate::relay::{RelayOptions, RelaySession};
use crate::Result;

/// Builds endpoint pairs and dispatches relay sessions
pub struct Establisher<P = ExponentialBackoff> {
    options: RelayOptions,
    bind_host: String,
    connect_timeout: Duration,
    retry: P,
}

impl Establisher<ExponentialBackoff> {
    /// Create an establisher with default bind host, timeout and backoff
    pub fn new(options: RelayOptions) -> Self {
        Self {
            options,
            bind_host: DEFAULT_BIND_HOST.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry: ExponentialBackoff::default(),
        }
    }

    /// Create an establisher from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            options: config.relay,
            bind_host: config.establish.bind_host.clone(),
            connect_timeout: config.establish.connect_timeout,
            retry: ExponentialBackoff::from_config(&config.establish.backoff),
        }
    }
}

impl<P: RetryPolicy> Establisher<P> {
    /// Replace the retry policy
    pub fn with_retry_policy<Q: RetryPolicy>(self, retry: Q) -> Establisher<Q> {
        Establisher {
            options: self.options,
            bind_host: self.bind_host,
            connect_timeout: self.connect_timeout,
            retry,
        }
    }

    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = host.into();
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn options(&self) -> &RelayOptions {
        &self.options
    }

    /// Bind a listening socket on the configured host
    pub async fn bind(&self, port: u16) -> Result<TcpListener> {
        let listener = TcpListener::bind((self.bind_host.as_str(), port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", self.bind_host, port))?;
        info!("Listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Pair connections accepted on `port0` with connections accepted on `port1`.
    ///
    /// Only fails if either port cannot be bound.
    pub async fn listen_listen(self, port0: u16, port1: u16) -> Result<()> {
        let listener0 = self.bind(port0).await?;
        let listener1 = self.bind(port1).await?;
        self.serve_listen_listen(listener0, listener1).await
    }

    /// Pair connections accepted on `port0` with outbound connections to `host1:port1`.
    ///
    /// Only fails if `port0` cannot be bound.
    pub async fn listen_connect(self, port0: u16, host1: &str, port1: u16) -> Result<()> {
        let listener0 = self.bind(port0).await?;
        self.serve_listen_connect(listener0, host1, port1).await
    }

    /// Accept loop of [`Establisher::listen_listen`] over already bound listeners
    pub async fn serve_listen_listen(
        mut self,
        listener0: TcpListener,
        listener1: TcpListener,
    ) -> Result<()> {
        info!(
            "Relaying {} <-> {}",
            local_addr(&listener0),
            local_addr(&listener1)
        );

        loop {
            let first = match accept(&listener0).await {
                Ok(stream) => stream,
                Err(e) => {
                    self.back_off(&e).await;
                    continue;
                }
            };

            let second = match accept(&listener1).await {
                Ok(stream) => stream,
                Err(e) => {
                    drop(first);
                    self.back_off(&e).await;
                    continue;
                }
            };

            self.dispatch(first, second);
        }
    }

    /// Accept loop of [`Establisher::listen_connect`] over an already bound listener
    pub async fn serve_listen_connect(
        mut self,
        listener0: TcpListener,
        host1: &str,
        port1: u16,
    ) -> Result<()> {
        info!("Relaying {} -> {}:{}", local_addr(&listener0), host1, port1);

        loop {
            let first = match accept(&listener0).await {
                Ok(stream) => stream,
                Err(e) => {
                    self.back_off(&e).await;
                    continue;
                }
            };

            let second = match self.connect(host1, port1).await {
                Ok(stream) => stream,
                Err(e) => {
                    drop(first);
                    self.back_off(&e).await;
                    continue;
                }
            };

            self.dispatch(first, second);
        }
    }

    /// Pair outbound connections to `host0:port0` with outbound connections to `host1:port1`
    pub async fn connect_connect(
        mut self,
        host0: &str,
        port0: u16,
        host1: &str,
        port1: u16,
    ) -> Result<()> {
        info!("Relaying {}:{} <-> {}:{}", host0, port0, host1, port1);

        loop {
            let first = match self.connect(host0, port0).await {
                Ok(stream) => stream,
                Err(e) => {
                    self.back_off(&e).await;
                    continue;
                }
            };

            let second = match self.connect(host1, port1).await {
                Ok(stream) => stream,
                Err(e) => {
                    drop(first);
                    self.back_off(&e).await;
                    continue;
                }
            };

            self.dispatch(first, second);
        }
    }

    async fn connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        debug!("Connecting to {}:{}", host, port);
        match timeout(self.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(anyhow!("Connection to {}:{} failed: {}", host, port, e)),
            Err(_) => Err(anyhow!(
                "Connection to {}:{} timed out after {:?}",
                host,
                port,
                self.connect_timeout
            )),
        }
    }

    async fn back_off(&mut self, error: &anyhow::Error) {
        let delay = self.retry.next_delay();
        warn!("Failed to establish endpoint pair: {:#}; retrying in {:?}", error, delay);
        sleep(delay).await;
    }

    fn dispatch(&mut self, a: TcpStream, b: TcpStream) {
        self.retry.reset();
        let session = RelaySession::new(a, b, self.options);
        info!("Dispatching relay session {}", session.session_id);
        tokio::spawn(session.run());
    }
}

async fn accept(listener: &TcpListener) -> Result<TcpStream> {
    let (stream, addr) = listener
        .accept()
        .await
        .with_context(|| format!("Failed to accept on {}", local_addr(listener)))?;
    debug!("Accepted connection from {}", addr);
    Ok(stream)
}

fn local_addr(listener: &TcpListener) -> String {
    listener
        .local_addr()
        .map(|addr: SocketAddr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
