//! NAPT Library
//!
//! Network address port translation: a byte-transparent TCP relay that pairs
//! two connections (accepted, dialed, or one of each) and pumps bytes
//! between them until both directions have stopped.

pub mod config;
pub mod connection;
pub mod relay;
pub mod shutdown;

pub use config::Config;
pub use connection::Establisher;
pub use relay::{run_session, RelayOptions, RelaySession};
pub use shutdown::ShutdownCoordinator;

/// Common error type for the relay
pub type Result<T> = anyhow::Result<T>;

/// Pair connections accepted on `port0` with connections accepted on `port1`
pub async fn listen_listen(port0: u16, port1: u16, options: RelayOptions) -> Result<()> {
    Establisher::new(options).listen_listen(port0, port1).await
}

/// Pair connections accepted on `port0` with outbound connections to `host1:port1`
pub async fn listen_connect(
    port0: u16,
    host1: &str,
    port1: u16,
    options: RelayOptions,
) -> Result<()> {
    Establisher::new(options).listen_connect(port0, host1, port1).await
}

/// Pair outbound connections to `host0:port0` with outbound connections to `host1:port1`
pub async fn connect_connect(
    host0: &str,
    port0: u16,
    host1: &str,
    port1: u16,
    options: RelayOptions,
) -> Result<()> {
    Establisher::new(options)
        .connect_connect(host0, port0, host1, port1)
        .await
}
