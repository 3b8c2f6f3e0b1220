//! Data Relay Module
//!
//! Byte-transparent forwarding between two endpoints. Each session runs two
//! directional pumps; each pump alternates between waiting for readable bytes
//! and draining them in fixed-size chunks.

pub mod copy;
pub mod endpoint;
pub mod error;
pub mod pump;
pub mod session;
pub mod waiter;

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use copy::{copy_available, CopyReport};
pub use endpoint::{Endpoint, PeekSource, Source};
pub use error::{RelayError, Termination};
pub use pump::{pump, Direction, PumpOutcome};
pub use session::{run_session, RelaySession, SessionReport, SessionState};
pub use waiter::{wait_available, Availability};

/// Default chunk length (100 KiB)
pub const DEFAULT_CHUNK_LENGTH: NonZeroUsize = non_zero(100 * 1024);

/// Default maximum wait for data
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(10);

/// Default wait granularity
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default upper bound on bytes measured per cycle on a socket, one chunk
pub const DEFAULT_PEEK_WINDOW: NonZeroUsize = DEFAULT_CHUNK_LENGTH;

const fn non_zero(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => panic!("zero default"),
    }
}

/// Tunables shared by every pump of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayOptions {
    pub chunk_length: NonZeroUsize,
    #[serde(with = "humantime_serde")]
    pub expiration: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    pub peek_window: NonZeroUsize,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            chunk_length: DEFAULT_CHUNK_LENGTH,
            expiration: DEFAULT_EXPIRATION,
            poll_interval: DEFAULT_POLL_INTERVAL,
            peek_window: DEFAULT_PEEK_WINDOW,
        }
    }
}
