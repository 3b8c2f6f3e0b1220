//! Directional Pump

use std::time::{Duration, Instant};

use tokio::io::AsyncWrite;
use tracing::{debug, trace};

use super::copy::copy_available;
use super::endpoint::Source;
use super::error::{RelayError, Termination};
use super::waiter::{wait_available, Availability};
use super::RelayOptions;

/// Which way a pump moves bytes within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From endpoint A to endpoint B
    Forward,
    /// From endpoint B to endpoint A
    Backward,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "a->b"),
            Direction::Backward => write!(f, "b->a"),
        }
    }
}

/// Final state of one pump
#[derive(Debug)]
pub struct PumpOutcome {
    pub direction: Direction,
    pub bytes: u64,
    pub cycles: u64,
    pub duration: Duration,
    pub termination: Termination,
}

/// Forward bytes from `source` to `sink` until end of stream, timeout or an
/// I/O error. Neither half is closed here.
pub async fn pump<R, W>(
    direction: Direction,
    source: &mut R,
    sink: &mut W,
    options: &RelayOptions,
) -> PumpOutcome
where
    R: Source,
    W: AsyncWrite + Unpin + Send,
{
    let started = Instant::now();
    let mut bytes = 0u64;
    let mut cycles = 0u64;

    let termination = loop {
        let available =
            match wait_available(source, options.expiration, options.poll_interval).await {
                Ok(Availability::Ready(count)) => count,
                Ok(Availability::Eof) => break Termination::Eof,
                Err(e) => break e.into(),
            };

        match copy_available(source, sink, available, options.chunk_length).await {
            Ok(report) => {
                bytes += report.bytes;
                cycles += 1;
                trace!(%direction, bytes = report.bytes, chunks = report.chunks, "Copied");
            }
            Err(e) => break RelayError::Io(e).into(),
        }
    };

    debug!(%direction, bytes, cycles, %termination, "Pump stopped");

    PumpOutcome {
        direction,
        bytes,
        cycles,
        duration: started.elapsed(),
        termination,
    }
}
