//! Availability Waiter

use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::time::{timeout, Instant};
use tracing::trace;

use super::endpoint::Source;
use super::error::RelayError;

/// What a source had to offer when the wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// This many bytes can be read without blocking
    Ready(NonZeroUsize),
    /// The source reached end of stream
    Eof,
}

/// Wait at most `expiration` for at least one readable byte.
///
/// Readiness is awaited in slices of `poll_interval`; once the accumulated
/// wait reaches `expiration` with nothing to read, the wait fails with
/// [`RelayError::Timeout`].
pub async fn wait_available<S>(
    source: &mut S,
    expiration: Duration,
    poll_interval: Duration,
) -> Result<Availability, RelayError>
where
    S: Source,
{
    let started = Instant::now();
    let slice = poll_interval.max(Duration::from_millis(1));

    loop {
        // A zero remaining wait still polls the source once
        let remaining = expiration.saturating_sub(started.elapsed());

        match timeout(slice.min(remaining), source.available()).await {
            Ok(Ok(count)) => {
                return Ok(NonZeroUsize::new(count).map_or(Availability::Eof, Availability::Ready));
            }
            Ok(Err(e)) => return Err(RelayError::Io(e)),
            Err(_) => {
                let elapsed = started.elapsed();
                if elapsed >= expiration {
                    return Err(RelayError::Timeout(elapsed));
                }
                trace!("Nothing readable after {:?}", elapsed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_returns_pending_count() {
        let mut source = BufReader::new(Builder::new().read(b"12345").build());

        let availability =
            wait_available(&mut source, Duration::from_secs(1), Duration::from_millis(50))
                .await
                .unwrap();
        assert_eq!(availability, Availability::Ready(NonZeroUsize::new(5).unwrap()));
    }

    #[tokio::test]
    async fn test_reports_eof() {
        let mut source = BufReader::new(Builder::new().build());

        let availability =
            wait_available(&mut source, Duration::from_secs(1), Duration::from_millis(50))
                .await
                .unwrap();
        assert_eq!(availability, Availability::Eof);
    }

    #[tokio::test(start_paused = true)]
    async fn test_data_arriving_within_expiration() {
        let mut source = BufReader::new(
            Builder::new()
                .wait(Duration::from_millis(300))
                .read(b"late")
                .build(),
        );

        let availability =
            wait_available(&mut source, Duration::from_secs(1), Duration::from_millis(50))
                .await
                .unwrap();
        assert_eq!(availability, Availability::Ready(NonZeroUsize::new(4).unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_expiration() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut source = BufReader::new(reader);
        let expiration = Duration::from_millis(500);

        let started = Instant::now();
        let result = wait_available(&mut source, expiration, Duration::from_millis(50)).await;

        match result {
            Err(RelayError::Timeout(waited)) => assert!(waited >= expiration),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(started.elapsed() >= expiration);
    }

    #[tokio::test]
    async fn test_zero_expiration_still_reports_ready_bytes() {
        let mut source = BufReader::new(Builder::new().read(b"ready").build());

        let availability = wait_available(&mut source, Duration::ZERO, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(availability, Availability::Ready(NonZeroUsize::new(5).unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_expiration_times_out_when_idle() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut source = BufReader::new(reader);

        let result = wait_available(&mut source, Duration::ZERO, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(RelayError::Timeout(_))));
    }
}
