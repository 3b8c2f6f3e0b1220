//! Relay Session

use std::fmt;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::endpoint::Endpoint;
use super::error::Termination;
use super::pump::{pump, Direction, PumpOutcome};
use super::RelayOptions;

/// Lifecycle of a relay session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closing,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => write!(f, "active"),
            SessionState::Closing => write!(f, "closing"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// One forwarded connection pair.
///
/// Both endpoints belong to the session from construction until they are
/// closed at the end of [`RelaySession::run`].
pub struct RelaySession<A: Endpoint, B: Endpoint> {
    pub session_id: Uuid,
    a: A,
    b: B,
    options: RelayOptions,
}

/// Summary of a finished session
#[derive(Debug)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub a_label: String,
    pub b_label: String,
    pub forward: PumpOutcome,
    pub backward: PumpOutcome,
    pub duration: Duration,
    pub state: SessionState,
}

impl SessionReport {
    /// Total bytes moved in both directions
    pub fn total_bytes(&self) -> u64 {
        self.forward.bytes + self.backward.bytes
    }

    /// Log the session summary
    pub fn log(&self) {
        info!(
            session_id = %self.session_id,
            a = %self.a_label,
            b = %self.b_label,
            duration_ms = self.duration.as_millis() as u64,
            bytes_a_to_b = self.forward.bytes,
            bytes_b_to_a = self.backward.bytes,
            total_bytes = self.total_bytes(),
            a_to_b = %self.forward.termination,
            b_to_a = %self.backward.termination,
            "Relay session closed"
        );
    }
}

impl<A: Endpoint, B: Endpoint> RelaySession<A, B> {
    /// Create a session owning both endpoints
    pub fn new(a: A, b: B, options: RelayOptions) -> Self {
        let session_id = Uuid::new_v4();
        debug!("Creating relay session {} ({} <-> {})", session_id, a.label(), b.label());

        Self {
            session_id,
            a,
            b,
            options,
        }
    }

    /// Run both directions to completion, then close both endpoints.
    ///
    /// A direction that stops early does not cancel the other one; the
    /// endpoints are released only once both pumps have returned.
    pub async fn run(self) -> SessionReport {
        let started = Instant::now();
        let session_id = self.session_id;
        let a_label = self.a.label();
        let b_label = self.b.label();
        let options = self.options;

        let (a_source, a_sink) = self.a.split(&options);
        let (b_source, b_sink) = self.b.split(&options);

        debug!("Relay session {} is {}", session_id, SessionState::Active);

        let forward = spawn_pump(Direction::Forward, a_source, b_sink, options);
        let backward = spawn_pump(Direction::Backward, b_source, a_sink, options);
        let (forward, backward) = tokio::join!(forward, backward);

        debug!("Relay session {} is {}", session_id, SessionState::Closing);

        let (a_source, b_sink, forward) = settle(Direction::Forward, forward);
        let (b_source, a_sink, backward) = settle(Direction::Backward, backward);

        close_endpoint::<A>(session_id, &a_label, a_source, a_sink).await;
        close_endpoint::<B>(session_id, &b_label, b_source, b_sink).await;

        let report = SessionReport {
            session_id,
            a_label,
            b_label,
            forward,
            backward,
            duration: started.elapsed(),
            state: SessionState::Closed,
        };
        report.log();
        report
    }
}

/// Relay a pair of endpoints as a session and return its report
pub async fn run_session<A: Endpoint, B: Endpoint>(
    a: A,
    b: B,
    options: RelayOptions,
) -> SessionReport {
    RelaySession::new(a, b, options).run().await
}

type PumpTask<R, W> = JoinHandle<(R, W, PumpOutcome)>;

fn spawn_pump<R, W>(
    direction: Direction,
    mut source: R,
    mut sink: W,
    options: RelayOptions,
) -> PumpTask<R, W>
where
    R: super::endpoint::Source + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let outcome = pump(direction, &mut source, &mut sink, &options).await;
        (source, sink, outcome)
    })
}

/// Recover the halves a pump task owned. A panicked task has already
/// dropped them, so there is nothing left to close.
fn settle<R, W>(
    direction: Direction,
    joined: Result<(R, W, PumpOutcome), tokio::task::JoinError>,
) -> (Option<R>, Option<W>, PumpOutcome) {
    match joined {
        Ok((source, sink, outcome)) => (Some(source), Some(sink), outcome),
        Err(e) => {
            warn!(%direction, "Pump task ended abnormally: {}", e);
            let outcome = PumpOutcome {
                direction,
                bytes: 0,
                cycles: 0,
                duration: Duration::ZERO,
                termination: Termination::Aborted(e.to_string()),
            };
            (None, None, outcome)
        }
    }
}

async fn close_endpoint<E: Endpoint>(
    session_id: Uuid,
    label: &str,
    source: Option<E::Source>,
    sink: Option<E::Sink>,
) {
    match (source, sink) {
        (Some(source), Some(sink)) => {
            if let Err(e) = E::close(source, sink).await {
                debug!("Relay session {}: error closing {}: {}", session_id, label, e);
            }
        }
        _ => warn!("Relay session {}: {} was released by an aborted pump", session_id, label),
    }
}
