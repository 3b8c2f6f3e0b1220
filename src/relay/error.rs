//! Relay error types

use std::fmt;
use std::io;
use std::time::Duration;

/// Failure that ends one direction of a relay session
#[derive(Debug)]
pub enum RelayError {
    /// No byte became readable within the expiration
    Timeout(Duration),
    /// Read or write fault on either side of the pump
    Io(io::Error),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(waited) => write!(f, "no data available after {:?}", waited),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Timeout(_) => None,
        }
    }
}

impl From<io::Error> for RelayError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Why a directional pump stopped
#[derive(Debug)]
pub enum Termination {
    /// The source reached end of stream
    Eof,
    /// The pump failed with a timeout or an I/O error
    Failed(RelayError),
    /// The pump task panicked or was aborted
    Aborted(String),
}

impl Termination {
    /// True when the source ended cleanly
    pub fn is_eof(&self) -> bool {
        matches!(self, Termination::Eof)
    }

    /// True when the pump gave up waiting for data
    pub fn is_timeout(&self) -> bool {
        matches!(self, Termination::Failed(RelayError::Timeout(_)))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eof => write!(f, "eof"),
            Self::Failed(e) => write!(f, "{}", e),
            Self::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

impl From<RelayError> for Termination {
    fn from(e: RelayError) -> Self {
        Self::Failed(e)
    }
}
