//! Connection Establishment Module
//!
//! Listens, connects and pairs TCP endpoints for relay sessions.

pub mod establisher;
pub mod retry;

pub use establisher::Establisher;
pub use retry::{ExponentialBackoff, FixedDelay, RetryPolicy};
