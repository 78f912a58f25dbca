//! Relay error types.
//!
//! Transport failures are recovered internally by the client's reconnect
//! loop; `RelayError` exists so those internal paths stay pattern-matchable
//! instead of stringly-typed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The WebSocket handshake or connection attempt failed.
    #[error("relay connection failed: {0}")]
    Connect(String),

    /// An inbound frame could not be parsed as an event envelope.
    #[error("malformed event payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The underlying stream errored mid-connection.
    #[error("relay transport error: {0}")]
    Transport(String),
}
