//! Crate-level error types

use thiserror::Error;

/// Errors surfaced by the server front end
///
/// Relay operations themselves never fail; everything here is transport
/// setup (bind, accept, WebSocket handshake) or frame encoding.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the listener or a socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON encoding/decoding error
    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
}

/// Convenience result alias
pub type Result<T> = std::result::Result<T, Error>;
