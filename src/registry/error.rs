//! Registry error types

use crate::protocol::StreamId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No session is registered under this stream id
    StreamNotFound(StreamId),
    /// The caller is not the broadcaster of this session
    NotBroadcaster(StreamId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::StreamNotFound(id) => write!(f, "Stream not found: {}", id),
            RegistryError::NotBroadcaster(id) => {
                write!(f, "Caller is not the broadcaster of stream: {}", id)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
