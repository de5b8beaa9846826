//! Wire protocol for the signaling relay
//!
//! Every frame on the wire is a JSON object with an `event` name and an
//! optional `data` payload:
//!
//! ```json
//! {"event": "join-stream", "data": {"streamId": "s1", "userId": "u2", "userName": "Bob"}}
//! ```
//!
//! Inbound frames deserialize into [`ClientEvent`], outbound frames serialize
//! from [`ServerEvent`]. Field names are part of the contract: payload keys
//! are camelCase, event names kebab-case, matching the original socket.io
//! clients bit-for-bit.

pub mod event;
pub mod ids;

pub use event::{ClientEvent, ServerEvent, StreamSummary};
pub use ids::{ConnectionId, StreamId};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as Unix milliseconds
///
/// Used for chat/like timestamps, which clients display directly.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
