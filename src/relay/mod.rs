//! Signaling relay
//!
//! [`SignalingRelay`] is the component the server hands every inbound event
//! to. It owns the [`SessionRegistry`](crate::registry::SessionRegistry) and
//! a table of outbound connection senders, and routes each event to the
//! right recipients: targeted replies, session-group fan-out, or a global
//! catalog broadcast.
//!
//! Delivery is fire-and-forget throughout. Each send is a non-blocking push
//! onto the target connection's queue; a recipient that is gone or slow is
//! skipped, never awaited, and never aborts delivery to the rest of a group.

pub mod connections;
pub mod service;

pub use connections::ConnectionTable;
pub use service::SignalingRelay;
