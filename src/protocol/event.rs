//! Client and server event types
//!
//! These enums are the routing table of the relay: one variant per named
//! event. Offer/answer/ICE payloads are opaque [`serde_json::Value`]s — the
//! relay forwards them untouched and never inspects SDP or candidate
//! contents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{ConnectionId, StreamId};

/// Events received from clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Broadcaster starts a new stream
    #[serde(rename_all = "camelCase")]
    StartStream {
        stream_id: StreamId,
        user_id: String,
        user_name: String,
    },

    /// Viewer joins an existing stream
    #[serde(rename_all = "camelCase")]
    JoinStream {
        stream_id: StreamId,
        user_id: String,
        user_name: String,
    },

    /// WebRTC offer from the broadcaster, addressed to one viewer
    #[serde(rename_all = "camelCase")]
    Offer { offer: Value, viewer_id: ConnectionId },

    /// WebRTC answer from a viewer, addressed to the broadcaster
    Answer {
        answer: Value,
        broadcaster: ConnectionId,
    },

    /// ICE candidate, forwarded in either direction
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        candidate: Value,
        target_id: ConnectionId,
    },

    /// Chat message scoped to a stream's group
    #[serde(rename_all = "camelCase")]
    StreamMessage {
        stream_id: StreamId,
        message: String,
        user_id: String,
        user_name: String,
    },

    /// Ephemeral like signal scoped to a stream's group
    #[serde(rename_all = "camelCase")]
    StreamLike { stream_id: StreamId, user_id: String },

    /// Broadcaster ends its own stream
    #[serde(rename_all = "camelCase")]
    EndStream { stream_id: StreamId },

    /// Request the active-stream catalog
    GetActiveStreams,
}

/// Events sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Greeting after accept, telling the client its connection id
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: ConnectionId },

    /// Acknowledgment to the broadcaster that its stream is registered
    #[serde(rename_all = "camelCase")]
    StreamStarted { stream_id: StreamId },

    /// Global catalog refresh, sent to every connection
    StreamListUpdated { streams: Vec<StreamSummary> },

    /// Targeted error reply (currently only join-on-missing-stream)
    StreamError { message: String },

    /// Tells the broadcaster a viewer arrived
    #[serde(rename_all = "camelCase")]
    ViewerJoined {
        viewer_id: ConnectionId,
        user_id: String,
        user_name: String,
        viewer_count: usize,
    },

    /// Tells the joining viewer which connection to negotiate with
    #[serde(rename_all = "camelCase")]
    StreamReady {
        stream_id: StreamId,
        broadcaster: ConnectionId,
    },

    /// Viewer-count update for everyone in the session group
    ViewerCountUpdated { count: usize },

    /// Forwarded offer, carrying the originating broadcaster's id
    Offer {
        offer: Value,
        broadcaster: ConnectionId,
    },

    /// Forwarded answer, carrying the originating viewer's id
    Answer { answer: Value, viewer: ConnectionId },

    /// Forwarded ICE candidate, carrying the sender's id
    IceCandidate {
        candidate: Value,
        sender: ConnectionId,
    },

    /// Chat message fan-out with a server timestamp
    #[serde(rename_all = "camelCase")]
    StreamMessage {
        message: String,
        user_id: String,
        user_name: String,
        timestamp: u64,
    },

    /// Like fan-out with a server timestamp
    #[serde(rename_all = "camelCase")]
    StreamLike { user_id: String, timestamp: u64 },

    /// The stream's session is over; sent to the whole group
    StreamEnded,

    /// Direct reply to a get-active-streams request
    StreamList { streams: Vec<StreamSummary> },
}

/// One entry in the active-stream catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSummary {
    /// Stream identifier
    pub stream_id: StreamId,
    /// Broadcaster's user id (display metadata, not validated)
    pub user_id: String,
    /// Broadcaster's display name
    pub user_name: String,
    /// Current number of attached viewers
    pub viewer_count: usize,
    /// Milliseconds elapsed since the session started
    pub duration: u64,
}
