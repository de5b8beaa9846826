//! Session registry implementation
//!
//! The central registry that tracks all active live-stream sessions and
//! answers, for every mutation, which connections need to hear about it.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::error::RegistryError;
use super::session::StreamSession;
use crate::protocol::{ConnectionId, StreamId, StreamSummary};

/// Result of a successful join
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Broadcaster the viewer should negotiate with
    pub broadcaster: ConnectionId,
    /// Viewer count after the join
    pub viewer_count: usize,
    /// Everyone in the session's group, for the count broadcast
    pub members: Vec<ConnectionId>,
}

/// A session that was removed from the registry
#[derive(Debug, Clone)]
pub struct EndedSession {
    /// Id of the removed stream
    pub stream_id: StreamId,
    /// Group membership at the moment of removal
    pub members: Vec<ConnectionId>,
}

/// A session that lost a viewer
#[derive(Debug, Clone)]
pub struct ViewerUpdate {
    /// Id of the affected stream
    pub stream_id: StreamId,
    /// Viewer count after the removal
    pub viewer_count: usize,
    /// Remaining group membership
    pub members: Vec<ConnectionId>,
}

/// Everything a disconnect touched
///
/// A single connection can be the broadcaster of one session and a viewer
/// of others; the cleanup scan reports all of them.
#[derive(Debug, Clone, Default)]
pub struct DisconnectCleanup {
    /// Sessions terminated because the connection was their broadcaster
    pub ended: Vec<EndedSession>,
    /// Sessions the connection was removed from as a viewer
    pub viewer_updates: Vec<ViewerUpdate>,
}

/// Central registry for all active sessions
///
/// Thread-safe via `RwLock`. Read-heavy callers (catalog listing, group
/// lookups) take the read lock; every mutation takes the write lock once so
/// it is atomic with respect to concurrent operations on the same stream.
pub struct SessionRegistry {
    /// Map of stream id to session state
    sessions: RwLock<HashMap<StreamId, StreamSession>>,
}

impl SessionRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new session for a broadcaster
    ///
    /// No uniqueness precondition is enforced: registering an id that is
    /// still active replaces the old entry (last-writer-wins), and one
    /// connection may broadcast several distinct stream ids at once.
    pub async fn register(
        &self,
        stream_id: StreamId,
        broadcaster: ConnectionId,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
    ) {
        let session = StreamSession::new(broadcaster, user_id, user_name);

        let mut sessions = self.sessions.write().await;
        let replaced = sessions.insert(stream_id.clone(), session).is_some();

        tracing::info!(
            stream = %stream_id,
            connection_id = broadcaster.0,
            replaced = replaced,
            "Broadcaster registered"
        );
    }

    /// Attach a viewer to a session
    ///
    /// Idempotent for a viewer that is already attached (set semantics).
    pub async fn join(
        &self,
        stream_id: &StreamId,
        viewer: ConnectionId,
    ) -> Result<JoinOutcome, RegistryError> {
        let mut sessions = self.sessions.write().await;

        let session = sessions
            .get_mut(stream_id)
            .ok_or_else(|| RegistryError::StreamNotFound(stream_id.clone()))?;

        session.viewers.insert(viewer);

        tracing::info!(
            stream = %stream_id,
            connection_id = viewer.0,
            viewers = session.viewer_count(),
            "Viewer joined"
        );

        Ok(JoinOutcome {
            broadcaster: session.broadcaster,
            viewer_count: session.viewer_count(),
            members: session.group_members(),
        })
    }

    /// End a session, if the caller is its broadcaster
    ///
    /// Returns the removed session's membership so the caller can deliver
    /// the ended notification. A non-broadcaster caller gets
    /// `NotBroadcaster` and the session is untouched.
    pub async fn end(
        &self,
        stream_id: &StreamId,
        caller: ConnectionId,
    ) -> Result<EndedSession, RegistryError> {
        let mut sessions = self.sessions.write().await;

        let session = sessions
            .get(stream_id)
            .ok_or_else(|| RegistryError::StreamNotFound(stream_id.clone()))?;

        if session.broadcaster != caller {
            tracing::warn!(
                stream = %stream_id,
                expected = session.broadcaster.0,
                actual = caller.0,
                "End-stream from non-broadcaster ignored"
            );
            return Err(RegistryError::NotBroadcaster(stream_id.clone()));
        }

        let members = session.group_members();
        sessions.remove(stream_id);

        tracing::info!(stream = %stream_id, connection_id = caller.0, "Stream ended");

        Ok(EndedSession {
            stream_id: stream_id.clone(),
            members,
        })
    }

    /// Group membership of a session: broadcaster plus viewers
    ///
    /// `None` if the stream id is unknown.
    pub async fn group_members(&self, stream_id: &StreamId) -> Option<Vec<ConnectionId>> {
        let sessions = self.sessions.read().await;
        sessions.get(stream_id).map(StreamSession::group_members)
    }

    /// Remove a disconnected connection from every session it appears in
    ///
    /// Scans the whole registry: sessions the connection was broadcasting
    /// are terminated, sessions it was viewing lose one viewer. The scan is
    /// not short-circuited after the first match. A connection that appears
    /// nowhere yields an empty cleanup, so duplicate disconnects are no-ops.
    pub async fn remove_connection(&self, connection_id: ConnectionId) -> DisconnectCleanup {
        let mut sessions = self.sessions.write().await;
        let mut cleanup = DisconnectCleanup::default();

        sessions.retain(|stream_id, session| {
            if session.broadcaster == connection_id {
                tracing::info!(
                    stream = %stream_id,
                    connection_id = connection_id.0,
                    "Broadcaster disconnected, ending stream"
                );
                cleanup.ended.push(EndedSession {
                    stream_id: stream_id.clone(),
                    members: session.group_members(),
                });
                false
            } else {
                if session.viewers.remove(&connection_id) {
                    tracing::debug!(
                        stream = %stream_id,
                        connection_id = connection_id.0,
                        viewers = session.viewer_count(),
                        "Viewer disconnected"
                    );
                    cleanup.viewer_updates.push(ViewerUpdate {
                        stream_id: stream_id.clone(),
                        viewer_count: session.viewer_count(),
                        members: session.group_members(),
                    });
                }
                true
            }
        });

        cleanup
    }

    /// Catalog of every active session
    pub async fn summaries(&self) -> Vec<StreamSummary> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .map(|(stream_id, session)| session.summary(stream_id))
            .collect()
    }

    /// Check if a session exists
    pub async fn contains(&self, stream_id: &StreamId) -> bool {
        self.sessions.read().await.contains_key(stream_id)
    }

    /// Total number of active sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
