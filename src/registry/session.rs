//! Per-stream session state
//!
//! One [`StreamSession`] per live broadcast: exactly one broadcaster
//! connection, a set of viewer connections, and the start instant used to
//! compute elapsed duration for the catalog.

use std::collections::HashSet;
use std::time::Instant;

use crate::protocol::{ConnectionId, StreamId, StreamSummary};

/// State for a single live stream
#[derive(Debug, Clone)]
pub struct StreamSession {
    /// Connection that owns this session
    pub broadcaster: ConnectionId,

    /// Broadcaster's user id (display metadata, not validated)
    pub user_id: String,

    /// Broadcaster's display name
    pub user_name: String,

    /// Connections currently attached as viewers
    ///
    /// Set semantics: a connection appears at most once, so re-joining is
    /// idempotent.
    pub viewers: HashSet<ConnectionId>,

    /// When the session was created
    pub started_at: Instant,
}

impl StreamSession {
    /// Create a new session with an empty viewer set
    pub fn new(
        broadcaster: ConnectionId,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            broadcaster,
            user_id: user_id.into(),
            user_name: user_name.into(),
            viewers: HashSet::new(),
            started_at: Instant::now(),
        }
    }

    /// Get the number of attached viewers
    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    /// All connections in this session's group: broadcaster plus viewers
    pub fn group_members(&self) -> Vec<ConnectionId> {
        let mut members = Vec::with_capacity(1 + self.viewers.len());
        members.push(self.broadcaster);
        members.extend(self.viewers.iter().copied());
        members
    }

    /// Catalog entry for this session
    pub fn summary(&self, stream_id: &StreamId) -> StreamSummary {
        StreamSummary {
            stream_id: stream_id.clone(),
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
            viewer_count: self.viewer_count(),
            duration: self.started_at.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_members_includes_broadcaster() {
        let mut session = StreamSession::new(ConnectionId(1), "u1", "Alice");
        session.viewers.insert(ConnectionId(2));
        session.viewers.insert(ConnectionId(3));

        let members = session.group_members();
        assert_eq!(members.len(), 3);
        assert!(members.contains(&ConnectionId(1)));
        assert!(members.contains(&ConnectionId(2)));
        assert!(members.contains(&ConnectionId(3)));
    }

    #[test]
    fn test_viewer_set_is_idempotent() {
        let mut session = StreamSession::new(ConnectionId(1), "u1", "Alice");
        session.viewers.insert(ConnectionId(2));
        session.viewers.insert(ConnectionId(2));

        assert_eq!(session.viewer_count(), 1);
    }

    #[test]
    fn test_summary_carries_metadata() {
        let session = StreamSession::new(ConnectionId(1), "u1", "Alice");
        let summary = session.summary(&StreamId::from("s1"));

        assert_eq!(summary.stream_id, StreamId::from("s1"));
        assert_eq!(summary.user_id, "u1");
        assert_eq!(summary.user_name, "Alice");
        assert_eq!(summary.viewer_count, 0);
    }
}
