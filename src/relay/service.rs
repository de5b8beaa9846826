//! Relay event dispatch
//!
//! One handler per inbound event in [`crate::protocol`]. Handlers never
//! fail: "stream not found" is a targeted error reply
//! or a silent drop, an unauthorized end-stream is deliberately
//! indistinguishable from success, and a vanished recipient is skipped.

use tokio::sync::mpsc::UnboundedSender;

use crate::protocol::{unix_millis, ClientEvent, ConnectionId, ServerEvent, StreamId};
use crate::registry::{RegistryError, SessionRegistry};
use crate::relay::connections::ConnectionTable;

/// The signaling relay
///
/// Owns the session registry and the connection table; all state changes
/// go through the handlers below. Construct once at process start and share
/// via [`Arc`](std::sync::Arc).
pub struct SignalingRelay {
    connections: ConnectionTable,
    registry: SessionRegistry,
}

impl SignalingRelay {
    /// Create a new relay with an empty registry
    pub fn new() -> Self {
        Self {
            connections: ConnectionTable::new(),
            registry: SessionRegistry::new(),
        }
    }

    /// Get a reference to the session registry
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Get a reference to the connection table
    pub fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    /// Register a newly accepted connection
    ///
    /// Queues the `connected` greeting so it is the first event the client
    /// receives.
    pub async fn register_connection(
        &self,
        connection_id: ConnectionId,
        tx: UnboundedSender<ServerEvent>,
    ) {
        self.connections.insert(connection_id, tx).await;
        self.connections
            .send_to(connection_id, ServerEvent::Connected { connection_id })
            .await;

        tracing::debug!(connection_id = connection_id.0, "Connection registered");
    }

    /// Dispatch one inbound event from a connection
    pub async fn handle_event(&self, sender: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::StartStream {
                stream_id,
                user_id,
                user_name,
            } => self.on_start_stream(sender, stream_id, user_id, user_name).await,
            ClientEvent::JoinStream {
                stream_id,
                user_id,
                user_name,
            } => self.on_join_stream(sender, stream_id, user_id, user_name).await,
            ClientEvent::Offer { offer, viewer_id } => {
                self.connections
                    .send_to(
                        viewer_id,
                        ServerEvent::Offer {
                            offer,
                            broadcaster: sender,
                        },
                    )
                    .await;
            }
            ClientEvent::Answer {
                answer,
                broadcaster,
            } => {
                self.connections
                    .send_to(
                        broadcaster,
                        ServerEvent::Answer {
                            answer,
                            viewer: sender,
                        },
                    )
                    .await;
            }
            ClientEvent::IceCandidate {
                candidate,
                target_id,
            } => {
                self.connections
                    .send_to(target_id, ServerEvent::IceCandidate { candidate, sender })
                    .await;
            }
            ClientEvent::StreamMessage {
                stream_id,
                message,
                user_id,
                user_name,
            } => self.on_stream_message(stream_id, message, user_id, user_name).await,
            ClientEvent::StreamLike { stream_id, user_id } => {
                self.on_stream_like(stream_id, user_id).await
            }
            ClientEvent::EndStream { stream_id } => self.on_end_stream(sender, stream_id).await,
            ClientEvent::GetActiveStreams => {
                let streams = self.registry.summaries().await;
                self.connections
                    .send_to(sender, ServerEvent::StreamList { streams })
                    .await;
            }
        }
    }

    /// Clean up after a connection's transport closed
    ///
    /// Removes the connection from the table, terminates any sessions it
    /// was broadcasting, and detaches it from any sessions it was viewing.
    /// The global catalog refresh fires once after the full scan, not once
    /// per terminated session. Idempotent: a duplicate disconnect finds
    /// nothing to clean up.
    pub async fn handle_disconnect(&self, connection_id: ConnectionId) {
        tracing::debug!(connection_id = connection_id.0, "Connection disconnected");

        self.connections.remove(connection_id).await;

        let cleanup = self.registry.remove_connection(connection_id).await;

        for ended in &cleanup.ended {
            self.connections
                .send_each(&ended.members, &ServerEvent::StreamEnded)
                .await;
        }

        for update in &cleanup.viewer_updates {
            self.connections
                .send_each(
                    &update.members,
                    &ServerEvent::ViewerCountUpdated {
                        count: update.viewer_count,
                    },
                )
                .await;
        }

        if !cleanup.ended.is_empty() {
            self.broadcast_stream_list().await;
        }
    }

    async fn on_start_stream(
        &self,
        sender: ConnectionId,
        stream_id: StreamId,
        user_id: String,
        user_name: String,
    ) {
        self.registry
            .register(stream_id.clone(), sender, user_id, user_name)
            .await;

        self.connections
            .send_to(sender, ServerEvent::StreamStarted { stream_id })
            .await;

        self.broadcast_stream_list().await;
    }

    async fn on_join_stream(
        &self,
        sender: ConnectionId,
        stream_id: StreamId,
        user_id: String,
        user_name: String,
    ) {
        let outcome = match self.registry.join(&stream_id, sender).await {
            Ok(outcome) => outcome,
            Err(RegistryError::StreamNotFound(_)) => {
                self.connections
                    .send_to(
                        sender,
                        ServerEvent::StreamError {
                            message: "Stream not found".to_string(),
                        },
                    )
                    .await;
                return;
            }
            Err(err) => {
                tracing::warn!(stream = %stream_id, error = %err, "Join rejected");
                return;
            }
        };

        self.connections
            .send_to(
                outcome.broadcaster,
                ServerEvent::ViewerJoined {
                    viewer_id: sender,
                    user_id,
                    user_name,
                    viewer_count: outcome.viewer_count,
                },
            )
            .await;

        self.connections
            .send_to(
                sender,
                ServerEvent::StreamReady {
                    stream_id,
                    broadcaster: outcome.broadcaster,
                },
            )
            .await;

        self.connections
            .send_each(
                &outcome.members,
                &ServerEvent::ViewerCountUpdated {
                    count: outcome.viewer_count,
                },
            )
            .await;
    }

    async fn on_stream_message(
        &self,
        stream_id: StreamId,
        message: String,
        user_id: String,
        user_name: String,
    ) {
        // Unknown stream: silent drop, per the wire contract
        let Some(members) = self.registry.group_members(&stream_id).await else {
            tracing::debug!(stream = %stream_id, "Chat message for unknown stream dropped");
            return;
        };

        self.connections
            .send_each(
                &members,
                &ServerEvent::StreamMessage {
                    message,
                    user_id,
                    user_name,
                    timestamp: unix_millis(),
                },
            )
            .await;
    }

    async fn on_stream_like(&self, stream_id: StreamId, user_id: String) {
        let Some(members) = self.registry.group_members(&stream_id).await else {
            tracing::debug!(stream = %stream_id, "Like for unknown stream dropped");
            return;
        };

        self.connections
            .send_each(
                &members,
                &ServerEvent::StreamLike {
                    user_id,
                    timestamp: unix_millis(),
                },
            )
            .await;
    }

    async fn on_end_stream(&self, sender: ConnectionId, stream_id: StreamId) {
        // Missing stream and non-broadcaster caller are both silent no-ops;
        // emitting nothing keeps session ownership unobservable.
        let Ok(ended) = self.registry.end(&stream_id, sender).await else {
            return;
        };

        self.connections
            .send_each(&ended.members, &ServerEvent::StreamEnded)
            .await;

        self.broadcast_stream_list().await;
    }

    async fn broadcast_stream_list(&self) {
        let streams = self.registry.summaries().await;
        self.connections
            .broadcast_all(&ServerEvent::StreamListUpdated { streams })
            .await;
    }
}

impl Default for SignalingRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    /// Register a fake connection and return its event queue
    async fn connect(relay: &SignalingRelay, id: u64) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let connection_id = ConnectionId(id);
        let (tx, mut rx) = mpsc::unbounded_channel();
        relay.register_connection(connection_id, tx).await;

        // Consume the greeting so tests assert on operation traffic only
        assert_eq!(rx.try_recv(), Ok(ServerEvent::Connected { connection_id }));

        (connection_id, rx)
    }

    /// Drain everything currently queued for a connection
    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn start_stream(stream_id: &str, user_id: &str, user_name: &str) -> ClientEvent {
        ClientEvent::StartStream {
            stream_id: StreamId::from(stream_id),
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }

    fn join_stream(stream_id: &str, user_id: &str, user_name: &str) -> ClientEvent {
        ClientEvent::JoinStream {
            stream_id: StreamId::from(stream_id),
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }

    #[tokio::test]
    async fn test_start_stream_lifecycle() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;

        relay.handle_event(c1, start_stream("s1", "u1", "Alice")).await;

        let events = drain(&mut rx1);
        assert_eq!(
            events[0],
            ServerEvent::StreamStarted {
                stream_id: StreamId::from("s1")
            }
        );
        match &events[1] {
            ServerEvent::StreamListUpdated { streams } => {
                assert_eq!(streams.len(), 1);
                assert_eq!(streams[0].stream_id, StreamId::from("s1"));
                assert_eq!(streams[0].viewer_count, 0);
            }
            other => panic!("expected stream-list-updated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_join_notifies_everyone() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;
        let (c2, mut rx2) = connect(&relay, 2).await;

        relay.handle_event(c1, start_stream("s1", "u1", "Alice")).await;
        drain(&mut rx1);
        drain(&mut rx2);

        relay.handle_event(c2, join_stream("s1", "u2", "Bob")).await;

        // Broadcaster hears about the viewer, then the count update
        let broadcaster_events = drain(&mut rx1);
        assert_eq!(
            broadcaster_events[0],
            ServerEvent::ViewerJoined {
                viewer_id: c2,
                user_id: "u2".into(),
                user_name: "Bob".into(),
                viewer_count: 1,
            }
        );
        assert!(broadcaster_events.contains(&ServerEvent::ViewerCountUpdated { count: 1 }));

        // Viewer gets the ready signal pointing at the broadcaster
        let viewer_events = drain(&mut rx2);
        assert_eq!(
            viewer_events[0],
            ServerEvent::StreamReady {
                stream_id: StreamId::from("s1"),
                broadcaster: c1,
            }
        );
        assert!(viewer_events.contains(&ServerEvent::ViewerCountUpdated { count: 1 }));
    }

    #[tokio::test]
    async fn test_join_missing_stream_errors_requester_only() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;
        let (c3, mut rx3) = connect(&relay, 3).await;

        relay.handle_event(c3, join_stream("nonexistent", "u3", "Carl")).await;

        assert_eq!(
            drain(&mut rx3),
            vec![ServerEvent::StreamError {
                message: "Stream not found".into()
            }]
        );
        assert!(drain(&mut rx1).is_empty());
        assert_eq!(relay.registry().session_count().await, 0);
        let _ = c1;
    }

    #[tokio::test]
    async fn test_unauthorized_end_is_a_silent_noop() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;
        let (c2, mut rx2) = connect(&relay, 2).await;

        relay.handle_event(c1, start_stream("s1", "u1", "Alice")).await;
        relay.handle_event(c2, join_stream("s1", "u2", "Bob")).await;
        drain(&mut rx1);
        drain(&mut rx2);

        relay
            .handle_event(
                c2,
                ClientEvent::EndStream {
                    stream_id: StreamId::from("s1"),
                },
            )
            .await;

        // Nothing emitted at all, session still live
        assert!(drain(&mut rx1).is_empty());
        assert!(drain(&mut rx2).is_empty());
        assert!(relay.registry().contains(&StreamId::from("s1")).await);
    }

    #[tokio::test]
    async fn test_broadcaster_disconnect_terminates_stream() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;
        let (c2, mut rx2) = connect(&relay, 2).await;

        relay.handle_event(c1, start_stream("s1", "u1", "Alice")).await;
        relay.handle_event(c2, join_stream("s1", "u2", "Bob")).await;
        drain(&mut rx1);
        drain(&mut rx2);

        relay.handle_disconnect(c1).await;

        assert!(!relay.registry().contains(&StreamId::from("s1")).await);

        let viewer_events = drain(&mut rx2);
        assert!(viewer_events.contains(&ServerEvent::StreamEnded));
        match viewer_events.last() {
            Some(ServerEvent::StreamListUpdated { streams }) => assert!(streams.is_empty()),
            other => panic!("expected trailing stream-list-updated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejoin_keeps_count_at_one() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;
        let (c2, mut rx2) = connect(&relay, 2).await;

        relay.handle_event(c1, start_stream("s1", "u1", "Alice")).await;
        relay.handle_event(c2, join_stream("s1", "u2", "Bob")).await;
        drain(&mut rx1);
        drain(&mut rx2);

        relay.handle_event(c2, join_stream("s1", "u2", "Bob")).await;

        let events = drain(&mut rx2);
        assert!(events.contains(&ServerEvent::ViewerCountUpdated { count: 1 }));
        assert!(!events.contains(&ServerEvent::ViewerCountUpdated { count: 2 }));
    }

    #[tokio::test]
    async fn test_chat_is_scoped_to_the_session_group() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;
        let (c2, mut rx2) = connect(&relay, 2).await;
        let (c4, mut rx4) = connect(&relay, 4).await;

        relay.handle_event(c1, start_stream("s1", "u1", "Alice")).await;
        relay.handle_event(c2, join_stream("s1", "u2", "Bob")).await;
        drain(&mut rx1);
        drain(&mut rx2);
        drain(&mut rx4);

        relay
            .handle_event(
                c2,
                ClientEvent::StreamMessage {
                    stream_id: StreamId::from("s1"),
                    message: "hi".into(),
                    user_id: "u2".into(),
                    user_name: "Bob".into(),
                },
            )
            .await;

        for rx in [&mut rx1, &mut rx2] {
            match drain(rx).as_slice() {
                [ServerEvent::StreamMessage {
                    message,
                    user_id,
                    user_name,
                    ..
                }] => {
                    assert_eq!(message, "hi");
                    assert_eq!(user_id, "u2");
                    assert_eq!(user_name, "Bob");
                }
                other => panic!("expected one stream-message, got {:?}", other),
            }
        }

        // c4 never joined and hears nothing
        assert!(drain(&mut rx4).is_empty());
        let _ = c4;
    }

    #[tokio::test]
    async fn test_chat_for_unknown_stream_is_dropped() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;

        relay
            .handle_event(
                c1,
                ClientEvent::StreamMessage {
                    stream_id: StreamId::from("nope"),
                    message: "hi".into(),
                    user_id: "u1".into(),
                    user_name: "Alice".into(),
                },
            )
            .await;

        assert!(drain(&mut rx1).is_empty());
    }

    #[tokio::test]
    async fn test_like_fans_out_with_timestamp() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;
        let (c2, mut rx2) = connect(&relay, 2).await;

        relay.handle_event(c1, start_stream("s1", "u1", "Alice")).await;
        relay.handle_event(c2, join_stream("s1", "u2", "Bob")).await;
        drain(&mut rx1);
        drain(&mut rx2);

        relay
            .handle_event(
                c2,
                ClientEvent::StreamLike {
                    stream_id: StreamId::from("s1"),
                    user_id: "u2".into(),
                },
            )
            .await;

        for rx in [&mut rx1, &mut rx2] {
            match drain(rx).as_slice() {
                [ServerEvent::StreamLike { user_id, timestamp }] => {
                    assert_eq!(user_id, "u2");
                    assert!(*timestamp > 0);
                }
                other => panic!("expected one stream-like, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_offer_is_forwarded_untouched() {
        let relay = SignalingRelay::new();
        let (c1, _rx1) = connect(&relay, 1).await;
        let (c2, mut rx2) = connect(&relay, 2).await;

        let payload = json!({"type": "offer", "sdp": "v=0\r\no=- 0 0 IN IP4 0.0.0.0"});

        relay
            .handle_event(
                c1,
                ClientEvent::Offer {
                    offer: payload.clone(),
                    viewer_id: c2,
                },
            )
            .await;

        assert_eq!(
            drain(&mut rx2),
            vec![ServerEvent::Offer {
                offer: payload,
                broadcaster: c1,
            }]
        );
    }

    #[tokio::test]
    async fn test_answer_and_ice_forwarding() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;
        let (c2, mut rx2) = connect(&relay, 2).await;

        let answer = json!({"type": "answer", "sdp": "v=0"});
        relay
            .handle_event(
                c2,
                ClientEvent::Answer {
                    answer: answer.clone(),
                    broadcaster: c1,
                },
            )
            .await;
        assert_eq!(
            drain(&mut rx1),
            vec![ServerEvent::Answer { answer, viewer: c2 }]
        );

        let candidate = json!({"candidate": "candidate:0 1 UDP 1 198.51.100.4 9 typ host"});
        relay
            .handle_event(
                c1,
                ClientEvent::IceCandidate {
                    candidate: candidate.clone(),
                    target_id: c2,
                },
            )
            .await;
        assert_eq!(
            drain(&mut rx2),
            vec![ServerEvent::IceCandidate { candidate, sender: c1 }]
        );
    }

    #[tokio::test]
    async fn test_forward_to_gone_connection_is_silent() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;
        let (c2, rx2) = connect(&relay, 2).await;

        relay.handle_disconnect(c2).await;
        drop(rx2);

        relay
            .handle_event(
                c1,
                ClientEvent::Offer {
                    offer: json!({}),
                    viewer_id: c2,
                },
            )
            .await;

        // No error surfaced to the sender
        assert!(drain(&mut rx1).is_empty());
    }

    #[tokio::test]
    async fn test_get_active_streams_is_a_direct_reply() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;
        let (c2, mut rx2) = connect(&relay, 2).await;

        relay.handle_event(c1, start_stream("s1", "u1", "Alice")).await;
        drain(&mut rx1);
        drain(&mut rx2);

        relay.handle_event(c2, ClientEvent::GetActiveStreams).await;

        match drain(&mut rx2).as_slice() {
            [ServerEvent::StreamList { streams }] => {
                assert_eq!(streams.len(), 1);
                assert_eq!(streams[0].user_name, "Alice");
            }
            other => panic!("expected one stream-list, got {:?}", other),
        }
        assert!(drain(&mut rx1).is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_of_viewer_updates_count() {
        let relay = SignalingRelay::new();
        let (c1, mut rx1) = connect(&relay, 1).await;
        let (c2, mut rx2) = connect(&relay, 2).await;

        relay.handle_event(c1, start_stream("s1", "u1", "Alice")).await;
        relay.handle_event(c2, join_stream("s1", "u2", "Bob")).await;
        drain(&mut rx1);
        drain(&mut rx2);

        relay.handle_disconnect(c2).await;

        let events = drain(&mut rx1);
        assert_eq!(events, vec![ServerEvent::ViewerCountUpdated { count: 0 }]);
        assert!(relay.registry().contains(&StreamId::from("s1")).await);
    }

    #[tokio::test]
    async fn test_disconnect_refreshes_catalog_once() {
        let relay = SignalingRelay::new();
        let (c1, _rx1) = connect(&relay, 1).await;
        let (_c4, mut rx4) = connect(&relay, 4).await;

        // One connection broadcasting two streams at once is allowed
        relay.handle_event(c1, start_stream("s1", "u1", "Alice")).await;
        relay.handle_event(c1, start_stream("s2", "u1", "Alice")).await;
        drain(&mut rx4);

        relay.handle_disconnect(c1).await;

        let refreshes = drain(&mut rx4)
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::StreamListUpdated { .. }))
            .count();
        assert_eq!(refreshes, 1);
    }
}
