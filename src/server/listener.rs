//! Signaling server listener
//!
//! Handles the TCP accept loop, upgrades sockets to WebSocket, and wires
//! each connection to the shared [`SignalingRelay`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::protocol::{Message, WebSocketConfig};

use crate::error::Result;
use crate::protocol::{ClientEvent, ConnectionId};
use crate::relay::SignalingRelay;
use crate::server::config::ServerConfig;

/// WebSocket signaling server
pub struct SignalingServer {
    config: ServerConfig,
    relay: Arc<SignalingRelay>,
    next_connection_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl SignalingServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            relay: Arc::new(SignalingRelay::new()),
            next_connection_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the shared relay
    pub fn relay(&self) -> &Arc<SignalingRelay> {
        &self.relay
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Signaling server listening");

        self.accept_loop(&listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Signaling server listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit; the permit rides along with the task
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let connection_id = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(
            connection_id = connection_id.0,
            peer = %peer_addr,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let relay = Arc::clone(&self.relay);
        let max_message_size = self.config.max_message_size;

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = run_connection(relay, connection_id, socket, max_message_size).await {
                tracing::debug!(
                    connection_id = connection_id.0,
                    error = %e,
                    "Connection error"
                );
            }

            tracing::debug!(connection_id = connection_id.0, "Connection closed");
        });
    }
}

/// Drive one client connection until its socket closes
///
/// Upgrades to WebSocket, registers with the relay, pumps outbound events
/// from the relay's queue into the sink, and feeds inbound frames to the
/// relay. The disconnect cleanup runs exactly once, on any exit path after
/// registration.
async fn run_connection(
    relay: Arc<SignalingRelay>,
    connection_id: ConnectionId,
    socket: TcpStream,
    max_message_size: usize,
) -> Result<()> {
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(max_message_size);

    let ws = tokio_tungstenite::accept_async_with_config(socket, Some(ws_config)).await?;
    let (mut sink, mut stream) = ws.split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    relay.register_connection(connection_id, tx).await;

    // Writer task: drains the outbound queue so relay sends never block
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode outbound event");
                    continue;
                }
            };

            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => relay.handle_event(connection_id, event).await,
                Err(e) => {
                    tracing::debug!(
                        connection_id = connection_id.0,
                        error = %e,
                        "Malformed frame dropped"
                    );
                }
            },
            Ok(Message::Close(_)) => break,
            // Binary, ping, and pong frames are not part of the protocol
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(
                    connection_id = connection_id.0,
                    error = %e,
                    "WebSocket read error"
                );
                break;
            }
        }
    }

    relay.handle_disconnect(connection_id).await;
    writer.abort();

    Ok(())
}
