//! # signaling-rs
//!
//! WebRTC live-stream signaling relay server library.
//!
//! The relay tracks ephemeral broadcaster/viewer sessions and routes
//! offer/answer/ICE-candidate exchange between the parties over persistent
//! WebSocket connections. It carries signaling only — never media — and
//! holds no state outside process memory.
//!
//! # Architecture
//!
//! ```text
//!    [Broadcaster ws]──┐                      ┌──[Viewer ws]
//!                      ▼                      ▼
//!               SignalingServer (accept + per-connection tasks)
//!                      │                      │
//!                      └──────► SignalingRelay ◄──────
//!                               │  ConnectionTable   (outbound queues)
//!                               │  SessionRegistry   (streamId → session)
//!                               ▼
//!                 targeted sends · group fan-out · catalog broadcasts
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use signaling_rs::{ServerConfig, SignalingServer};
//!
//! #[tokio::main]
//! async fn main() -> signaling_rs::Result<()> {
//!     let config = ServerConfig::with_addr("0.0.0.0:8080".parse().unwrap());
//!     let server = SignalingServer::new(config);
//!     server.run().await
//! }
//! ```
//!
//! The relay itself ([`SignalingRelay`]) is usable without the bundled
//! server: register connections with any `mpsc` sender and feed it
//! [`ClientEvent`]s, which is also how the test suite drives it.

pub mod error;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;

pub use error::{Error, Result};
pub use protocol::{ClientEvent, ConnectionId, ServerEvent, StreamId, StreamSummary};
pub use registry::SessionRegistry;
pub use relay::SignalingRelay;
pub use server::{ServerConfig, SignalingServer};
