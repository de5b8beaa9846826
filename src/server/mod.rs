//! WebSocket server front end
//!
//! The accept loop and per-connection plumbing that feed the relay.

pub mod config;
pub mod listener;

pub use config::ServerConfig;
pub use listener::SignalingServer;
