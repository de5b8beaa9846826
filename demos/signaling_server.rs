//! Simple signaling server example
//!
//! Run with: cargo run --example signaling_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example signaling_server                  # binds to 0.0.0.0:8080
//!   cargo run --example signaling_server 127.0.0.1:9000   # binds to 127.0.0.1:9000
//!
//! Connect with any WebSocket client and exchange JSON frames:
//!
//!   {"event":"start-stream","data":{"streamId":"s1","userId":"u1","userName":"Alice"}}
//!   {"event":"join-stream","data":{"streamId":"s1","userId":"u2","userName":"Bob"}}
//!   {"event":"get-active-streams"}
//!
//! The server replies with `connected`, `stream-started`, `stream-ready`,
//! `stream-list-updated`, and the rest of the wire contract. Offer/answer/ICE
//! payloads are forwarded verbatim between broadcaster and viewers.

use std::net::SocketAddr;

use signaling_rs::{ServerConfig, SignalingServer};

#[tokio::main]
async fn main() -> signaling_rs::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signaling_rs=debug,signaling_server=info".into()),
        )
        .init();

    let bind_addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:8080".to_string())
        .parse()
        .expect("invalid bind address");

    let config = ServerConfig::with_addr(bind_addr).max_connections(1024);
    let server = SignalingServer::new(config);

    println!("Signaling server listening on ws://{}", server.bind_addr());
    println!("Press Ctrl-C to stop");

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
