//! Session registry for live-stream signaling
//!
//! The registry owns every active [`StreamSession`] and is the only place
//! session state is mutated. It knows nothing about sockets or JSON — it
//! reports who should receive what, and the relay layer does the sending.
//!
//! # Architecture
//!
//! ```text
//!                        SessionRegistry
//!                  ┌──────────────────────────┐
//!                  │ sessions: HashMap<       │
//!                  │   StreamId,              │
//!                  │   StreamSession {        │
//!                  │     broadcaster,         │
//!                  │     viewers: HashSet,    │
//!                  │     started_at,          │
//!                  │   }                      │
//!                  │ >                        │
//!                  └────────────┬─────────────┘
//!                               │
//!            ┌──────────────────┼──────────────────┐
//!            ▼                  ▼                  ▼
//!       [Broadcaster]       [Viewer]           [Viewer]
//!       start/end           join/leave         join/leave
//! ```
//!
//! Each mutating operation takes the write lock once, so operations on the
//! same stream serialize and every registry change is atomic with respect
//! to the others.

pub mod error;
pub mod session;
pub mod store;

pub use error::RegistryError;
pub use session::StreamSession;
pub use store::{DisconnectCleanup, EndedSession, JoinOutcome, SessionRegistry, ViewerUpdate};
