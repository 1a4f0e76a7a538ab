//! WolfNote - Multi-replica note sharing
//!
//! Every replica accepts posts independently and converges with its peers
//! only when a client asks it to sync. Consistency is weak and
//! session-scoped: a client sees its own replica's posts immediately, and
//! remote posts only once its session has synced past them.
//!
//! # Architecture
//!
//! - [`store`]: the post log and clear-command log behind one lock
//! - [`state`]: per-session sync watermarks and the static peer registry
//! - [`network`]: bounded calls to peers over HTTP
//! - [`replication`]: propagation on create and the on-demand sync cycle
//! - [`node`]: one replica's operations, shared by every handler
//! - [`api`]: client routes and the internal replication routes
//!
//! # Features
//!
//! - Idempotent, order-insensitive merges keyed by UUID
//! - Clear commands that prune and tombstone everything up to an instant
//! - Best-effort fan-out with per-peer timeouts, no quorum
//! - Per-peer outcome reports for every sync

pub mod config;
pub mod error;
pub mod id;
pub mod store;
pub mod state;
pub mod network;
pub mod replication;
pub mod node;
pub mod api;

pub use config::WolfNoteConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::WolfNoteConfig;
    pub use crate::error::{Error, Result};
    pub use crate::id::{Clock, ManualClock, RecordId, SystemClock, Timestamp};
    pub use crate::store::{ClearCommand, Post, ReplicaStore};
    pub use crate::state::{Peer, PeerRegistry, SessionTracker};
    pub use crate::network::{PeerOutcome, PeerTransport};
    pub use crate::replication::{ReplicationConfig, SyncMode, SyncSummary};
    pub use crate::node::ReplicaNode;
}
