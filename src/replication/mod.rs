//! Replication Module
//!
//! Moves posts and clear commands between replicas: the dispatcher fans a
//! single record out to every peer, the orchestrator runs a full
//! pull/apply/push convergence cycle on demand.

pub mod protocol;
mod dispatcher;
mod sync;

pub use protocol::{Replicated, PushAck, SyncSummary, PeerReport, CallStatus};
pub use dispatcher::{Dispatcher, DispatchReport};
pub use sync::{SyncOrchestrator, SyncMode};

use std::time::Duration;

use crate::config::WolfNoteConfig;

/// Configuration for replication
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Timeout for each pull from a peer
    pub pull_timeout: Duration,
    /// Timeout for each push to a peer
    pub push_timeout: Duration,
    /// Fan new posts out immediately on creation
    pub propagate_on_create: bool,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            pull_timeout: Duration::from_millis(2000),
            push_timeout: Duration::from_millis(500),
            propagate_on_create: true,
        }
    }
}

impl From<&WolfNoteConfig> for ReplicationConfig {
    fn from(config: &WolfNoteConfig) -> Self {
        Self {
            pull_timeout: config.pull_timeout(),
            push_timeout: config.push_timeout(),
            propagate_on_create: config.cluster.propagate_on_create,
        }
    }
}
