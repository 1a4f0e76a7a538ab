//! Replica Node
//!
//! Ties one replica's store, session tracker, peer registry and replication
//! machinery together. Every client and peer request goes through here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::WolfNoteConfig;
use crate::error::{Error, Result};
use crate::id::{Clock, SystemClock, Timestamp};
use crate::network::{HttpPeerClient, PeerTransport};
use crate::replication::{
    Dispatcher, PushAck, ReplicationConfig, Replicated, SyncMode, SyncOrchestrator, SyncSummary,
};
use crate::state::{PeerRegistry, SessionTracker};
use crate::store::{ClearCommand, Post, ReplicaStore};

/// Snapshot of a replica as seen by one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub replica: String,
    pub session_id: String,
    pub watermark: Option<Timestamp>,
    pub total_posts: usize,
    pub local_posts: usize,
    pub clear_commands: usize,
    pub clear_horizon: Option<Timestamp>,
    pub merged_total: u64,
    pub sessions: usize,
    pub peers: Vec<String>,
}

/// A single replica
pub struct ReplicaNode {
    store: Arc<ReplicaStore>,
    sessions: Arc<SessionTracker>,
    registry: Arc<PeerRegistry>,
    dispatcher: Dispatcher,
    orchestrator: SyncOrchestrator,
    config: ReplicationConfig,
}

impl ReplicaNode {
    /// Build a replica named after `registry.replica()`
    pub fn new(
        registry: PeerRegistry,
        transport: Arc<dyn PeerTransport>,
        clock: Arc<dyn Clock>,
        config: ReplicationConfig,
    ) -> Self {
        let registry = Arc::new(registry);
        let store = Arc::new(ReplicaStore::new(registry.replica(), clock));
        let sessions = Arc::new(SessionTracker::new());
        let dispatcher = Dispatcher::new(registry.clone(), transport.clone(), config.push_timeout);
        let orchestrator = SyncOrchestrator::new(
            store.clone(),
            sessions.clone(),
            registry.clone(),
            transport,
            dispatcher.clone(),
            config.clone(),
        );

        Self {
            store,
            sessions,
            registry,
            dispatcher,
            orchestrator,
            config,
        }
    }

    /// Build a replica that talks to its peers over HTTP
    pub fn from_config(config: &WolfNoteConfig) -> Result<Self> {
        let registry = PeerRegistry::from_table(&config.node.name, &config.cluster.peers);
        let transport = HttpPeerClient::new(config.pull_timeout(), config.push_timeout())?;

        tracing::info!(
            "Replica {} with {} peers: {:?}",
            registry.replica(),
            registry.len(),
            registry.names()
        );

        Ok(Self::new(
            registry,
            Arc::new(transport),
            Arc::new(SystemClock),
            ReplicationConfig::from(config),
        ))
    }

    pub fn replica(&self) -> &str {
        self.store.replica()
    }

    pub fn store(&self) -> &Arc<ReplicaStore> {
        &self.store
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    // ============ Client operations ============

    /// Create a post on behalf of `session_id`
    pub async fn create_post(&self, session_id: &str, author: &str, content: &str) -> Result<Post> {
        if author.trim().is_empty() {
            return Err(Error::Validation("author must not be empty".into()));
        }
        if content.trim().is_empty() {
            return Err(Error::Validation("content must not be empty".into()));
        }

        self.sessions.observe(session_id).await;
        let post = self.store.append(author, content, session_id).await;
        tracing::info!("Post {} created by {} (session {})", post.id, post.author, session_id);

        if self.config.propagate_on_create && !self.registry.is_empty() {
            self.dispatcher.spawn_propagate(Replicated::Post(post.clone()));
        }
        Ok(post)
    }

    /// Posts this session may currently see
    pub async fn visible_posts(&self, session_id: &str) -> Vec<Post> {
        self.sessions.observe(session_id).await;
        let watermark = self.sessions.watermark(session_id).await;
        self.store.visible_to(watermark).await
    }

    /// List posts, optionally pulling from peers first
    pub async fn list_posts(&self, session_id: &str, sync: bool) -> Vec<Post> {
        if sync {
            self.orchestrator.run(session_id, SyncMode::PullOnly).await;
        }
        self.visible_posts(session_id).await
    }

    /// Full pull-and-push sync
    pub async fn sync(&self, session_id: &str) -> SyncSummary {
        self.sessions.observe(session_id).await;
        self.orchestrator.run(session_id, SyncMode::Full).await
    }

    /// Clear every post up to now, on this replica only
    ///
    /// Peers learn of the command the next time anyone syncs.
    pub async fn issue_clear(&self) -> ClearCommand {
        self.store.issue_clear().await
    }

    pub async fn debug_info(&self, session_id: &str) -> DebugInfo {
        self.sessions.observe(session_id).await;
        let stats = self.store.stats().await;

        DebugInfo {
            replica: self.replica().to_string(),
            session_id: session_id.to_string(),
            watermark: self.sessions.watermark(session_id).await,
            total_posts: stats.total_posts,
            local_posts: stats.local_posts,
            clear_commands: stats.clear_commands,
            clear_horizon: stats.clear_horizon,
            merged_total: stats.merged_total,
            sessions: self.sessions.session_count().await,
            peers: self.registry.names(),
        }
    }

    // ============ Peer operations ============

    /// Posts with `timestamp > since`, for a pulling peer
    pub async fn posts_since(&self, since: Timestamp) -> Vec<Post> {
        self.store.since(since).await
    }

    /// Full clear-command log, for a pulling peer
    pub async fn clear_commands(&self) -> Vec<ClearCommand> {
        self.store.clear_commands().await
    }

    /// Accept a post pushed by a peer
    pub async fn receive_post(&self, post: Post) -> PushAck {
        let id = post.id;
        let applied = self.store.merge(post).await.is_inserted();
        PushAck { id, applied }
    }

    /// Accept a clear command pushed by a peer
    pub async fn receive_clear(&self, command: ClearCommand) -> PushAck {
        let id = command.id;
        let applied = self.store.receive_clear(command).await.is_applied();
        PushAck { id, applied }
    }
}
