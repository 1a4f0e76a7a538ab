//! Replica Store
//!
//! Owns a replica's post log and clear-command log. Both sit behind a
//! single lock so that a prune can never interleave with a merge: a post
//! covered by an applied clear command is either pruned or refused, never
//! left behind.

mod record;
mod posts;
mod clears;

pub use record::{Post, ClearCommand, StoredPost};
pub use posts::{PostLog, MergeOutcome};
pub use clears::ClearLog;

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::id::{Clock, ReplicaClock, RecordId, Timestamp};

/// Result of applying a clear command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Command was new; `pruned` posts were removed
    Applied { pruned: usize },
    /// Command id already known, nothing changed
    Duplicate,
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }
}

struct Logs {
    posts: PostLog,
    clears: ClearLog,
}

impl Logs {
    fn apply(&mut self, command: ClearCommand) -> ApplyOutcome {
        if self.clears.contains(&command.id) {
            return ApplyOutcome::Duplicate;
        }
        let pruned = self.posts.prune(&command);
        self.clears.record(command);
        ApplyOutcome::Applied { pruned }
    }
}

/// Shared, lock-guarded state of one replica
pub struct ReplicaStore {
    replica: String,
    clock: ReplicaClock,
    logs: RwLock<Logs>,
}

impl ReplicaStore {
    /// Create an empty store for `replica`
    pub fn new(replica: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        let replica = replica.into();
        Self {
            logs: RwLock::new(Logs {
                posts: PostLog::new(replica.clone()),
                clears: ClearLog::new(replica.clone()),
            }),
            clock: ReplicaClock::new(clock),
            replica,
        }
    }

    /// This replica's identity
    pub fn replica(&self) -> &str {
        &self.replica
    }

    /// Current wall-clock reading
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Reserve an instant from the replica clock
    ///
    /// Anything stamped afterwards, local posts and pushed arrivals alike,
    /// is stamped strictly later.
    pub fn stamp(&self) -> Timestamp {
        self.clock.stamp()
    }

    /// Create and append a local post
    pub async fn append(&self, author: &str, content: &str, session_id: &str) -> Post {
        let mut logs = self.logs.write().await;
        // Stamp under the lock so log order matches timestamp order
        let timestamp = self.clock.stamp();
        let post = logs.posts.append(author, content, session_id, timestamp);
        tracing::debug!("Appended post {} at {}", post.id, post.timestamp);
        post
    }

    /// Merge a remote post that arrived now
    pub async fn merge(&self, post: Post) -> MergeOutcome {
        let received_at = self.clock.stamp();
        self.merge_at(post, received_at).await
    }

    /// Merge a remote post, recording `received_at` as its arrival instant
    pub async fn merge_at(&self, post: Post, received_at: Timestamp) -> MergeOutcome {
        let mut logs = self.logs.write().await;

        if logs.clears.covers(&post) {
            tracing::debug!("Refusing post {} at {}: already cleared", post.id, post.timestamp);
            return MergeOutcome::Tombstoned;
        }

        let id = post.id;
        let outcome = logs.posts.merge(post, received_at);
        if outcome.is_inserted() {
            tracing::debug!("Merged post {}", id);
        }
        outcome
    }

    /// Issue a local clear command and apply it
    pub async fn issue_clear(&self) -> ClearCommand {
        let mut logs = self.logs.write().await;
        let command = logs.clears.create(self.clock.stamp());
        if let ApplyOutcome::Applied { pruned } = logs.apply(command.clone()) {
            tracing::info!("Issued clear {} through {}, pruned {} posts", command.id, command.timestamp, pruned);
        }
        command
    }

    /// Apply a clear command; a known id is a no-op
    ///
    /// Local posts created afterwards are stamped past the command, so no
    /// peer that knows it can ever refuse them.
    pub async fn apply_clear(&self, command: ClearCommand) -> ApplyOutcome {
        let mut logs = self.logs.write().await;
        let id = command.id;
        let through = command.timestamp;
        let outcome = logs.apply(command);
        if let ApplyOutcome::Applied { pruned } = outcome {
            self.clock.witness(through);
            tracing::debug!("Applied clear {} through {}, pruned {} posts", id, through, pruned);
        }
        outcome
    }

    /// Apply a clear command pushed by a peer
    pub async fn receive_clear(&self, command: ClearCommand) -> ApplyOutcome {
        self.apply_clear(command).await
    }

    pub async fn contains_post(&self, id: &RecordId) -> bool {
        self.logs.read().await.posts.contains(id)
    }

    pub async fn contains_clear(&self, id: &RecordId) -> bool {
        self.logs.read().await.clears.contains(id)
    }

    /// Posts created by this replica
    pub async fn all_local(&self) -> Vec<Post> {
        self.logs.read().await.posts.all_local()
    }

    /// Posts with `timestamp > since`
    pub async fn since(&self, since: Timestamp) -> Vec<Post> {
        self.logs.read().await.posts.since(since)
    }

    /// Every known clear command
    pub async fn clear_commands(&self) -> Vec<ClearCommand> {
        self.logs.read().await.clears.all()
    }

    /// Posts a session with the given watermark may see, oldest first
    pub async fn visible_to(&self, watermark: Option<Timestamp>) -> Vec<Post> {
        let logs = self.logs.read().await;
        let mut posts: Vec<Post> = logs
            .posts
            .iter()
            .filter(|stored| stored.visible_to(&self.replica, watermark))
            .map(|stored| stored.post.clone())
            .collect();
        drop(logs);

        posts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        posts
    }

    /// Point-in-time counters
    pub async fn stats(&self) -> StoreStats {
        let logs = self.logs.read().await;
        StoreStats {
            total_posts: logs.posts.len(),
            local_posts: logs.posts.iter().filter(|s| s.post.is_from(&self.replica)).count(),
            clear_commands: logs.clears.len(),
            merged_total: logs.posts.merged_count(),
            clear_horizon: logs.clears.horizon(),
        }
    }
}

/// Counters describing a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoreStats {
    pub total_posts: usize,
    pub local_posts: usize,
    pub clear_commands: usize,
    pub merged_total: u64,
    pub clear_horizon: Option<Timestamp>,
}
