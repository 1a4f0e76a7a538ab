//! Post Log
//!
//! Grow-only set of posts keyed by id. The only removal path is pruning
//! driven by a clear command.

use std::collections::HashSet;

use super::record::{ClearCommand, Post, StoredPost};
use crate::id::{RecordId, Timestamp};

/// Result of merging a remote post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Post was new and has been inserted
    Inserted,
    /// A post with the same id is already present
    Duplicate,
    /// Post lies at or below an applied clear command
    Tombstoned,
}

impl MergeOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, MergeOutcome::Inserted)
    }
}

/// Append-only post collection for one replica
#[derive(Debug)]
pub struct PostLog {
    /// This replica's identity
    replica: String,
    /// Posts in arrival order
    entries: Vec<StoredPost>,
    /// Ids currently present
    ids: HashSet<RecordId>,
    /// Number of remote posts inserted by merge
    merged: u64,
}

impl PostLog {
    /// Create an empty log for `replica`
    pub fn new(replica: impl Into<String>) -> Self {
        Self {
            replica: replica.into(),
            entries: Vec::new(),
            ids: HashSet::new(),
            merged: 0,
        }
    }

    /// Create a local post stamped at `timestamp` and append it
    pub fn append(
        &mut self,
        author: impl Into<String>,
        content: impl Into<String>,
        session_id: impl Into<String>,
        timestamp: Timestamp,
    ) -> Post {
        let post = Post {
            id: RecordId::new(),
            author: author.into(),
            content: content.into(),
            timestamp,
            origin_replica: self.replica.clone(),
            session_id: session_id.into(),
        };

        self.ids.insert(post.id);
        self.entries.push(StoredPost {
            post: post.clone(),
            received_at: timestamp,
        });
        post
    }

    /// Insert a remote post unless its id is already known (first writer wins)
    pub fn merge(&mut self, post: Post, received_at: Timestamp) -> MergeOutcome {
        if !self.ids.insert(post.id) {
            return MergeOutcome::Duplicate;
        }

        self.entries.push(StoredPost { post, received_at });
        self.merged += 1;
        MergeOutcome::Inserted
    }

    /// Remove every post `command` covers, returning how many went
    pub fn prune(&mut self, command: &ClearCommand) -> usize {
        let before = self.entries.len();
        let ids = &mut self.ids;
        self.entries.retain(|stored| {
            if command.covers(&stored.post) {
                ids.remove(&stored.post.id);
                false
            } else {
                true
            }
        });
        before - self.entries.len()
    }

    /// Check if a post id is present
    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    /// Posts created by this replica
    pub fn all_local(&self) -> Vec<Post> {
        self.entries
            .iter()
            .filter(|stored| stored.post.is_from(&self.replica))
            .map(|stored| stored.post.clone())
            .collect()
    }

    /// Posts with `timestamp > since`, serving incremental pulls
    pub fn since(&self, since: Timestamp) -> Vec<Post> {
        self.entries
            .iter()
            .filter(|stored| stored.post.timestamp > since)
            .map(|stored| stored.post.clone())
            .collect()
    }

    /// Iterate over every stored post
    pub fn iter(&self) -> impl Iterator<Item = &StoredPost> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total remote posts inserted by merge
    pub fn merged_count(&self) -> u64 {
        self.merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(timestamp: Timestamp) -> Post {
        Post {
            id: RecordId::new(),
            author: "bob".into(),
            content: "from afar".into(),
            timestamp,
            origin_replica: "replica-2".into(),
            session_id: "s-remote".into(),
        }
    }

    #[test]
    fn test_append_tags_local_replica() {
        let mut log = PostLog::new("replica-1");
        let post = log.append("alice", "hi", "s-1", 100);

        assert_eq!(post.origin_replica, "replica-1");
        assert_eq!(post.timestamp, 100);
        assert!(log.contains(&post.id));
        assert_eq!(log.all_local(), vec![post]);
        assert_eq!(log.merged_count(), 0);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut log = PostLog::new("replica-1");
        let post = remote(100);

        assert_eq!(log.merge(post.clone(), 150), MergeOutcome::Inserted);
        assert_eq!(log.merge(post.clone(), 160), MergeOutcome::Duplicate);
        assert_eq!(log.len(), 1);
        assert_eq!(log.merged_count(), 1);

        // First arrival wins; its stamp is kept
        assert_eq!(log.iter().next().unwrap().received_at, 150);
    }

    #[test]
    fn test_since_is_strict() {
        let mut log = PostLog::new("replica-1");
        log.append("alice", "a", "s-1", 100);
        log.append("alice", "b", "s-1", 200);
        log.merge(remote(300), 300);

        let ts: Vec<_> = log.since(100).iter().map(|p| p.timestamp).collect();
        assert_eq!(ts, vec![200, 300]);
        assert!(log.since(300).is_empty());
        assert_eq!(log.since(0).len(), 3);
    }

    #[test]
    fn test_all_local_excludes_remote() {
        let mut log = PostLog::new("replica-1");
        log.append("alice", "mine", "s-1", 100);
        log.merge(remote(50), 120);

        let local = log.all_local();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].content, "mine");
    }

    #[test]
    fn test_prune_removes_regardless_of_origin() {
        let mut log = PostLog::new("replica-1");
        let old_local = log.append("alice", "old", "s-1", 100);
        let new_local = log.append("alice", "new", "s-1", 300);
        let old_remote = remote(200);
        log.merge(old_remote.clone(), 250);

        let clear = ClearCommand {
            id: RecordId::new(),
            timestamp: 200,
            origin_replica: "replica-3".into(),
        };
        assert_eq!(log.prune(&clear), 2);
        assert!(!log.contains(&old_local.id));
        assert!(!log.contains(&old_remote.id));
        assert!(log.contains(&new_local.id));
        assert_eq!(log.prune(&clear), 0);
    }
}
