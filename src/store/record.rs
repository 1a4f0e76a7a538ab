//! Replicated Records
//!
//! Posts and clear commands are immutable once created. Both are
//! replicated verbatim between nodes as JSON.

use serde::{Deserialize, Serialize};

use crate::id::{RecordId, Timestamp};

/// An immutable note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: RecordId,
    pub author: String,
    pub content: String,
    /// Creation instant on the origin replica
    pub timestamp: Timestamp,
    /// Replica that created the post
    pub origin_replica: String,
    /// Session that requested creation (informational only)
    pub session_id: String,
}

impl Post {
    /// Check whether this post was created by `replica`
    pub fn is_from(&self, replica: &str) -> bool {
        self.origin_replica == replica
    }
}

/// Tombstone command: deletes every post at or before `timestamp`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCommand {
    pub id: RecordId,
    pub timestamp: Timestamp,
    pub origin_replica: String,
}

impl ClearCommand {
    /// Check whether applying this command removes `post`
    pub fn covers(&self, post: &Post) -> bool {
        post.timestamp <= self.timestamp
    }
}

/// A post as held in a replica's log
#[derive(Debug, Clone)]
pub struct StoredPost {
    pub post: Post,
    /// Local instant at which this replica admitted the post
    pub received_at: Timestamp,
}

impl StoredPost {
    /// Visibility rule for a session
    ///
    /// Local posts are always visible. Remote posts are visible only once
    /// the session's watermark has reached both the post's creation time
    /// and the instant it arrived here.
    pub fn visible_to(&self, replica: &str, watermark: Option<Timestamp>) -> bool {
        if self.post.is_from(replica) {
            return true;
        }
        match watermark {
            Some(w) => self.post.timestamp <= w && self.received_at <= w,
            None => false,
        }
    }
}
