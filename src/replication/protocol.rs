//! Replication Protocol
//!
//! Routes and JSON bodies exchanged between replicas, plus the summary a
//! sync cycle reports back to the client that triggered it.

use serde::{Deserialize, Serialize};

use crate::id::{RecordId, Timestamp};
use crate::network::PeerOutcome;
use crate::store::{ClearCommand, Post};

/// Peer-facing route for posts (GET with `since`, POST to push one)
pub const INTERNAL_POSTS: &str = "/internal/posts";

/// Peer-facing route for clear commands (GET full log, POST to push one)
pub const INTERNAL_CLEARS: &str = "/internal/clears";

/// Query for an incremental post pull
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SinceQuery {
    /// Return posts strictly newer than this instant
    #[serde(default)]
    pub since: Timestamp,
}

/// A single replicated mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "item", rename_all = "snake_case")]
pub enum Replicated {
    Post(Post),
    Clear(ClearCommand),
}

impl Replicated {
    /// Get the record id
    pub fn id(&self) -> RecordId {
        match self {
            Replicated::Post(p) => p.id,
            Replicated::Clear(c) => c.id,
        }
    }

    /// Get the type name for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            Replicated::Post(_) => "Post",
            Replicated::Clear(_) => "ClearCommand",
        }
    }
}

/// Acknowledgement for a pushed record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushAck {
    pub id: RecordId,
    /// False when the record was already known or already cleared
    pub applied: bool,
}

/// Outcome of one peer call, as reported in a sync summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Ok,
    Timeout,
    Failed,
    /// Phase not run for this peer
    Skipped,
}

impl<T> From<&PeerOutcome<T>> for CallStatus {
    fn from(outcome: &PeerOutcome<T>) -> Self {
        match outcome {
            PeerOutcome::Success(_) => CallStatus::Ok,
            PeerOutcome::Timeout => CallStatus::Timeout,
            PeerOutcome::Failed(_) => CallStatus::Failed,
        }
    }
}

/// What happened with one peer during a sync cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerReport {
    pub peer: String,
    /// Phase 1: clear-command pull
    pub clear_pull: CallStatus,
    /// Clear commands from this peer that were new here
    pub clears_applied: usize,
    /// Phase 2: post pull
    pub post_pull: CallStatus,
    /// Posts from this peer that were merged here
    pub posts_merged: usize,
    /// Phase 4: records delivered to this peer
    pub pushed: usize,
    /// Phase 4: records not delivered (failed or skipped after a failure)
    pub push_failed: usize,
}

impl PeerReport {
    pub fn new(peer: &str) -> Self {
        Self {
            peer: peer.to_string(),
            clear_pull: CallStatus::Skipped,
            clears_applied: 0,
            post_pull: CallStatus::Skipped,
            posts_merged: 0,
            pushed: 0,
            push_failed: 0,
        }
    }

    /// True if every phase that ran for this peer succeeded
    pub fn is_healthy(&self) -> bool {
        let ok = |s: CallStatus| matches!(s, CallStatus::Ok | CallStatus::Skipped);
        ok(self.clear_pull) && ok(self.post_pull) && self.push_failed == 0
    }
}

/// Result of a sync cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub replica: String,
    /// Remote posts merged in this cycle
    pub merged: usize,
    /// Locally originated posts pushed out (0 for pull-only syncs)
    pub propagated: usize,
    /// Clear commands known locally after the cycle
    pub clear_commands: usize,
    /// The invoking session's watermark after the cycle
    pub watermark: Timestamp,
    pub peers: Vec<PeerReport>,
}

impl SyncSummary {
    /// Peers that answered every call in this cycle
    pub fn healthy_peers(&self) -> usize {
        self.peers.iter().filter(|p| p.is_healthy()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replicated_tagging() {
        let clear = Replicated::Clear(ClearCommand {
            id: RecordId::new(),
            timestamp: 7,
            origin_replica: "replica-1".into(),
        });
        assert_eq!(clear.type_name(), "ClearCommand");

        let json = serde_json::to_value(&clear).unwrap();
        assert_eq!(json["kind"], "clear");
        assert_eq!(json["item"]["timestamp"], 7);
    }

    #[test]
    fn test_since_query_defaults_to_zero() {
        let q: SinceQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.since, 0);
    }

    #[test]
    fn test_call_status_from_outcome() {
        assert_eq!(CallStatus::from(&PeerOutcome::Success(())), CallStatus::Ok);
        assert_eq!(CallStatus::from(&PeerOutcome::<()>::Timeout), CallStatus::Timeout);
        assert_eq!(CallStatus::from(&PeerOutcome::<()>::Failed("x".into())), CallStatus::Failed);
    }

    #[test]
    fn test_peer_report_health() {
        let mut report = PeerReport::new("replica-2");
        assert!(report.is_healthy());
        report.post_pull = CallStatus::Timeout;
        assert!(!report.is_healthy());
    }
}
