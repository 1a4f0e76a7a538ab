//! Network Module
//!
//! Outbound calls to peer replicas. Every call is bounded by a timeout and
//! folded into a [`PeerOutcome`] so callers never see peer failures as
//! errors.

mod client;

pub use client::HttpPeerClient;

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::id::Timestamp;
use crate::state::Peer;
use crate::store::{ClearCommand, Post};

/// Client side of the internal replication endpoint
#[async_trait::async_trait]
pub trait PeerTransport: Send + Sync {
    /// Fetch a peer's full clear-command log
    async fn fetch_clear_commands(&self, peer: &Peer) -> Result<Vec<ClearCommand>>;

    /// Fetch a peer's posts with `timestamp > since`
    async fn fetch_posts_since(&self, peer: &Peer, since: Timestamp) -> Result<Vec<Post>>;

    /// Push one post to a peer
    async fn push_post(&self, peer: &Peer, post: &Post) -> Result<()>;

    /// Push one clear command to a peer
    async fn push_clear_command(&self, peer: &Peer, command: &ClearCommand) -> Result<()>;
}

/// Tagged result of a single peer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerOutcome<T> {
    Success(T),
    Timeout,
    Failed(String),
}

impl<T> PeerOutcome<T> {
    /// Take the value of a successful call
    pub fn ok(self) -> Option<T> {
        match self {
            PeerOutcome::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PeerOutcome::Success(_))
    }
}

/// Run one peer call under `limit`, logging and tagging any failure
pub async fn call_peer<T, F>(peer: &Peer, what: &str, limit: Duration, call: F) -> PeerOutcome<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(limit, call).await {
        Ok(Ok(value)) => PeerOutcome::Success(value),
        Ok(Err(Error::PeerTimeout(_))) | Err(_) => {
            tracing::warn!("{} to {} timed out after {:?}", what, peer, limit);
            PeerOutcome::Timeout
        }
        Ok(Err(e)) => {
            tracing::warn!("{} to {} failed: {}", what, peer, e);
            PeerOutcome::Failed(e.to_string())
        }
    }
}
