//! Sync Orchestrator
//!
//! Runs one convergence cycle for a client session:
//!
//! 1. pull every peer's clear commands and apply the new ones
//! 2. pull posts newer than the session's watermark and merge them
//! 3. advance the session's watermark
//! 4. (full sync only) push local clear commands, then local posts
//!
//! Phase 1 finishes for every peer before phase 2 starts. A post pulled in
//! phase 2 can therefore never slip in under a clear command some peer
//! already knows about.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use super::dispatcher::Dispatcher;
use super::protocol::{CallStatus, PeerReport, Replicated, SyncSummary};
use super::ReplicationConfig;
use crate::id::{RecordId, Timestamp};
use crate::network::{call_peer, PeerOutcome, PeerTransport};
use crate::state::{Peer, PeerRegistry, SessionTracker};
use crate::store::ReplicaStore;

/// How far a sync cycle goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Phases 1 to 3
    PullOnly,
    /// Phases 1 to 4
    Full,
}

/// Drives sync cycles against every registered peer
pub struct SyncOrchestrator {
    store: Arc<ReplicaStore>,
    sessions: Arc<SessionTracker>,
    registry: Arc<PeerRegistry>,
    transport: Arc<dyn PeerTransport>,
    dispatcher: Dispatcher,
    config: ReplicationConfig,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<ReplicaStore>,
        sessions: Arc<SessionTracker>,
        registry: Arc<PeerRegistry>,
        transport: Arc<dyn PeerTransport>,
        dispatcher: Dispatcher,
        config: ReplicationConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            registry,
            transport,
            dispatcher,
            config,
        }
    }

    /// Run one sync cycle on behalf of `session_id`
    ///
    /// Never fails: unreachable or slow peers are recorded in the summary
    /// and skipped.
    pub async fn run(&self, session_id: &str, mode: SyncMode) -> SyncSummary {
        let peers = self.registry.peers();
        let mut reports: Vec<PeerReport> = peers.iter().map(|p| PeerReport::new(&p.name)).collect();

        self.pull_clear_commands(peers, &mut reports).await;

        let since = self.sessions.watermark(session_id).await.unwrap_or(0);
        // Reserved, so pushes landing after this point are stamped later
        let now = self.store.stamp();
        let merged = self.pull_posts(peers, since, now, &mut reports).await;

        let watermark = self.sessions.advance(session_id, now).await;

        let propagated = match mode {
            SyncMode::Full => self.push_local_state(peers, &mut reports).await,
            SyncMode::PullOnly => 0,
        };

        let summary = SyncSummary {
            replica: self.store.replica().to_string(),
            merged,
            propagated,
            clear_commands: self.store.clear_commands().await.len(),
            watermark,
            peers: reports,
        };

        tracing::info!(
            "Sync ({:?}) for session {}: merged {}, propagated {}, {}/{} peers healthy",
            mode,
            session_id,
            summary.merged,
            summary.propagated,
            summary.healthy_peers(),
            summary.peers.len()
        );
        summary
    }

    /// Phase 1
    async fn pull_clear_commands(&self, peers: &[Peer], reports: &mut [PeerReport]) {
        let outcomes = join_all(peers.iter().map(|peer| {
            call_peer(
                peer,
                "Clear-command pull",
                self.config.pull_timeout,
                self.transport.fetch_clear_commands(peer),
            )
        }))
        .await;

        for (report, outcome) in reports.iter_mut().zip(outcomes) {
            report.clear_pull = CallStatus::from(&outcome);
            if let PeerOutcome::Success(commands) = outcome {
                for command in commands {
                    if self.store.apply_clear(command).await.is_applied() {
                        report.clears_applied += 1;
                    }
                }
            }
        }
    }

    /// Phase 2; returns the number of posts merged
    async fn pull_posts(
        &self,
        peers: &[Peer],
        since: Timestamp,
        now: Timestamp,
        reports: &mut [PeerReport],
    ) -> usize {
        let outcomes = join_all(peers.iter().map(|peer| {
            call_peer(
                peer,
                "Post pull",
                self.config.pull_timeout,
                self.transport.fetch_posts_since(peer, since),
            )
        }))
        .await;

        let mut merged = 0;
        for (report, outcome) in reports.iter_mut().zip(outcomes) {
            report.post_pull = CallStatus::from(&outcome);
            let PeerOutcome::Success(posts) = outcome else {
                continue;
            };

            for post in posts {
                if post.timestamp > now {
                    tracing::debug!(
                        "Skipping future-dated post {} from {} ({} > {})",
                        post.id, report.peer, post.timestamp, now
                    );
                    continue;
                }
                // Arrival is pinned to `now` so the watermark set in phase 3 covers it
                if self.store.merge_at(post, now).await.is_inserted() {
                    report.posts_merged += 1;
                    merged += 1;
                }
            }
        }
        merged
    }

    /// Phase 4; returns the number of local posts delivered to at least one peer
    async fn push_local_state(&self, peers: &[Peer], reports: &mut [PeerReport]) -> usize {
        // Commands before posts, so peers prune before they merge
        let outbound: Vec<Replicated> = self
            .store
            .clear_commands()
            .await
            .into_iter()
            .map(Replicated::Clear)
            .chain(self.store.all_local().await.into_iter().map(Replicated::Post))
            .collect();

        let results = join_all(peers.iter().map(|peer| self.push_all(peer, &outbound))).await;

        let mut delivered_posts: HashSet<RecordId> = HashSet::new();
        for (report, sent) in reports.iter_mut().zip(results) {
            report.pushed = sent;
            report.push_failed = outbound.len() - sent;
            delivered_posts.extend(
                outbound[..sent]
                    .iter()
                    .filter(|item| matches!(item, Replicated::Post(_)))
                    .map(Replicated::id),
            );
        }

        delivered_posts.len()
    }

    /// Push `outbound` to one peer in order, giving up on the first failure
    ///
    /// Returns how many leading items were delivered.
    async fn push_all(&self, peer: &Peer, outbound: &[Replicated]) -> usize {
        for (sent, item) in outbound.iter().enumerate() {
            if !self.dispatcher.push_to(peer, item).await.is_success() {
                tracing::warn!("Skipping {} remaining pushes to {}", outbound.len() - sent - 1, peer);
                return sent;
            }
        }
        outbound.len()
    }
}
