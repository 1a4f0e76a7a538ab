//! Propagation Dispatcher
//!
//! Best-effort fan-out of one record to every peer. There is no quorum and
//! no retry: a failed delivery is logged and counted, and the record will
//! reach that peer, if at all, on a later sync.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

use super::protocol::Replicated;
use crate::network::{call_peer, PeerOutcome, PeerTransport};
use crate::state::{Peer, PeerRegistry};

/// Delivery counts for one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Pushes records to peers
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<PeerRegistry>,
    transport: Arc<dyn PeerTransport>,
    push_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<PeerRegistry>,
        transport: Arc<dyn PeerTransport>,
        push_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            transport,
            push_timeout,
        }
    }

    /// Push one record to one peer
    pub async fn push_to(&self, peer: &Peer, item: &Replicated) -> PeerOutcome<()> {
        let outcome = match item {
            Replicated::Post(post) => {
                call_peer(peer, "Post push", self.push_timeout, self.transport.push_post(peer, post)).await
            }
            Replicated::Clear(command) => {
                call_peer(
                    peer,
                    "Clear-command push",
                    self.push_timeout,
                    self.transport.push_clear_command(peer, command),
                )
                .await
            }
        };

        if outcome.is_success() {
            tracing::trace!("Delivered {} {} to {}", item.type_name(), item.id(), peer);
        }
        outcome
    }

    /// Push one record to every peer concurrently
    pub async fn propagate(&self, item: &Replicated) -> DispatchReport {
        let outcomes = join_all(
            self.registry
                .peers()
                .iter()
                .map(|peer| self.push_to(peer, item)),
        )
        .await;

        let delivered = outcomes.iter().filter(|o| o.is_success()).count();
        let report = DispatchReport {
            delivered,
            failed: outcomes.len() - delivered,
        };

        tracing::debug!(
            "Propagated {} {}: {} delivered, {} failed",
            item.type_name(), item.id(), report.delivered, report.failed
        );
        report
    }

    /// Propagate in the background; the caller does not wait
    pub fn spawn_propagate(&self, item: Replicated) -> tokio::task::JoinHandle<DispatchReport> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.propagate(&item).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::id::{RecordId, Timestamp};
    use crate::store::{ClearCommand, Post};
    use std::sync::Mutex;

    /// Records deliveries; peers named "down" refuse, "slow" hang
    #[derive(Default)]
    struct RecordingTransport {
        delivered: Mutex<Vec<(String, RecordId)>>,
    }

    impl RecordingTransport {
        async fn deliver(&self, peer: &Peer, id: RecordId) -> Result<()> {
            match peer.name.as_str() {
                "down" => Err(Error::PeerUnreachable {
                    peer: peer.name.clone(),
                    reason: "connection refused".into(),
                }),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(())
                }
                _ => {
                    self.delivered.lock().unwrap().push((peer.name.clone(), id));
                    Ok(())
                }
            }
        }
    }

    #[async_trait::async_trait]
    impl PeerTransport for RecordingTransport {
        async fn fetch_clear_commands(&self, _peer: &Peer) -> Result<Vec<ClearCommand>> {
            Ok(Vec::new())
        }

        async fn fetch_posts_since(&self, _peer: &Peer, _since: Timestamp) -> Result<Vec<Post>> {
            Ok(Vec::new())
        }

        async fn push_post(&self, peer: &Peer, post: &Post) -> Result<()> {
            self.deliver(peer, post.id).await
        }

        async fn push_clear_command(&self, peer: &Peer, command: &ClearCommand) -> Result<()> {
            self.deliver(peer, command.id).await
        }
    }

    fn dispatcher(peers: &[&str]) -> (Dispatcher, Arc<RecordingTransport>) {
        let registry = PeerRegistry::new(
            "replica-1",
            peers.iter().map(|n| Peer::new(*n, format!("http://{}", n))).collect(),
        );
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            transport.clone(),
            Duration::from_millis(50),
        );
        (dispatcher, transport)
    }

    fn clear_item() -> Replicated {
        Replicated::Clear(ClearCommand {
            id: RecordId::new(),
            timestamp: 10,
            origin_replica: "replica-1".into(),
        })
    }

    #[tokio::test]
    async fn test_propagate_reaches_every_peer() {
        let (dispatcher, transport) = dispatcher(&["replica-2", "replica-3"]);
        let item = clear_item();

        let report = dispatcher.propagate(&item).await;
        assert_eq!(report, DispatchReport { delivered: 2, failed: 0 });

        let delivered = transport.delivered.lock().unwrap();
        assert!(delivered.iter().all(|(_, id)| *id == item.id()));
    }

    #[tokio::test]
    async fn test_failures_do_not_block_others() {
        let (dispatcher, transport) = dispatcher(&["down", "slow", "replica-4"]);

        let report = dispatcher.propagate(&clear_item()).await;
        assert_eq!(report, DispatchReport { delivered: 1, failed: 2 });
        assert_eq!(transport.delivered.lock().unwrap()[0].0, "replica-4");
    }

    #[tokio::test]
    async fn test_spawned_propagation() {
        let (dispatcher, _) = dispatcher(&["replica-2"]);
        let report = dispatcher.spawn_propagate(clear_item()).await.unwrap();
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn test_no_peers() {
        let (dispatcher, _) = dispatcher(&[]);
        assert_eq!(dispatcher.propagate(&clear_item()).await, DispatchReport::default());
    }
}
