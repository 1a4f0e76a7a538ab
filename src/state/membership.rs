//! Peer Registry
//!
//! Static table of the other replicas this node synchronizes with.

use serde::{Deserialize, Serialize};

use crate::config::PeerConfig;

/// A remote replica endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    /// Replica name
    pub name: String,
    /// Base URL of the replica's HTTP API
    pub address: String,
}

impl Peer {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a full URL for `path` on this peer
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Known peers, self excluded
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    /// This replica's name
    replica: String,
    peers: Vec<Peer>,
}

impl PeerRegistry {
    /// Build the registry from the configured table
    ///
    /// Entries whose name matches `replica` are dropped, as are repeated
    /// names (first entry wins).
    pub fn from_table(replica: &str, table: &[PeerConfig]) -> Self {
        let mut peers: Vec<Peer> = Vec::with_capacity(table.len());

        for entry in table {
            if entry.name == replica {
                tracing::debug!("Skipping peer {} (that's us)", entry.name);
                continue;
            }
            if peers.iter().any(|p| p.name == entry.name) {
                tracing::warn!("Duplicate peer {} in table, keeping first entry", entry.name);
                continue;
            }
            peers.push(Peer::new(entry.name.clone(), entry.address.clone()));
        }

        Self {
            replica: replica.to_string(),
            peers,
        }
    }

    /// Build a registry from explicit peers
    pub fn new(replica: &str, peers: Vec<Peer>) -> Self {
        let table: Vec<PeerConfig> = peers
            .into_iter()
            .map(|p| PeerConfig { name: p.name, address: p.address })
            .collect();
        Self::from_table(replica, &table)
    }

    /// This replica's name
    pub fn replica(&self) -> &str {
        &self.replica
    }

    /// All peers (excluding self)
    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    /// Look up a peer by name
    pub fn get(&self, name: &str) -> Option<&Peer> {
        self.peers.iter().find(|p| p.name == name)
    }

    /// Peer names, in table order
    pub fn names(&self) -> Vec<String> {
        self.peers.iter().map(|p| p.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<PeerConfig> {
        vec![
            PeerConfig { name: "replica-1".into(), address: "http://localhost:8081".into() },
            PeerConfig { name: "replica-2".into(), address: "http://localhost:8082/".into() },
            PeerConfig { name: "replica-3".into(), address: "http://localhost:8083".into() },
        ]
    }

    #[test]
    fn test_self_excluded_by_name() {
        let registry = PeerRegistry::from_table("replica-2", &table());

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["replica-1", "replica-3"]);
        assert!(registry.get("replica-2").is_none());
        assert_eq!(registry.replica(), "replica-2");
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let mut entries = table();
        entries.push(PeerConfig { name: "replica-3".into(), address: "http://elsewhere:1".into() });

        let registry = PeerRegistry::from_table("replica-1", &entries);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("replica-3").unwrap().address, "http://localhost:8083");
    }

    #[test]
    fn test_peer_url() {
        let registry = PeerRegistry::from_table("replica-1", &table());
        let peer = registry.get("replica-2").unwrap();
        assert_eq!(peer.url("/internal/clears"), "http://localhost:8082/internal/clears");
    }

    #[test]
    fn test_standalone_registry() {
        let registry = PeerRegistry::new("solo", vec![Peer::new("solo", "http://localhost:1")]);
        assert!(registry.is_empty());
    }
}
