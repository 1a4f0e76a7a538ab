//! WolfNote Configuration
//!
//! This module provides configuration structures for a WolfNote replica.
//! Settings come from an optional TOML file; the replica identity and
//! listening port can be overridden from the environment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `node.name`
pub const ENV_REPLICA: &str = "WOLFNOTE_REPLICA";
/// Environment variable overriding `node.port`
pub const ENV_PORT: &str = "WOLFNOTE_PORT";
/// Fallback port variable used by most process managers
pub const ENV_PORT_FALLBACK: &str = "PORT";

/// Main WolfNote configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WolfNoteConfig {
    /// Node-specific configuration
    #[serde(default)]
    pub node: NodeConfig,

    /// Cluster configuration
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Replica identity, unique within the peer table
    #[serde(default = "default_node_name")]
    pub name: String,

    /// Host to bind the HTTP listener on
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the HTTP listener on
    #[serde(default = "default_port")]
    pub port: u16,
}

/// A named replica endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Replica name (matched against `node.name` to exclude self)
    pub name: String,

    /// Base URL, e.g. `http://10.0.0.2:8081`
    pub address: String,
}

/// Cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Static table of every replica, self included
    #[serde(default = "default_peers")]
    pub peers: Vec<PeerConfig>,

    /// Timeout for pulling state from a peer, in milliseconds
    #[serde(default = "default_pull_timeout_ms")]
    pub pull_timeout_ms: u64,

    /// Timeout for pushing a single item to a peer, in milliseconds
    #[serde(default = "default_push_timeout_ms")]
    pub push_timeout_ms: u64,

    /// Fan new posts out to peers as soon as they are created
    #[serde(default = "default_true")]
    pub propagate_on_create: bool,
}

/// API configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Enable permissive CORS
    #[serde(default)]
    pub cors_enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_node_name() -> String {
    "replica-1".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_peers() -> Vec<PeerConfig> {
    (1..=3)
        .map(|i| PeerConfig {
            name: format!("replica-{}", i),
            address: format!("http://127.0.0.1:{}", 8080 + i),
        })
        .collect()
}

fn default_pull_timeout_ms() -> u64 {
    2000
}

fn default_push_timeout_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: default_node_name(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            peers: default_peers(),
            pull_timeout_ms: default_pull_timeout_ms(),
            push_timeout_ms: default_push_timeout_ms(),
            propagate_on_create: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl WolfNoteConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: WolfNoteConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists (defaults otherwise), then apply
    /// environment overrides and validate
    pub fn load(path: &Path) -> crate::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            tracing::info!("No config file at {:?}, using defaults", path);
            WolfNoteConfig::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply replica identity and port overrides from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup(ENV_REPLICA) {
            self.node.name = name;
        }

        if let Some(port) = lookup(ENV_PORT).or_else(|| lookup(ENV_PORT_FALLBACK)) {
            self.node.port = port.trim().parse().map_err(|_| {
                crate::Error::Config(format!("invalid port in environment: {:?}", port))
            })?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.node.name.trim().is_empty() {
            return Err(crate::Error::Config("node.name cannot be empty".into()));
        }

        for peer in &self.cluster.peers {
            if peer.name.trim().is_empty() {
                return Err(crate::Error::Config("cluster.peers: name cannot be empty".into()));
            }
            if !(peer.address.starts_with("http://") || peer.address.starts_with("https://")) {
                return Err(crate::Error::Config(format!(
                    "cluster.peers: address for {} must be an http(s) URL, got {}",
                    peer.name, peer.address
                )));
            }
        }

        if self.cluster.pull_timeout_ms == 0 || self.cluster.push_timeout_ms == 0 {
            return Err(crate::Error::Config("cluster timeouts must be non-zero".into()));
        }

        if self.cluster.push_timeout_ms > self.cluster.pull_timeout_ms {
            return Err(crate::Error::Config(
                "cluster.push_timeout_ms cannot exceed cluster.pull_timeout_ms".into(),
            ));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Address to bind the HTTP listener on
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.node.host, self.node.port)
    }

    /// Get pull timeout as Duration
    pub fn pull_timeout(&self) -> Duration {
        Duration::from_millis(self.cluster.pull_timeout_ms)
    }

    /// Get push timeout as Duration
    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.cluster.push_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[node]
name = "replica-2"
port = 9002

[cluster]
pull_timeout_ms = 1500
push_timeout_ms = 300
peers = [
    { name = "replica-1", address = "http://10.0.0.1:9001" },
    { name = "replica-2", address = "http://10.0.0.2:9002" },
]
"#;

        let config = WolfNoteConfig::from_str(toml).unwrap();
        assert_eq!(config.node.name, "replica-2");
        assert_eq!(config.bind_address(), "0.0.0.0:9002");
        assert_eq!(config.cluster.peers.len(), 2);
        assert_eq!(config.push_timeout(), Duration::from_millis(300));
        assert!(config.cluster.propagate_on_create);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_defaults_cover_three_replicas() {
        let config = WolfNoteConfig::default();
        config.validate().unwrap();
        assert_eq!(config.cluster.peers.len(), 3);
        assert_eq!(config.cluster.peers[2].address, "http://127.0.0.1:8083");
        assert!(config.push_timeout() < config.pull_timeout());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_REPLICA, "replica-3"), (ENV_PORT_FALLBACK, "8083")]
            .into_iter()
            .collect();

        let mut config = WolfNoteConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.node.name, "replica-3");
        assert_eq!(config.node.port, 8083);

        let mut config = WolfNoteConfig::default();
        let err = config.apply_env(|k| (k == ENV_PORT).then(|| "eighty".to_string()));
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(WolfNoteConfig::from_str("[node]\nname = \"\"\n").is_err());
        assert!(WolfNoteConfig::from_str(
            "[cluster]\npeers = [{ name = \"r\", address = \"10.0.0.1:80\" }]\n"
        )
        .is_err());
        assert!(WolfNoteConfig::from_str(
            "[cluster]\npull_timeout_ms = 100\npush_timeout_ms = 200\n"
        )
        .is_err());
    }

    #[test]
    fn test_load_file_and_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wolfnote.toml");

        let mut config = WolfNoteConfig::default();
        config.node.name = "replica-7".into();
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        let loaded = WolfNoteConfig::from_file(&path).unwrap();
        assert_eq!(loaded.node.name, "replica-7");
        assert_eq!(loaded.cluster.peers, config.cluster.peers);
    }
}
