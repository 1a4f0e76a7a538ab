//! WolfNote Error Types

use thiserror::Error;

/// Result type alias for WolfNote operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfNote error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to render configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    // Client input errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Peer errors
    #[error("Peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    #[error("Peer {0} timed out")]
    PeerTimeout(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error came from talking to a peer.
    ///
    /// Peer failures are recovered locally by skipping the peer for the
    /// current cycle; they never fail a sync or a create.
    pub fn is_peer_failure(&self) -> bool {
        matches!(
            self,
            Error::PeerUnreachable { .. } | Error::PeerTimeout(_)
        )
    }

    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::ConfigParse(_) | Error::ConfigSerialize(_) => "CONFIG_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::PeerUnreachable { .. } => "PEER_UNREACHABLE",
            Error::PeerTimeout(_) => "PEER_TIMEOUT",
            Error::Network(_) => "NETWORK_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_failure_classification() {
        assert!(Error::PeerTimeout("replica-2".into()).is_peer_failure());
        assert!(Error::PeerUnreachable {
            peer: "replica-3".into(),
            reason: "connection refused".into(),
        }
        .is_peer_failure());
        assert!(!Error::Validation("author is required".into()).is_peer_failure());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(Error::PeerTimeout("r".into()).code(), "PEER_TIMEOUT");
    }
}
