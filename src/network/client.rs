//! HTTP Peer Client
//!
//! Talks to other replicas' `/internal` routes over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::PeerTransport;
use crate::error::{Error, Result};
use crate::id::Timestamp;
use crate::replication::protocol::{INTERNAL_CLEARS, INTERNAL_POSTS};
use crate::state::Peer;
use crate::store::{ClearCommand, Post};

/// reqwest-backed peer transport
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
    /// Per-request timeout for pulls
    pull_timeout: Duration,
    /// Per-request timeout for pushes
    push_timeout: Duration,
}

impl HttpPeerClient {
    /// Create a new peer client
    pub fn new(pull_timeout: Duration, push_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(push_timeout.min(pull_timeout))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            pull_timeout,
            push_timeout,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, peer: &Peer, url: String) -> Result<T> {
        let response = self
            .client
            .get(&url)
            .timeout(self.pull_timeout)
            .send()
            .await
            .map_err(|e| map_error(peer, e))?;

        let response = check_status(peer, response)?;
        response.json().await.map_err(|e| map_error(peer, e))
    }

    async fn post_json<B: Serialize + ?Sized>(&self, peer: &Peer, path: &str, body: &B) -> Result<()> {
        let response = self
            .client
            .post(peer.url(path))
            .timeout(self.push_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| map_error(peer, e))?;

        check_status(peer, response)?;
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for HttpPeerClient {
    async fn fetch_clear_commands(&self, peer: &Peer) -> Result<Vec<ClearCommand>> {
        self.get_json(peer, peer.url(INTERNAL_CLEARS)).await
    }

    async fn fetch_posts_since(&self, peer: &Peer, since: Timestamp) -> Result<Vec<Post>> {
        let url = format!("{}?since={}", peer.url(INTERNAL_POSTS), since);
        self.get_json(peer, url).await
    }

    async fn push_post(&self, peer: &Peer, post: &Post) -> Result<()> {
        self.post_json(peer, INTERNAL_POSTS, post).await
    }

    async fn push_clear_command(&self, peer: &Peer, command: &ClearCommand) -> Result<()> {
        self.post_json(peer, INTERNAL_CLEARS, command).await
    }
}

fn check_status(peer: &Peer, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::PeerUnreachable {
            peer: peer.name.clone(),
            reason: format!("HTTP {}", status),
        })
    }
}

fn map_error(peer: &Peer, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::PeerTimeout(peer.name.clone())
    } else {
        Error::PeerUnreachable {
            peer: peer.name.clone(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_failure() {
        let client = HttpPeerClient::new(
            Duration::from_millis(500),
            Duration::from_millis(100),
        )
        .unwrap();

        // Nothing listens on port 1
        let peer = Peer::new("replica-9", "http://127.0.0.1:1");
        let result = client.fetch_clear_commands(&peer).await;
        let err = result.unwrap_err();
        assert!(err.is_peer_failure());
    }
}
