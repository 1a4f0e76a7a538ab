//! Two replicas over real loopback HTTP

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use wolfnote::api::{HttpServer, ListPostsResponse, SESSION_HEADER};
use wolfnote::config::ApiConfig;
use wolfnote::id::SystemClock;
use wolfnote::network::HttpPeerClient;
use wolfnote::node::ReplicaNode;
use wolfnote::replication::{CallStatus, ReplicationConfig, SyncSummary};
use wolfnote::state::{Peer, PeerRegistry};
use wolfnote::store::Post;

/// Bind both replicas, start serving, and return their base URLs
async fn start_pair() -> (String, String) {
    let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let second = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let urls = [
        format!("http://{}", first.local_addr().unwrap()),
        format!("http://{}", second.local_addr().unwrap()),
    ];
    let peers = vec![
        Peer::new("replica-1", urls[0].clone()),
        Peer::new("replica-2", urls[1].clone()),
    ];

    for (name, listener) in [("replica-1", first), ("replica-2", second)] {
        let config = ReplicationConfig::default();
        let transport = HttpPeerClient::new(config.pull_timeout, config.push_timeout).unwrap();
        let node = ReplicaNode::new(
            PeerRegistry::new(name, peers.clone()),
            Arc::new(transport),
            Arc::new(SystemClock),
            config,
        );
        let server = HttpServer::new(ApiConfig::default(), "127.0.0.1:0", Arc::new(node));
        tokio::spawn(async move { server.serve(listener).await });
    }

    let [a, b] = urls;
    (a, b)
}

async fn list(client: &reqwest::Client, base: &str, session: &str, sync: bool) -> Vec<Post> {
    let response: ListPostsResponse = client
        .get(format!("{}/posts?sync={}", base, sync))
        .header(SESSION_HEADER, session)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response.session_id, session);
    response.posts
}

#[tokio::test]
async fn test_post_reaches_peer_over_http() {
    let (r1, r2) = start_pair().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/posts", r1))
        .header(SESSION_HEADER, "s-alice")
        .json(&serde_json::json!({"author": "alice", "content": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let post: Post = response.json().await.unwrap();

    let on_origin = list(&client, &r1, "fresh-1", false).await;
    assert_eq!(on_origin, vec![post.clone()]);

    // Not visible on replica 2 until its session syncs
    assert!(list(&client, &r2, "fresh-2", false).await.is_empty());

    tokio::time::sleep(Duration::from_millis(5)).await;
    let synced = list(&client, &r2, "fresh-2", true).await;
    assert_eq!(synced, vec![post]);
}

#[tokio::test]
async fn test_sync_reports_peers_over_http() {
    let (r1, _r2) = start_pair().await;
    let client = reqwest::Client::new();

    let summary: SyncSummary = client
        .post(format!("{}/sync", r1))
        .header(SESSION_HEADER, "s-1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(summary.replica, "replica-1");
    assert_eq!(summary.peers.len(), 1);
    assert_eq!(summary.peers[0].peer, "replica-2");
    assert_eq!(summary.peers[0].clear_pull, CallStatus::Ok);
    assert_eq!(summary.peers[0].post_pull, CallStatus::Ok);
}
