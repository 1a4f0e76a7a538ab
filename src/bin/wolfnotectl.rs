//! WolfNoteCtl - Command line client for a WolfNote replica
//!
//! Usage:
//!   wolfnotectl post <author> <content>  - Create a post
//!   wolfnotectl list [--sync]            - List visible posts
//!   wolfnotectl sync                     - Run a full sync
//!   wolfnotectl clear                    - Clear every post up to now
//!   wolfnotectl debug                    - Show replica state for this session

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use wolfnote::api::{ErrorResponse, HealthResponse, ListPostsResponse, SESSION_HEADER};
use wolfnote::node::DebugInfo;
use wolfnote::replication::{CallStatus, SyncSummary};
use wolfnote::store::{ClearCommand, Post};

/// WolfNote Replica Control Tool
#[derive(Parser)]
#[command(name = "wolfnotectl")]
#[command(about = "Talk to a WolfNote replica", long_about = None)]
struct Cli {
    /// Replica endpoint
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    endpoint: String,

    /// Session id to act as
    #[arg(short, long, default_value = "wolfnotectl")]
    session: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a post
    Post {
        author: String,
        content: String,
    },
    /// List posts visible to this session
    List {
        /// Pull from peers before listing
        #[arg(long)]
        sync: bool,
    },
    /// Pull from and push to every peer
    Sync,
    /// Clear every post up to now on this replica
    Clear,
    /// Show replica state for this session
    Debug,
    /// Check that the replica is up
    Health,
}

// ============ Main ============

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let ctl = Ctl {
        client: reqwest::Client::new(),
        endpoint: cli.endpoint.trim_end_matches('/').to_string(),
        session: cli.session.clone(),
    };

    let result = match &cli.command {
        Commands::Post { author, content } => create_post(&ctl, author, content).await,
        Commands::List { sync } => list_posts(&ctl, *sync).await,
        Commands::Sync => sync(&ctl).await,
        Commands::Clear => clear(&ctl).await,
        Commands::Debug => debug(&ctl).await,
        Commands::Health => health(&ctl).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

struct Ctl {
    client: reqwest::Client,
    endpoint: String,
    session: String,
}

impl Ctl {
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .header(SESSION_HEADER, &self.session)
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            match response.json::<ErrorResponse>().await {
                Ok(err) => bail!("{} ({})", err.error, err.code),
                Err(_) => bail!("API error: {}", status),
            }
        }
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.get(format!("{}{}", self.endpoint, path))).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        self.send(self.client.post(format!("{}{}", self.endpoint, path)).json(&body)).await
    }
}

// ============ Commands ============

async fn create_post(ctl: &Ctl, author: &str, content: &str) -> Result<()> {
    let post: Post = ctl
        .post("/posts", serde_json::json!({ "author": author, "content": content }))
        .await?;
    println!("Created post {} at {}", post.id, post.timestamp);
    Ok(())
}

async fn list_posts(ctl: &Ctl, sync: bool) -> Result<()> {
    let path = if sync { "/posts?sync=true" } else { "/posts" };
    let list: ListPostsResponse = ctl.get(path).await?;

    println!();
    println!("Posts on {} (session {})", list.replica, list.session_id);
    println!("{}", "=".repeat(40));
    println!();
    println!("{:<15} {:<12} {:<16} {}", "TIMESTAMP", "ORIGIN", "AUTHOR", "CONTENT");
    println!("{}", "-".repeat(70));
    for post in &list.posts {
        println!("{:<15} {:<12} {:<16} {}", post.timestamp, post.origin_replica, post.author, post.content);
    }
    println!();
    println!("{} posts", list.posts.len());

    Ok(())
}

async fn sync(ctl: &Ctl) -> Result<()> {
    let summary: SyncSummary = ctl.post("/sync", serde_json::json!({})).await?;

    println!();
    println!("Sync on {}", summary.replica);
    println!("{}", "=".repeat(40));
    println!("Merged:         {}", summary.merged);
    println!("Propagated:     {}", summary.propagated);
    println!("Clear commands: {}", summary.clear_commands);
    println!("Watermark:      {}", summary.watermark);
    println!();
    println!("{:<15} {:<10} {:<10} {:<8} {:<8}", "PEER", "CLEARS", "POSTS", "PUSHED", "FAILED");
    println!("{}", "-".repeat(55));

    for peer in &summary.peers {
        println!(
            "{:<15} {:<10} {:<10} {:<8} {:<8}",
            peer.peer,
            status_label(peer.clear_pull),
            status_label(peer.post_pull),
            peer.pushed,
            peer.push_failed
        );
    }
    println!();
    println!("{}/{} peers healthy", summary.healthy_peers(), summary.peers.len());

    Ok(())
}

async fn clear(ctl: &Ctl) -> Result<()> {
    let command: ClearCommand = ctl.post("/clear", serde_json::json!({})).await?;
    println!("Cleared through {} (command {})", command.timestamp, command.id);
    println!("Peers apply it on their next sync.");
    Ok(())
}

async fn debug(ctl: &Ctl) -> Result<()> {
    let info: DebugInfo = ctl.get("/debug").await?;

    println!();
    println!("Replica State");
    println!("=============");
    println!();
    println!("Replica:        {}", info.replica);
    println!("Session:        {}", info.session_id);
    match info.watermark {
        Some(w) => println!("Watermark:      {}", w),
        None => println!("Watermark:      (never synced)"),
    }
    println!("Posts:          {} ({} local)", info.total_posts, info.local_posts);
    println!("Merged total:   {}", info.merged_total);
    println!("Clear commands: {}", info.clear_commands);
    if let Some(h) = info.clear_horizon {
        println!("Cleared until:  {}", h);
    }
    println!("Sessions:       {}", info.sessions);
    println!("Peers:          {}", info.peers.join(", "));
    println!();

    Ok(())
}

async fn health(ctl: &Ctl) -> Result<()> {
    let health: HealthResponse = ctl.get("/health").await?;
    let mark = if health.healthy { "\x1b[32m✓\x1b[0m" } else { "\x1b[31m✗\x1b[0m" };
    println!("{} {} ({} peers)", mark, health.replica, health.peers);
    Ok(())
}

fn status_label(status: CallStatus) -> &'static str {
    match status {
        CallStatus::Ok => "ok",
        CallStatus::Timeout => "timeout",
        CallStatus::Failed => "failed",
        CallStatus::Skipped => "-",
    }
}
