//! WolfNote - Multi-replica note sharing
//!
//! Runs one replica: the client API, the internal replication routes and
//! on-demand sync against the configured peers.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfnote::api::HttpServer;
use wolfnote::config::WolfNoteConfig;
use wolfnote::error::Result;
use wolfnote::node::ReplicaNode;

/// WolfNote - Multi-replica note sharing
#[derive(Parser)]
#[command(name = "wolfnote")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolfnote.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the replica
    Start,

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfnote.toml")]
        output: PathBuf,

        /// Replica name
        #[arg(long, default_value = "replica-1")]
        name: String,

        /// HTTP port
        #[arg(long, default_value_t = 8081)]
        port: u16,
    },

    /// Validate configuration file
    Validate,

    /// Show replica information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            run_start(cli.config, cli.log_level).await
        }
        Commands::Init { output, name, port } => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"));
            run_init(output, name, port)
        }
        Commands::Validate => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"));
            run_validate(cli.config)
        }
        Commands::Info => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"));
            run_info(cli.config)
        }
    }
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Start the replica
async fn run_start(config_path: PathBuf, log_level: Option<String>) -> Result<()> {
    let config = WolfNoteConfig::load(&config_path)?;
    init_logging(log_level.as_deref().unwrap_or(&config.logging.level));

    tracing::info!("Starting WolfNote replica {}", config.node.name);

    let node = Arc::new(ReplicaNode::from_config(&config)?);
    let server = HttpServer::new(config.api.clone(), config.bind_address(), node);

    tokio::select! {
        result = server.start() => {
            if let Err(e) = result {
                tracing::error!("HTTP server error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }

    tracing::info!("WolfNote shutdown complete");
    Ok(())
}

/// Write a configuration file with defaults for one replica
fn run_init(output: PathBuf, name: String, port: u16) -> Result<()> {
    let mut config = WolfNoteConfig::default();
    config.node.name = name;
    config.node.port = port;
    config.validate()?;

    let content = format!("# WolfNote Configuration\n# Generated configuration file\n\n{}", config.to_toml()?);
    std::fs::write(&output, content)?;

    println!("Configuration file created: {}", output.display());
    println!("\nEdit the [cluster] peers table to describe your replicas.");
    println!("Then start with: wolfnote start --config {}", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: PathBuf) -> Result<()> {
    match WolfNoteConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Replica: {}", config.node.name);
            println!("  Bind Address: {}", config.bind_address());
            println!("  Peers: {}", config.cluster.peers.len());
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Show replica information, with environment overrides applied
fn run_info(config_path: PathBuf) -> Result<()> {
    let config = WolfNoteConfig::load(&config_path)?;

    println!("WolfNote Replica Information");
    println!("============================");
    println!();
    println!("Replica:          {}", config.node.name);
    println!("Bind Address:     {}", config.bind_address());
    println!("CORS:             {}", config.api.cors_enabled);
    println!();
    println!("Cluster Configuration:");
    for peer in &config.cluster.peers {
        let marker = if peer.name == config.node.name { " (self)" } else { "" };
        println!("  {:<16}{}{}", peer.name, peer.address, marker);
    }
    println!("  Pull Timeout:   {} ms", config.cluster.pull_timeout_ms);
    println!("  Push Timeout:   {} ms", config.cluster.push_timeout_ms);
    println!("  Propagate:      {}", config.cluster.propagate_on_create);

    Ok(())
}
