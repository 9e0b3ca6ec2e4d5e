//! KratOs Client diagnostics
//!
//! Small tool to inspect the configured node set and push raw queries
//! through the failover engine.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use kratos_client::execution::MethodId;
use kratos_client::node::registry::NodeStatus;
use kratos_client::{Client, ClientConfig, NodeId, Query};

/// KratOs Client - multi-node delivery diagnostics
#[derive(Parser, Debug)]
#[command(name = "kratos-client")]
#[command(author = "KratOs Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Diagnostics for the KratOs multi-node client", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "kratos-client.toml", env = "KRATOS_CLIENT_CONFIG")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Cap on node attempts per request
    #[arg(long)]
    max_attempts: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured nodes with their health
    Nodes {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Send a raw query and print the answer
    Query {
        /// Numeric RPC method id
        #[arg(long)]
        method: u16,

        /// Query payload as hex
        #[arg(long, default_value = "")]
        payload_hex: String,

        /// Restrict candidates to these node ids (repeatable)
        #[arg(long = "node")]
        nodes: Vec<u64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .init();

    info!("🛰️  KratOs Client v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if args.config.exists() {
        ClientConfig::load(&args.config)?
    } else {
        warn!("Config file not found, using defaults");
        ClientConfig::default()
    };
    let config = match args.max_attempts {
        Some(max) => config.with_max_attempts(Some(max)),
        None => config,
    };

    let client = Client::from_config(config)?;

    match args.command {
        Command::Nodes { json } => print_nodes(&client.node_health(), json)?,
        Command::Query {
            method,
            payload_hex,
            nodes,
            json,
        } => {
            let payload = hex::decode(payload_hex.trim_start_matches("0x"))?;
            let query = Query::new(MethodId(method), payload)
                .with_node_ids(nodes.into_iter().map(NodeId).collect());

            match client.execute_query(&query).await {
                Ok(response) => {
                    println!(
                        "✅ {} answered after {} attempts: {}",
                        response.node_id,
                        response.attempts,
                        hex::encode(&response.payload)
                    );
                }
                Err(e) => println!("❌ Query failed: {}", e),
            }
            print_nodes(&client.node_health(), json)?;
        }
    }

    Ok(())
}

fn print_nodes(statuses: &[NodeStatus], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(statuses)?);
        return Ok(());
    }

    println!(
        "{:<10} {:<24} {:<8} {:>10} {:>6} {:>6}",
        "NODE", "ADDRESS", "HEALTHY", "BACKOFF", "USES", "FAILS"
    );
    for status in statuses {
        println!(
            "{:<10} {:<24} {:<8} {:>8}ms {:>6} {:>6}",
            status.id.to_string(),
            status.address,
            if status.healthy { "yes" } else { "no" },
            status.remaining_backoff_ms,
            status.health.use_count,
            status.health.failure_count
        );
    }
    Ok(())
}
