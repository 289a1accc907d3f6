//! Tao Dividends API Server
//!
//! Serves dividend lookups and enqueues stake jobs for the worker.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tao_dividends::{run_server, AppState, ServiceConfig};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tao-dividends-server")]
#[command(about = "Tao Dividends HTTP API")]
struct Args {
    /// Server port
    #[arg(short, long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Server host
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Do not connect to the chain before accepting requests
    #[arg(long)]
    lazy_chain: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tao_dividends=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let config = ServiceConfig::from_env();

    info!("Starting Tao Dividends API");
    info!("  Network: {}", config.chain.network);
    info!("  Endpoint: {}", config.chain.endpoint);
    info!(
        "  Defaults: netuid={} hotkey={}",
        config.chain.default_netuid, config.chain.default_hotkey
    );

    let state = Arc::new(AppState::connect(config).await?);

    if !args.lazy_chain && !state.chain.initialize().await {
        warn!(
            "Chain client not initialized, serving simulated dividends until it connects: {}",
            state.chain.initialization_error().unwrap_or_default()
        );
    }

    run_server(state, &args.host, args.port).await
}
