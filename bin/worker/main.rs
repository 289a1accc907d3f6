//! Tao Dividends Stake Worker
//!
//! Drains the stake job queue: scores subnet sentiment and submits the
//! matching stake or unstake extrinsic.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tao_dividends::api::state::connect_history;
use tao_dividends::{
    ChainConnection, DividendService, RedisCache, RedisJobQueue, SentimentService, ServiceConfig,
    StakeProcessor, StakeWorker, Staker,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tao-dividends-worker")]
#[command(about = "Background stake worker for the Tao Dividends API")]
struct Args {
    /// Number of concurrent worker loops
    #[arg(short, long, env = "WORKER_CONCURRENCY")]
    concurrency: Option<usize>,
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
    let mut config = ServiceConfig::from_env();
    if let Some(concurrency) = args.concurrency {
        config.queue.worker_concurrency = concurrency.max(1);
    }

    info!("Starting Tao Dividends worker");
    info!("  Queue: {}", config.queue.queue_name);
    info!("  Concurrency: {}", config.queue.worker_concurrency);
    info!("  Network: {}", config.chain.network);

    let chain = Arc::new(ChainConnection::new(config.chain.clone()));
    if !chain.initialize().await {
        warn!(
            "Chain client not initialized, jobs will retry the connection: {}",
            chain.initialization_error().unwrap_or_default()
        );
    }

    let cache = RedisCache::new(&config.cache.redis_url).context("Invalid REDIS_URL")?;
    let dividends = Arc::new(DividendService::new(
        Arc::new(cache),
        Arc::clone(&chain),
        config.cache.dividend_ttl,
    ));
    let sentiment =
        SentimentService::new(&config.sentiment).context("Failed to build sentiment clients")?;
    let history = connect_history(&config).await;

    let processor = StakeProcessor::new(
        Arc::new(sentiment),
        Staker::new(chain),
        dividends,
        history,
        config.sentiment.stake_per_point,
    );
    let queue = RedisJobQueue::new(&config.queue).context("Invalid queue Redis URL")?;

    let worker = Arc::new(StakeWorker::new(
        Arc::new(queue),
        Arc::new(processor),
        config.queue.clone(),
    ));
    let handle = worker.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested, finishing in-flight jobs");

    handle.shutdown();
    handle.join().await;

    info!("Worker stopped");
    Ok(())
}
