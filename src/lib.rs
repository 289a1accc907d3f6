//! Tao Dividends Service
//!
//! Reports the Tao dividends a subnet pays to a hotkey and optionally kicks off
//! a sentiment-driven stake/unstake job in the background.
//!
//! ## Module Structure
//!
//! - `config`: Environment-driven service configuration
//! - `util/`: Shared utilities (timestamps, lazy Redis connections)
//! - `crypto/`: Bearer token / JWT authentication and SS58 helpers
//! - `cache/`: Dividend cache (Redis, in-memory)
//! - `chain/`: Subtensor JSON-RPC client, storage keys, extrinsics, lazy connection
//! - `dividends`: Cache-then-chain dividend lookup with simulated fallback
//! - `sentiment/`: Tweet search and sentiment scoring clients
//! - `staking`: Stake/unstake wrappers over the chain client
//! - `storage/`: Append-only dividend history (PostgreSQL, in-memory)
//! - `worker/`: Job queue and the background stake worker
//! - `api/`: REST API (axum)

/// Shared utility functions
pub mod util;

/// Service configuration
pub mod config;

/// Authentication and SS58 helpers
pub mod crypto;

/// Dividend caching
pub mod cache;

/// Subtensor chain integration
pub mod chain;

/// Dividend lookup
pub mod dividends;

/// Social sentiment analysis
pub mod sentiment;

/// Stake and unstake operations
pub mod staking;

/// Dividend history persistence
pub mod storage;

/// Background job queue and worker
pub mod worker;

/// REST API
pub mod api;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use api::{build_router, run_server, ApiError, AppState};
pub use cache::{dividend_cache_key, CacheError, DividendCache, MemoryCache, RedisCache};
pub use chain::{
    ChainClient, ChainConnection, ChainError, Connector, RpcClient, SubtensorClient, Wallet,
    RAO_PER_TAO,
};
pub use config::{
    AuthConfig, CacheConfig, ChainConfig, DatabaseConfig, QueueConfig, SentimentConfig,
    ServiceConfig,
};
pub use crypto::auth::{AuthError, Claims, Principal, Scope, TokenAuthority, TokenResponse};
pub use dividends::{DividendQuery, DividendService, DividendSource};
pub use sentiment::{
    SentimentAnalyzer, SentimentError, SentimentReport, SentimentService, SentimentSource, Tweet,
    TweetSearchClient,
};
pub use staking::{StakeError, StakeOperation, StakeOperationResult, StakeStatus, Staker};
pub use storage::{
    DividendHistory, HistoryFilter, HistoryStore, MemoryHistoryStore, NewDividendHistory,
    PgHistoryStore, StorageError,
};
pub use worker::{
    enqueue_stake_job, JobProcessor, JobQueue, JobRecord, JobState, MemoryJobQueue, OutcomeStatus,
    QueueError, RedisJobQueue, StakeJob, StakeJobOutcome, StakeProcessor, StakeWorker,
    WorkerHandle,
};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Subnet queried when the caller does not specify one
pub const DEFAULT_NETUID: u16 = 18;

/// Hotkey queried when the caller does not specify one
pub const DEFAULT_HOTKEY: &str = "5FFApaS75bv5pJHfAp2FVLBj9ZaXuFDjEypsaBNc1wCfe52v";
