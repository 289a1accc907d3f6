//! Service Configuration
//!
//! Defines the configuration for the dividends service including:
//! - Chain connection (network, endpoint, wallet, call indices)
//! - Dividend cache (Redis URL, TTL)
//! - Background job queue (expiry, retries, backoff)
//! - Sentiment providers (tweet search, sentiment model)
//! - Authentication (static tokens, JWT)
//! - Optional PostgreSQL history logging
//!
//! Every section implements `Default`; `ServiceConfig::from_env` overlays
//! environment variables on top of the defaults.

use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Complete service configuration
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Chain connection configuration
    pub chain: ChainConfig,
    /// Dividend cache configuration
    pub cache: CacheConfig,
    /// Background job configuration
    pub queue: QueueConfig,
    /// Sentiment provider configuration
    pub sentiment: SentimentConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// History database configuration
    pub database: DatabaseConfig,
}

impl ServiceConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            chain: ChainConfig::from_env(),
            cache: CacheConfig::from_env(),
            queue: QueueConfig::from_env(),
            sentiment: SentimentConfig::from_env(),
            auth: AuthConfig::from_env(),
            database: DatabaseConfig::from_env(),
        }
    }
}

// ============================================================================
// CHAIN
// ============================================================================

/// Subtensor connection configuration
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Network name (finney, test, local)
    pub network: String,
    /// JSON-RPC endpoint (derived from network unless overridden)
    pub endpoint: String,
    /// Coldkey mnemonic used to sign stake extrinsics
    pub wallet_mnemonic: Option<String>,
    /// Subnet used when a request does not name one
    pub default_netuid: u16,
    /// Hotkey used when a request does not name one
    pub default_hotkey: String,
    /// Connection attempts before giving up on a lazy connect
    pub connect_attempts: u32,
    /// Delay before the second connect attempt (doubled afterwards)
    pub connect_backoff: Duration,
    /// Per-request RPC timeout
    pub request_timeout: Duration,
    /// Pallet index of SubtensorModule in the runtime
    pub subtensor_pallet_index: u8,
    /// Call index of `add_stake`
    pub add_stake_call_index: u8,
    /// Call index of `remove_stake`
    pub remove_stake_call_index: u8,
    /// Whether the runtime carries the CheckMetadataHash signed extension
    pub metadata_hash_extension: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network: "test".to_string(),
            endpoint: endpoint_for_network("test").to_string(),
            wallet_mnemonic: None,
            default_netuid: crate::DEFAULT_NETUID,
            default_hotkey: crate::DEFAULT_HOTKEY.to_string(),
            connect_attempts: 3,
            connect_backoff: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            subtensor_pallet_index: 7,
            add_stake_call_index: 2,
            remove_stake_call_index: 3,
            metadata_hash_extension: true,
        }
    }
}

impl ChainConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let network = env_string("NETWORK").unwrap_or(defaults.network);
        let endpoint = env_string("BLOCKCHAIN_ENDPOINT")
            .unwrap_or_else(|| endpoint_for_network(&network).to_string());

        Self {
            endpoint,
            network,
            wallet_mnemonic: env_string("WALLET_MNEMONIC"),
            default_netuid: env_parse("NETUID", defaults.default_netuid),
            default_hotkey: env_string("HOTKEY").unwrap_or(defaults.default_hotkey),
            connect_attempts: env_parse("CHAIN_CONNECT_ATTEMPTS", defaults.connect_attempts).max(1),
            connect_backoff: Duration::from_millis(env_parse(
                "CHAIN_CONNECT_BACKOFF_MS",
                defaults.connect_backoff.as_millis() as u64,
            )),
            request_timeout: Duration::from_secs(env_parse(
                "CHAIN_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            subtensor_pallet_index: env_parse(
                "SUBTENSOR_PALLET_INDEX",
                defaults.subtensor_pallet_index,
            ),
            add_stake_call_index: env_parse("ADD_STAKE_CALL_INDEX", defaults.add_stake_call_index),
            remove_stake_call_index: env_parse(
                "REMOVE_STAKE_CALL_INDEX",
                defaults.remove_stake_call_index,
            ),
            metadata_hash_extension: env_parse(
                "CHAIN_METADATA_HASH_EXTENSION",
                defaults.metadata_hash_extension,
            ),
        }
    }
}

/// Map a network name to its public RPC endpoint
pub fn endpoint_for_network(network: &str) -> &'static str {
    match network.to_ascii_lowercase().as_str() {
        "finney" | "main" | "mainnet" => "https://entrypoint-finney.opentensor.ai:443",
        "local" => "http://127.0.0.1:9944",
        _ => "https://test.finney.opentensor.ai:443",
    }
}

// ============================================================================
// CACHE
// ============================================================================

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// How long a dividend value stays cached
    pub dividend_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379/0".to_string(),
            dividend_ttl: Duration::from_secs(120),
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: redis_url_from_env().unwrap_or(defaults.redis_url),
            dividend_ttl: Duration::from_secs(env_parse(
                "DIVIDEND_CACHE_TTL_SECS",
                defaults.dividend_ttl.as_secs(),
            )),
        }
    }
}

fn redis_url_from_env() -> Option<String> {
    if let Some(url) = env_string("REDIS_URL") {
        return Some(url);
    }
    let host = env_string("REDIS_HOST")?;
    let port: u16 = env_parse("REDIS_PORT", 6379);
    Some(format!("redis://{}:{}/0", host, port))
}

// ============================================================================
// QUEUE
// ============================================================================

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis connection URL (shared with the cache unless overridden)
    pub redis_url: String,
    /// Name of the ready list
    pub queue_name: String,
    /// Jobs not started within this window are dropped
    pub job_expires: Duration,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Delay before the first retry (doubled for each further retry)
    pub retry_backoff: Duration,
    /// How long job records stay queryable
    pub result_ttl: Duration,
    /// Number of concurrent job loops in a worker process
    pub worker_concurrency: usize,
    /// How long a dequeue blocks before re-checking delayed jobs
    pub poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379/0".to_string(),
            queue_name: "stake_operations".to_string(),
            job_expires: Duration::from_secs(60),
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
            result_ttl: Duration::from_secs(24 * 3600),
            worker_concurrency: 4,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env_string("QUEUE_REDIS_URL")
                .or_else(redis_url_from_env)
                .unwrap_or(defaults.redis_url),
            queue_name: env_string("QUEUE_NAME").unwrap_or(defaults.queue_name),
            job_expires: Duration::from_secs(env_parse(
                "JOB_EXPIRES_SECS",
                defaults.job_expires.as_secs(),
            )),
            max_retries: env_parse("JOB_MAX_RETRIES", defaults.max_retries),
            retry_backoff: Duration::from_millis(env_parse(
                "JOB_RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )),
            result_ttl: Duration::from_secs(env_parse(
                "JOB_RESULT_TTL_SECS",
                defaults.result_ttl.as_secs(),
            )),
            worker_concurrency: env_parse("WORKER_CONCURRENCY", defaults.worker_concurrency)
                .max(1),
            poll_interval: defaults.poll_interval,
        }
    }

    /// Delay before retry number `attempt + 1`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

// ============================================================================
// SENTIMENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct SentimentConfig {
    /// Tweet search endpoint
    pub search_url: String,
    /// Tweet search API key
    pub search_api_key: String,
    /// Sentiment model endpoint
    pub sentiment_url: String,
    /// Sentiment model API key
    pub sentiment_api_key: String,
    /// Tweets requested per search
    pub tweet_limit: u32,
    /// TAO staked per point of absolute sentiment
    pub stake_per_point: f64,
    /// Outbound HTTP timeout
    pub timeout: Duration,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            search_url: "https://api.datura.ai/api/twitter/search".to_string(),
            search_api_key: String::new(),
            sentiment_url:
                "https://api.chutes.ai/api/v1/chute/20acffc0-0c5f-58e3-97af-21fc0b261ec4/predict"
                    .to_string(),
            sentiment_api_key: String::new(),
            tweet_limit: 20,
            stake_per_point: 0.01,
            timeout: Duration::from_secs(30),
        }
    }
}

impl SentimentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            search_url: env_string("DATURA_URL").unwrap_or(defaults.search_url),
            search_api_key: env_string("DATURA_APIKEY").unwrap_or_default(),
            sentiment_url: env_string("CHUTES_URL").unwrap_or(defaults.sentiment_url),
            sentiment_api_key: env_string("CHUTES_API_KEY").unwrap_or_default(),
            tweet_limit: env_parse("TWEET_LIMIT", defaults.tweet_limit),
            stake_per_point: env_parse("STAKE_PER_SENTIMENT_POINT", defaults.stake_per_point),
            timeout: Duration::from_secs(env_parse(
                "SENTIMENT_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )),
        }
    }
}

// ============================================================================
// AUTH
// ============================================================================

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Accepted static bearer tokens, in configuration order
    pub static_tokens: Vec<String>,
    /// HS256 signing secret; empty when not configured
    pub jwt_secret: String,
    /// JWTs are issued and accepted only when true
    pub jwt_secret_configured: bool,
    /// Lifetime of minted access tokens
    pub access_token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            static_tokens: vec!["datura".to_string()],
            jwt_secret: String::new(),
            jwt_secret_configured: false,
            access_token_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let static_tokens = env_string("API_TOKEN")
            .map(|raw| parse_token_list(&raw))
            .unwrap_or(defaults.static_tokens);
        let secret = env_string("JWT_SECRET_KEY");
        if secret.is_none() {
            warn!("JWT_SECRET_KEY not set, JWT issuance disabled and only static tokens are accepted");
        }

        Self {
            static_tokens,
            jwt_secret_configured: secret.is_some(),
            jwt_secret: secret.unwrap_or(defaults.jwt_secret),
            access_token_ttl: Duration::from_secs(
                env_parse::<u64>(
                    "ACCESS_TOKEN_EXPIRE_MINUTES",
                    defaults.access_token_ttl.as_secs() / 60,
                )
                .saturating_mul(60),
            ),
        }
    }
}

/// Split a comma-separated token list, dropping blanks
pub fn parse_token_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// DATABASE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; history logging is disabled when absent
    pub url: Option<String>,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: env_string("DATABASE_URL"),
        }
    }
}

// ============================================================================
// ENV HELPERS
// ============================================================================

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env_string(key) {
        Some(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                warn!("Ignoring invalid value for {}: {:?}", key, raw);
                default
            }
        },
        None => default,
    }
}
