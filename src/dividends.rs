//! Dividend lookups
//!
//! Cache first, then the chain, then a simulated value. A lookup never fails.

use crate::cache::{dividend_cache_key, DividendCache};
use crate::chain::{rao_to_tao, ChainConnection, ChainError};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Range of simulated dividend values, in TAO
const SIMULATED_MIN: f64 = 0.01;
const SIMULATED_MAX: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DividendSource {
    Cache,
    Chain,
    Simulated,
}

impl DividendSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DividendSource::Cache => "cache",
            DividendSource::Chain => "chain",
            DividendSource::Simulated => "simulated",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cache" => Some(DividendSource::Cache),
            "chain" => Some(DividendSource::Chain),
            "simulated" => Some(DividendSource::Simulated),
            _ => None,
        }
    }
}

/// Result of a dividend lookup
#[derive(Debug, Clone, Serialize)]
pub struct DividendQuery {
    pub netuid: u16,
    pub hotkey: String,
    /// TAO
    pub dividend: f64,
    pub timestamp: DateTime<Utc>,
    pub source: DividendSource,
}

pub struct DividendService {
    cache: Arc<dyn DividendCache>,
    chain: Arc<ChainConnection>,
    ttl: Duration,
}

impl DividendService {
    pub fn new(cache: Arc<dyn DividendCache>, chain: Arc<ChainConnection>, ttl: Duration) -> Self {
        Self { cache, chain, ttl }
    }

    pub async fn get_tao_dividends(&self, netuid: u16, hotkey: &str) -> DividendQuery {
        let key = dividend_cache_key(netuid, hotkey);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match parse_cached(&raw) {
                Some(dividend) => {
                    debug!("Cache hit for {}", key);
                    return self.query(netuid, hotkey, dividend, DividendSource::Cache);
                }
                None => warn!("Ignoring invalid cached dividend for {}: {:?}", key, raw),
            },
            Ok(None) => debug!("Cache miss for {}", key),
            Err(e) => warn!("Cache lookup failed for {}: {}", key, e),
        }

        match self.query_chain(netuid, hotkey).await {
            Ok(dividend) => {
                if let Err(e) = self.cache.set(&key, &dividend.to_string(), self.ttl).await {
                    warn!("Failed to cache dividend for {}: {}", key, e);
                }
                info!(netuid, hotkey, dividend, "Dividend fetched from chain");
                return self.query(netuid, hotkey, dividend, DividendSource::Chain);
            }
            Err(e) => warn!("Chain query failed, returning simulated dividend: {}", e),
        }

        let dividend = simulated_dividend(&mut rand::thread_rng());
        self.query(netuid, hotkey, dividend, DividendSource::Simulated)
    }

    async fn query_chain(&self, netuid: u16, hotkey: &str) -> Result<f64, ChainError> {
        let client = self.chain.get().await?;
        let rao = client.tao_dividends(netuid, hotkey).await?;
        Ok(rao_to_tao(rao))
    }

    fn query(
        &self,
        netuid: u16,
        hotkey: &str,
        dividend: f64,
        source: DividendSource,
    ) -> DividendQuery {
        DividendQuery {
            netuid,
            hotkey: hotkey.to_string(),
            dividend,
            timestamp: Utc::now(),
            source,
        }
    }
}

/// Parse a cached value; negative, non-finite or malformed values are rejected
pub fn parse_cached(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Uniform draw from the simulated range, rounded to 4 decimals
pub fn simulated_dividend<R: Rng>(rng: &mut R) -> f64 {
    let value: f64 = rng.gen_range(SIMULATED_MIN..=SIMULATED_MAX);
    (value * 10_000.0).round() / 10_000.0
}
