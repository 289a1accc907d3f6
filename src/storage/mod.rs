//! Dividend history persistence
//!
//! An append-only audit log of dividend lookups and the stake operations
//! they triggered. Stores expose no update or delete.

mod memory;
mod postgres;

pub use memory::MemoryHistoryStore;
pub use postgres::PgHistoryStore;

use crate::dividends::{DividendQuery, DividendSource};
use crate::staking::StakeOperation;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create connection pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),
    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("Invalid history record: {0}")]
    InvalidRecord(String),
}

/// Persisted history row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendHistory {
    pub id: i64,
    pub netuid: u16,
    pub hotkey: String,
    pub dividend: f64,
    /// Where the dividend came from; simulated values are not chain data
    pub source: DividendSource,
    pub created_at: DateTime<Utc>,
    pub stake_operation: Option<StakeOperation>,
    pub stake_amount: Option<f64>,
    pub sentiment_score: Option<i32>,
}

/// Row to append; id and timestamp are assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewDividendHistory {
    pub netuid: u16,
    pub hotkey: String,
    pub dividend: f64,
    pub source: DividendSource,
    pub stake_operation: Option<StakeOperation>,
    pub stake_amount: Option<f64>,
    pub sentiment_score: Option<i32>,
}

impl NewDividendHistory {
    /// A plain dividend lookup
    pub fn lookup(netuid: u16, hotkey: &str, dividend: f64, source: DividendSource) -> Self {
        Self {
            netuid,
            hotkey: hotkey.to_string(),
            dividend,
            source,
            stake_operation: None,
            stake_amount: None,
            sentiment_score: None,
        }
    }

    pub fn from_query(query: &DividendQuery) -> Self {
        Self::lookup(query.netuid, &query.hotkey, query.dividend, query.source)
    }

    pub fn with_sentiment(mut self, score: i32) -> Self {
        self.sentiment_score = Some(score);
        self
    }

    pub fn with_stake(mut self, operation: StakeOperation, amount: f64) -> Self {
        self.stake_operation = Some(operation);
        self.stake_amount = Some(amount);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), StorageError> {
        if !self.dividend.is_finite() || self.dividend < 0.0 {
            return Err(StorageError::InvalidRecord(format!(
                "dividend must be a non-negative number, got {}",
                self.dividend
            )));
        }
        if self.hotkey.is_empty() {
            return Err(StorageError::InvalidRecord("hotkey is empty".to_string()));
        }
        Ok(())
    }
}

/// Query parameters for `recent`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryFilter {
    pub netuid: Option<u16>,
    pub hotkey: Option<String>,
    pub limit: Option<usize>,
}

impl HistoryFilter {
    pub const DEFAULT_LIMIT: usize = 100;
    pub const MAX_LIMIT: usize = 1000;

    /// Requested limit clamped to `1..=1000`
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub(crate) fn matches(&self, row: &DividendHistory) -> bool {
        self.netuid.map_or(true, |n| n == row.netuid)
            && self.hotkey.as_deref().map_or(true, |h| h == row.hotkey)
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: NewDividendHistory) -> Result<DividendHistory, StorageError>;

    /// Newest first
    async fn recent(&self, filter: &HistoryFilter) -> Result<Vec<DividendHistory>, StorageError>;
}
