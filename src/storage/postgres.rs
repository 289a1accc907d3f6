//! PostgreSQL history store

use super::{DividendHistory, HistoryFilter, HistoryStore, NewDividendHistory, StorageError};
use crate::dividends::DividendSource;
use crate::staking::StakeOperation;
use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info, warn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS dividend_history (
    id BIGSERIAL PRIMARY KEY,
    netuid INTEGER NOT NULL,
    hotkey TEXT NOT NULL,
    dividend DOUBLE PRECISION NOT NULL CHECK (dividend >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    stake_operation TEXT CHECK (stake_operation IN ('stake', 'unstake')),
    stake_amount DOUBLE PRECISION,
    sentiment_score INTEGER
);

ALTER TABLE dividend_history ADD COLUMN IF NOT EXISTS source TEXT NOT NULL DEFAULT 'chain'
    CHECK (source IN ('cache', 'chain', 'simulated'));

CREATE INDEX IF NOT EXISTS idx_dividend_history_subnet ON dividend_history(netuid, hotkey);
CREATE INDEX IF NOT EXISTS idx_dividend_history_created ON dividend_history(created_at DESC);

CREATE OR REPLACE FUNCTION dividend_history_reject_mutation() RETURNS trigger AS $$
BEGIN
    RAISE EXCEPTION 'dividend_history is append-only';
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS dividend_history_append_only ON dividend_history;
CREATE TRIGGER dividend_history_append_only
    BEFORE UPDATE OR DELETE ON dividend_history
    FOR EACH ROW EXECUTE FUNCTION dividend_history_reject_mutation();
"#;

/// Serializes schema setup across processes starting at the same time
const SCHEMA_LOCK_KEY: i64 = 0x7461_6f5f_6469_76;

const SELECT_COLUMNS: &str = "id, netuid, hotkey, dividend, created_at, stake_operation, \
     stake_amount, sentiment_score, source";

#[derive(Clone)]
pub struct PgHistoryStore {
    pool: Pool,
}

impl PgHistoryStore {
    /// Connect and create the schema
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let mut config = Config::new();
        config.url = Some(database_url.to_string());
        let pool = config.create_pool(Some(Runtime::Tokio1), NoTls)?;

        let mut client = pool.get().await?;
        info!("Connected to PostgreSQL database");

        let tx = client.transaction().await?;
        tx.execute("SELECT pg_advisory_xact_lock($1)", &[&SCHEMA_LOCK_KEY])
            .await?;
        tx.batch_execute(SCHEMA).await?;
        tx.commit().await?;
        info!("Dividend history schema initialized");

        Ok(Self { pool })
    }
}

fn operation_to_str(op: StakeOperation) -> &'static str {
    match op {
        StakeOperation::Stake => "stake",
        StakeOperation::Unstake => "unstake",
    }
}

fn operation_from_str(raw: &str) -> Option<StakeOperation> {
    match raw {
        "stake" => Some(StakeOperation::Stake),
        "unstake" => Some(StakeOperation::Unstake),
        _ => None,
    }
}

fn row_to_history(row: &Row) -> Result<DividendHistory, StorageError> {
    let netuid: i32 = row.get(1);
    let stake_operation: Option<String> = row.get(5);
    let source: String = row.get(8);
    Ok(DividendHistory {
        id: row.get(0),
        netuid: u16::try_from(netuid)
            .map_err(|_| StorageError::InvalidRecord(format!("netuid out of range: {}", netuid)))?,
        hotkey: row.get(2),
        dividend: row.get(3),
        created_at: row.get(4),
        stake_operation: stake_operation.as_deref().and_then(|op| {
            let parsed = operation_from_str(op);
            if parsed.is_none() {
                warn!("Unknown stake operation in history: {}", op);
            }
            parsed
        }),
        stake_amount: row.get(6),
        sentiment_score: row.get(7),
        source: DividendSource::parse(&source)
            .ok_or_else(|| StorageError::InvalidRecord(format!("unknown source: {}", source)))?,
    })
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn append(&self, record: NewDividendHistory) -> Result<DividendHistory, StorageError> {
        record.validate()?;
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO dividend_history (netuid, hotkey, dividend, stake_operation, stake_amount, sentiment_score, source)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     RETURNING {}",
                    SELECT_COLUMNS
                ),
                &[
                    &(record.netuid as i32),
                    &record.hotkey,
                    &record.dividend,
                    &record.stake_operation.map(operation_to_str),
                    &record.stake_amount,
                    &record.sentiment_score,
                    &record.source.as_str(),
                ],
            )
            .await?;

        let stored = row_to_history(&row)?;
        debug!(
            "Appended history row {} for {}:{}",
            stored.id, stored.netuid, stored.hotkey
        );
        Ok(stored)
    }

    async fn recent(&self, filter: &HistoryFilter) -> Result<Vec<DividendHistory>, StorageError> {
        let client = self.pool.get().await?;
        let netuid = filter.netuid.map(i32::from);
        let limit = filter.effective_limit() as i64;
        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM dividend_history
                     WHERE ($1::INTEGER IS NULL OR netuid = $1)
                       AND ($2::TEXT IS NULL OR hotkey = $2)
                     ORDER BY created_at DESC, id DESC
                     LIMIT $3",
                    SELECT_COLUMNS
                ),
                &[&netuid, &filter.hotkey, &limit],
            )
            .await?;

        rows.iter().map(row_to_history).collect()
    }
}
