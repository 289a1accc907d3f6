use super::{DividendHistory, HistoryFilter, HistoryStore, NewDividendHistory, StorageError};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

/// In-process history log
#[derive(Default)]
pub struct MemoryHistoryStore {
    rows: Mutex<Vec<DividendHistory>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: NewDividendHistory) -> Result<DividendHistory, StorageError> {
        record.validate()?;
        let mut rows = self.rows.lock();
        let row = DividendHistory {
            id: rows.len() as i64 + 1,
            netuid: record.netuid,
            hotkey: record.hotkey,
            dividend: record.dividend,
            source: record.source,
            created_at: Utc::now(),
            stake_operation: record.stake_operation,
            stake_amount: record.stake_amount,
            sentiment_score: record.sentiment_score,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn recent(&self, filter: &HistoryFilter) -> Result<Vec<DividendHistory>, StorageError> {
        let rows = self.rows.lock();
        Ok(rows
            .iter()
            .rev()
            .filter(|row| filter.matches(row))
            .take(filter.effective_limit())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dividends::DividendSource;
    use crate::staking::StakeOperation;

    const CHAIN: DividendSource = DividendSource::Chain;

    #[tokio::test]
    async fn test_append_assigns_ids() {
        let store = MemoryHistoryStore::new();
        let first = store
            .append(NewDividendHistory::lookup(18, "a", 0.1, CHAIN))
            .await
            .unwrap();
        let second = store
            .append(NewDividendHistory::lookup(18, "b", 0.2, CHAIN).with_stake(StakeOperation::Stake, 0.3))
            .await
            .unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(second.stake_operation, Some(StakeOperation::Stake));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_recent_filters_newest_first() {
        let store = MemoryHistoryStore::new();
        for (netuid, hotkey) in [(1, "a"), (2, "a"), (1, "b"), (1, "a")] {
            store
                .append(NewDividendHistory::lookup(netuid, hotkey, 0.01, CHAIN))
                .await
                .unwrap();
        }

        let all = store.recent(&HistoryFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![4, 3, 2, 1]);

        let filter = HistoryFilter {
            netuid: Some(1),
            hotkey: Some("a".to_string()),
            limit: None,
        };
        let rows = store.recent(&filter).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![4, 1]);

        let limited = HistoryFilter {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(store.recent(&limited).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_rows_rejected() {
        let store = MemoryHistoryStore::new();
        assert!(matches!(
            store.append(NewDividendHistory::lookup(1, "a", -1.0, CHAIN)).await,
            Err(StorageError::InvalidRecord(_))
        ));
        assert!(store.is_empty());
    }
}
