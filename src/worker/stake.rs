//! Sentiment-driven stake decision for one job

use super::queue::StakeJob;
use super::runner::JobProcessor;
use crate::dividends::DividendService;
use crate::sentiment::SentimentSource;
use crate::staking::{StakeError, StakeOperation, StakeStatus, Staker};
use crate::storage::{HistoryStore, NewDividendHistory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Neutral,
    Success,
    Skipped,
}

/// Result stored on a completed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeJobOutcome {
    pub status: OutcomeStatus,
    pub sentiment_score: i32,
    pub tweet_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<StakeOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub message: String,
}

pub struct StakeProcessor {
    sentiment: Arc<dyn SentimentSource>,
    staker: Staker,
    dividends: Arc<DividendService>,
    history: Option<Arc<dyn HistoryStore>>,
    /// TAO per point of absolute sentiment
    stake_per_point: f64,
}

impl StakeProcessor {
    pub fn new(
        sentiment: Arc<dyn SentimentSource>,
        staker: Staker,
        dividends: Arc<DividendService>,
        history: Option<Arc<dyn HistoryStore>>,
        stake_per_point: f64,
    ) -> Self {
        Self {
            sentiment,
            staker,
            dividends,
            history,
            stake_per_point,
        }
    }

    /// Sentiment in, stake or unstake out
    pub async fn process(&self, job: &StakeJob) -> Result<StakeJobOutcome, StakeError> {
        let report = self.sentiment.analyze_subnet(job.netuid).await;
        info!(
            job = %job.id,
            netuid = job.netuid,
            score = report.score,
            tweets = report.tweet_count,
            "Sentiment for stake job"
        );

        if report.score == 0 {
            self.log_history(job, report.score, None).await;
            return Ok(StakeJobOutcome {
                status: OutcomeStatus::Neutral,
                sentiment_score: 0,
                tweet_count: report.tweet_count,
                operation: None,
                amount: None,
                tx_hash: None,
                message: "Neutral sentiment. No stake operation performed.".to_string(),
            });
        }

        let amount = report.score.unsigned_abs() as f64 * self.stake_per_point;
        let result = if report.score > 0 {
            self.staker.add_stake(amount, job.netuid, &job.hotkey).await?
        } else {
            self.staker.unstake(amount, job.netuid, &job.hotkey).await?
        };

        let (status, message) = match result.status {
            StakeStatus::Success => {
                self.log_history(job, report.score, Some((result.operation, amount)))
                    .await;
                (
                    OutcomeStatus::Success,
                    format!("{} of {} TAO submitted", result.operation, amount),
                )
            }
            StakeStatus::Skipped => (
                OutcomeStatus::Skipped,
                result.reason.clone().unwrap_or_default(),
            ),
        };

        Ok(StakeJobOutcome {
            status,
            sentiment_score: report.score,
            tweet_count: report.tweet_count,
            operation: Some(result.operation),
            amount: Some(amount),
            tx_hash: result.tx_hash,
            message,
        })
    }

    async fn log_history(&self, job: &StakeJob, score: i32, stake: Option<(StakeOperation, f64)>) {
        let Some(history) = &self.history else {
            return;
        };
        let query = self
            .dividends
            .get_tao_dividends(job.netuid, &job.hotkey)
            .await;

        let mut row = NewDividendHistory::from_query(&query).with_sentiment(score);
        if let Some((operation, amount)) = stake {
            row = row.with_stake(operation, amount);
        }
        if let Err(e) = history.append(row).await {
            warn!("Failed to record stake history for job {}: {}", job.id, e);
        }
    }
}

#[async_trait]
impl JobProcessor for StakeProcessor {
    async fn process(&self, job: &StakeJob) -> Result<StakeJobOutcome, StakeError> {
        StakeProcessor::process(self, job).await
    }
}
