//! Stake and unstake operations

use crate::chain::{tao_to_rao, ChainConnection, ChainError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const SKIP_NON_POSITIVE: &str = "Amount is zero or negative";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeOperation {
    Stake,
    Unstake,
}

impl fmt::Display for StakeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StakeOperation::Stake => f.write_str("stake"),
            StakeOperation::Unstake => f.write_str("unstake"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeStatus {
    Success,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeOperationResult {
    pub status: StakeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub operation: StakeOperation,
    /// TAO
    pub amount: f64,
}

#[derive(Debug, Error)]
pub enum StakeError {
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Submits stake calls through the shared chain connection
pub struct Staker {
    chain: Arc<ChainConnection>,
}

impl Staker {
    pub fn new(chain: Arc<ChainConnection>) -> Self {
        Self { chain }
    }

    pub async fn add_stake(
        &self,
        amount: f64,
        netuid: u16,
        hotkey: &str,
    ) -> Result<StakeOperationResult, StakeError> {
        self.submit(StakeOperation::Stake, amount, netuid, hotkey)
            .await
    }

    pub async fn unstake(
        &self,
        amount: f64,
        netuid: u16,
        hotkey: &str,
    ) -> Result<StakeOperationResult, StakeError> {
        self.submit(StakeOperation::Unstake, amount, netuid, hotkey)
            .await
    }

    async fn submit(
        &self,
        operation: StakeOperation,
        amount: f64,
        netuid: u16,
        hotkey: &str,
    ) -> Result<StakeOperationResult, StakeError> {
        if !amount.is_finite() || amount <= 0.0 {
            warn!("Skipping {} of {} TAO: {}", operation, amount, SKIP_NON_POSITIVE);
            return Ok(StakeOperationResult {
                status: StakeStatus::Skipped,
                tx_hash: None,
                reason: Some(SKIP_NON_POSITIVE.to_string()),
                operation,
                amount,
            });
        }

        let rao = tao_to_rao(amount);
        let client = self.chain.get().await?;
        let tx_hash = match operation {
            StakeOperation::Stake => client.add_stake(hotkey, netuid, rao).await?,
            StakeOperation::Unstake => client.remove_stake(hotkey, netuid, rao).await?,
        };

        info!(
            netuid,
            hotkey,
            amount,
            "{} submitted: {}",
            operation,
            tx_hash
        );

        Ok(StakeOperationResult {
            status: StakeStatus::Success,
            tx_hash: Some(tx_hash),
            reason: None,
            operation,
            amount,
        })
    }
}
