//! Subtensor chain access
//!
//! - `rpc`: Substrate JSON-RPC 2.0 over HTTP
//! - `storage`: storage keys and value decoding for dividend lookups
//! - `extrinsic`: SCALE encoding and signing of stake calls
//! - `wallet`: sr25519 coldkey signer
//! - `client`: the `ChainClient` seam and its RPC-backed implementation
//! - `connection`: lazily connected client singleton with retry/backoff

mod client;
mod connection;
pub mod extrinsic;
mod rpc;
pub mod storage;
mod wallet;

pub use client::{ChainClient, SubtensorClient};
pub use connection::{ChainConnection, Connector};
pub use rpc::{RpcClient, RuntimeVersion};
pub use wallet::Wallet;

use thiserror::Error;

/// 1 TAO = 1e9 rao
pub const RAO_PER_TAO: u64 = 1_000_000_000;

/// Convert a rao amount to TAO
pub fn rao_to_tao(rao: u64) -> f64 {
    rao as f64 / RAO_PER_TAO as f64
}

/// Convert a TAO amount to rao, rounding to the nearest unit
pub fn tao_to_rao(tao: f64) -> u64 {
    (tao * RAO_PER_TAO as f64).round() as u64
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Failed to decode chain response: {0}")]
    Decode(String),
    #[error("Invalid hotkey: {0}")]
    InvalidHotkey(String),
    #[error("No wallet configured for signing")]
    NoWallet,
    #[error("Invalid wallet secret: {0}")]
    InvalidWallet(String),
    #[error("Chain client unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        assert_eq!(rao_to_tao(1_500_000_000), 1.5);
        assert_eq!(rao_to_tao(0), 0.0);
        assert_eq!(tao_to_rao(0.25), 250_000_000);
        assert_eq!(tao_to_rao(0.0000000004), 0);
        assert_eq!(tao_to_rao(0.0000000006), 1);
    }
}
