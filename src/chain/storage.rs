//! Storage keys and values for `SubtensorModule` lookups

use super::ChainError;
use crate::crypto::ss58::AccountBytes;
use parity_scale_codec::{Decode, Encode};
use sp_core::hashing::{blake2_128, twox_128};

pub const SUBTENSOR_PALLET: &str = "SubtensorModule";
pub const TAO_DIVIDENDS_ITEM: &str = "TaoDividendsPerSubnet";

/// `twox128(pallet) ++ twox128(item)`
pub fn storage_prefix(pallet: &str, item: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(&twox_128(pallet.as_bytes()));
    key.extend_from_slice(&twox_128(item.as_bytes()));
    key
}

/// Key of `TaoDividendsPerSubnet(netuid, hotkey)`
///
/// The map is keyed by `Identity(u16)` then `Blake2_128Concat(AccountId)`.
pub fn tao_dividends_key(netuid: u16, hotkey: &AccountBytes) -> Vec<u8> {
    let mut key = storage_prefix(SUBTENSOR_PALLET, TAO_DIVIDENDS_ITEM);
    key.extend_from_slice(&netuid.encode());
    key.extend_from_slice(&blake2_128(hotkey));
    key.extend_from_slice(hotkey);
    key
}

/// Decode a `u64` storage value; absent values are the default 0
pub fn decode_u64(raw: Option<&[u8]>) -> Result<u64, ChainError> {
    match raw {
        None => Ok(0),
        Some(mut bytes) => {
            u64::decode(&mut bytes).map_err(|e| ChainError::Decode(e.to_string()))
        }
    }
}
