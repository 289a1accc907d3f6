//! SS58 address helpers

use sp_core::crypto::Ss58Codec;
use sp_core::sr25519::Public;

/// Raw 32-byte account id
pub type AccountBytes = [u8; 32];

/// Check if a string is a valid SS58-encoded sr25519 public key
pub fn is_valid_ss58_hotkey(hotkey: &str) -> bool {
    if hotkey.len() < 40 || hotkey.len() > 60 {
        return false;
    }
    Public::from_ss58check(hotkey).is_ok()
}

/// Decode an SS58 address into its 32 raw bytes
pub fn decode_account(address: &str) -> Option<AccountBytes> {
    let public = Public::from_ss58check(address).ok()?;
    let bytes: &[u8] = public.as_ref();
    bytes.try_into().ok()
}
