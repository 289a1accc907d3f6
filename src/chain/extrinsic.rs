//! Signed extrinsic construction for stake calls
//!
//! Layout of a v4 signed extrinsic:
//!
//! ```text
//! Compact(len) ++ 0x84 ++ MultiAddress::Id(signer) ++ MultiSignature::Sr25519(sig) ++ extra ++ call
//! ```
//!
//! The signed payload is `call ++ extra ++ additional`, replaced by its
//! blake2-256 hash when longer than 256 bytes.

use crate::crypto::ss58::AccountBytes;
use parity_scale_codec::{Compact, Encode};
use sp_core::hashing::blake2_256;

const EXTRINSIC_VERSION_SIGNED: u8 = 0x84;
const MULTI_ADDRESS_ID: u8 = 0x00;
const MULTI_SIGNATURE_SR25519: u8 = 0x01;
const IMMORTAL_ERA: u8 = 0x00;
const METADATA_HASH_DISABLED: u8 = 0x00;
const MAX_UNHASHED_PAYLOAD: usize = 256;

/// Chain parameters that go into the signed payload
#[derive(Debug, Clone)]
pub struct SigningContext {
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: [u8; 32],
    pub metadata_hash_extension: bool,
}

/// `SubtensorModule::{add_stake, remove_stake}(hotkey, netuid, amount)`
pub fn encode_stake_call(
    pallet_index: u8,
    call_index: u8,
    hotkey: &AccountBytes,
    netuid: u16,
    amount_rao: u64,
) -> Vec<u8> {
    let mut call = vec![pallet_index, call_index];
    hotkey.encode_to(&mut call);
    netuid.encode_to(&mut call);
    amount_rao.encode_to(&mut call);
    call
}

/// Signed-extension data carried inside the extrinsic
pub fn encode_extra(nonce: u64, tip: u128, metadata_hash_extension: bool) -> Vec<u8> {
    let mut extra = vec![IMMORTAL_ERA];
    Compact(nonce).encode_to(&mut extra);
    Compact(tip).encode_to(&mut extra);
    if metadata_hash_extension {
        extra.push(METADATA_HASH_DISABLED);
    }
    extra
}

/// Signed-extension data that is signed but not transmitted
pub fn encode_additional(ctx: &SigningContext) -> Vec<u8> {
    let mut additional = Vec::with_capacity(74);
    ctx.spec_version.encode_to(&mut additional);
    ctx.transaction_version.encode_to(&mut additional);
    additional.extend_from_slice(&ctx.genesis_hash);
    // immortal era checkpoint is the genesis block
    additional.extend_from_slice(&ctx.genesis_hash);
    if ctx.metadata_hash_extension {
        None::<[u8; 32]>.encode_to(&mut additional);
    }
    additional
}

/// Bytes the signer signs
pub fn signing_payload(call: &[u8], extra: &[u8], additional: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(call.len() + extra.len() + additional.len());
    payload.extend_from_slice(call);
    payload.extend_from_slice(extra);
    payload.extend_from_slice(additional);
    if payload.len() > MAX_UNHASHED_PAYLOAD {
        blake2_256(&payload).to_vec()
    } else {
        payload
    }
}

/// Assemble the length-prefixed signed extrinsic
pub fn assemble_signed(
    signer: &AccountBytes,
    signature: &[u8],
    extra: &[u8],
    call: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(3 + 32 + signature.len() + extra.len() + call.len());
    body.push(EXTRINSIC_VERSION_SIGNED);
    body.push(MULTI_ADDRESS_ID);
    body.extend_from_slice(signer);
    body.push(MULTI_SIGNATURE_SR25519);
    body.extend_from_slice(signature);
    body.extend_from_slice(extra);
    body.extend_from_slice(call);

    let mut extrinsic = Compact(body.len() as u32).encode();
    extrinsic.extend_from_slice(&body);
    extrinsic
}
