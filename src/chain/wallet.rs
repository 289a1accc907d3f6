//! Coldkey signer

use super::ChainError;
use crate::crypto::ss58::AccountBytes;
use sp_core::crypto::Ss58Codec;
use sp_core::{sr25519, Pair};

/// sr25519 keypair used to sign stake extrinsics
pub struct Wallet {
    pair: sr25519::Pair,
    account: AccountBytes,
}

impl Wallet {
    /// Build from a secret URI (`//Alice`, `<mnemonic>//hard/soft`, hex seed)
    pub fn from_uri(uri: &str) -> Result<Self, ChainError> {
        let pair = sr25519::Pair::from_string(uri.trim(), None)
            .map_err(|e| ChainError::InvalidWallet(format!("{:?}", e)))?;
        Self::from_pair(pair)
    }

    fn from_pair(pair: sr25519::Pair) -> Result<Self, ChainError> {
        let public = pair.public();
        let raw: &[u8] = public.as_ref();
        let account = raw
            .try_into()
            .map_err(|_| ChainError::InvalidWallet("unexpected public key length".to_string()))?;
        Ok(Self { pair, account })
    }

    pub fn account(&self) -> &AccountBytes {
        &self.account
    }

    /// SS58 address of the coldkey
    pub fn address(&self) -> String {
        self.pair.public().to_ss58check()
    }

    /// Sign `payload`, returning the 64-byte signature
    pub fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let signature = self.pair.sign(payload);
        let raw: &[u8] = signature.as_ref();
        raw.to_vec()
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV_PHRASE: &str =
        "bottom drive obey lake curtain smoke basket hold race lonely fit walk";
    const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

    #[test]
    fn test_dev_uri() {
        let wallet = Wallet::from_uri("//Alice").unwrap();
        assert_eq!(wallet.address(), ALICE);
        assert_eq!(
            hex::encode(wallet.account()),
            "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d"
        );
    }

    #[test]
    fn test_mnemonic_with_path_matches_dev_uri() {
        let derived = Wallet::from_uri(&format!("{}//Alice", DEV_PHRASE)).unwrap();
        assert_eq!(derived.address(), ALICE);

        let root = Wallet::from_uri(DEV_PHRASE).unwrap();
        assert_ne!(root.address(), ALICE);
    }

    #[test]
    fn test_invalid_mnemonic() {
        assert!(matches!(
            Wallet::from_uri("not a real phrase"),
            Err(ChainError::InvalidWallet(_))
        ));
    }

    #[test]
    fn test_signature_verifies() {
        let wallet = Wallet::from_uri("//Bob").unwrap();
        let signature = wallet.sign(b"payload");
        assert_eq!(signature.len(), 64);

        let raw: [u8; 64] = signature.try_into().unwrap();
        let public = sr25519::Public::from_raw(*wallet.account());
        assert!(sr25519::Pair::verify(
            &sr25519::Signature::from_raw(raw),
            b"payload",
            &public
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let wallet = Wallet::from_uri("//Alice").unwrap();
        let debug = format!("{:?}", wallet);
        assert!(debug.contains(ALICE));
    }
}
