use super::extrinsic::{self, SigningContext};
use super::storage;
use super::{ChainError, RpcClient, Wallet};
use crate::config::ChainConfig;
use crate::crypto::ss58::{decode_account, AccountBytes};
use async_trait::async_trait;
use tracing::{info, warn};

/// Chain operations used by the service
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// `TaoDividendsPerSubnet(netuid, hotkey)` in rao
    async fn tao_dividends(&self, netuid: u16, hotkey: &str) -> Result<u64, ChainError>;

    /// Submit `add_stake`; returns the transaction hash
    async fn add_stake(&self, hotkey: &str, netuid: u16, amount_rao: u64)
        -> Result<String, ChainError>;

    /// Submit `remove_stake`; returns the transaction hash
    async fn remove_stake(
        &self,
        hotkey: &str,
        netuid: u16,
        amount_rao: u64,
    ) -> Result<String, ChainError>;
}

/// `ChainClient` over a Subtensor node's JSON-RPC interface
pub struct SubtensorClient {
    rpc: RpcClient,
    wallet: Option<Wallet>,
    genesis_hash: [u8; 32],
    pallet_index: u8,
    add_stake_call: u8,
    remove_stake_call: u8,
    metadata_hash_extension: bool,
}

impl SubtensorClient {
    /// Connect to the configured node and load the chain parameters
    pub async fn connect(config: &ChainConfig) -> Result<Self, ChainError> {
        let rpc = RpcClient::new(&config.endpoint, config.request_timeout)?;

        let wallet = match &config.wallet_mnemonic {
            Some(secret) => Some(Wallet::from_uri(secret)?),
            None => {
                warn!("WALLET_MNEMONIC not set, stake operations are unavailable");
                None
            }
        };

        let genesis_hash = rpc.genesis_hash().await?;
        let runtime = rpc.runtime_version().await?;

        info!(
            "Connected to {} ({} spec {}, genesis 0x{})",
            rpc.endpoint(),
            runtime.spec_name,
            runtime.spec_version,
            hex::encode(&genesis_hash[..8])
        );
        if let Some(wallet) = &wallet {
            info!("Signing with coldkey {}", wallet.address());
        }

        Ok(Self {
            rpc,
            wallet,
            genesis_hash,
            pallet_index: config.subtensor_pallet_index,
            add_stake_call: config.add_stake_call_index,
            remove_stake_call: config.remove_stake_call_index,
            metadata_hash_extension: config.metadata_hash_extension,
        })
    }

    async fn submit_stake_call(
        &self,
        call_index: u8,
        hotkey: &str,
        netuid: u16,
        amount_rao: u64,
    ) -> Result<String, ChainError> {
        let wallet = self.wallet.as_ref().ok_or(ChainError::NoWallet)?;
        let hotkey_account = parse_hotkey(hotkey)?;

        let call = extrinsic::encode_stake_call(
            self.pallet_index,
            call_index,
            &hotkey_account,
            netuid,
            amount_rao,
        );

        // runtime version at the best block, not the one seen at connect
        let runtime = self.rpc.runtime_version().await?;
        let nonce = self.rpc.account_next_index(&wallet.address()).await?;

        let ctx = SigningContext {
            spec_version: runtime.spec_version,
            transaction_version: runtime.transaction_version,
            genesis_hash: self.genesis_hash,
            metadata_hash_extension: self.metadata_hash_extension,
        };
        let extra = extrinsic::encode_extra(nonce, 0, self.metadata_hash_extension);
        let additional = extrinsic::encode_additional(&ctx);
        let payload = extrinsic::signing_payload(&call, &extra, &additional);
        let signature = wallet.sign(&payload);
        let xt = extrinsic::assemble_signed(wallet.account(), &signature, &extra, &call);

        let tx_hash = self.rpc.submit_extrinsic(&xt).await?;
        info!(
            hotkey,
            netuid,
            amount_rao,
            nonce,
            "Submitted stake call {}.{}: {}",
            self.pallet_index,
            call_index,
            tx_hash
        );
        Ok(tx_hash)
    }
}

fn parse_hotkey(hotkey: &str) -> Result<AccountBytes, ChainError> {
    decode_account(hotkey).ok_or_else(|| ChainError::InvalidHotkey(hotkey.to_string()))
}

#[async_trait]
impl ChainClient for SubtensorClient {
    async fn tao_dividends(&self, netuid: u16, hotkey: &str) -> Result<u64, ChainError> {
        let account = parse_hotkey(hotkey)?;
        let key = storage::tao_dividends_key(netuid, &account);
        let raw = self.rpc.get_storage(&key).await?;
        storage::decode_u64(raw.as_deref())
    }

    async fn add_stake(
        &self,
        hotkey: &str,
        netuid: u16,
        amount_rao: u64,
    ) -> Result<String, ChainError> {
        self.submit_stake_call(self.add_stake_call, hotkey, netuid, amount_rao)
            .await
    }

    async fn remove_stake(
        &self,
        hotkey: &str,
        netuid: u16,
        amount_rao: u64,
    ) -> Result<String, ChainError> {
        self.submit_stake_call(self.remove_stake_call, hotkey, netuid, amount_rao)
            .await
    }
}
