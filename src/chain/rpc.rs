//! Substrate JSON-RPC 2.0 client

use super::ChainError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// Runtime versions needed to sign transactions
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    #[serde(default)]
    pub spec_name: String,
    pub spec_version: u32,
    pub transaction_version: u32,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// JSON-RPC client for a single node endpoint
pub struct RpcClient {
    http: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: rpc_http_url(endpoint),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue a raw JSON-RPC call and return its `result`
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "rpc call");

        let response: RpcResponse = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            let message = match err.data {
                Some(data) => format!("{} ({})", err.message, data),
                None => err.message,
            };
            return Err(ChainError::Rpc {
                code: err.code,
                message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// `state_getStorage`; `None` when the key holds no value
    pub async fn get_storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ChainError> {
        let result = self
            .call("state_getStorage", json!([to_hex(key)]))
            .await?;
        match result {
            Value::Null => Ok(None),
            Value::String(s) => decode_hex(&s).map(Some),
            other => Err(ChainError::Decode(format!(
                "unexpected storage value: {}",
                other
            ))),
        }
    }

    /// `state_getRuntimeVersion` at the best block
    pub async fn runtime_version(&self) -> Result<RuntimeVersion, ChainError> {
        let result = self.call("state_getRuntimeVersion", json!([])).await?;
        serde_json::from_value(result).map_err(|e| ChainError::Decode(e.to_string()))
    }

    /// `chain_getBlockHash(0)`
    pub async fn genesis_hash(&self) -> Result<[u8; 32], ChainError> {
        let result = self.call("chain_getBlockHash", json!([0])).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| ChainError::Decode("genesis hash is not a string".to_string()))?;
        decode_hex(hex)?
            .try_into()
            .map_err(|_| ChainError::Decode("genesis hash is not 32 bytes".to_string()))
    }

    /// `system_accountNextIndex`, including pool transactions
    pub async fn account_next_index(&self, address: &str) -> Result<u64, ChainError> {
        let result = self
            .call("system_accountNextIndex", json!([address]))
            .await?;
        result
            .as_u64()
            .ok_or_else(|| ChainError::Decode(format!("unexpected nonce: {}", result)))
    }

    /// `author_submitExtrinsic`; returns the transaction hash
    pub async fn submit_extrinsic(&self, extrinsic: &[u8]) -> Result<String, ChainError> {
        let result = self
            .call("author_submitExtrinsic", json!([to_hex(extrinsic)]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ChainError::Decode(format!("unexpected tx hash: {}", result)))
    }
}

/// Map websocket endpoints to their HTTP equivalent
fn rpc_http_url(endpoint: &str) -> String {
    if let Some(rest) = endpoint.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = endpoint.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        endpoint.to_string()
    }
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub(crate) fn decode_hex(s: &str) -> Result<Vec<u8>, ChainError> {
    hex::decode(s.trim_start_matches("0x")).map_err(|e| ChainError::Decode(e.to_string()))
}
