//! JSON-RPC client for an Ethereum-style node
//!
//! Accounts and unlocking go through the node's account manager
//! (`eth_accounts`, `personal_unlockAccount`). Balances are read from the
//! token contract with `balanceOf`, and funding is a `requestTokens` call on
//! the dispenser contract sent from the user's own (unlocked) account.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

use onboard_core::{
    Address, ClientError, ClientResult, ConfigError, NetworkConfig, ProtocolClient, Receipt,
    ReceiptStatus, TokenAmount, TxHandle,
};

/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: &str = "70a08231";

/// `requestTokens(uint256)`
pub const REQUEST_TOKENS_SELECTOR: &str = "eef9c27c";

/// Gas limit attached to dispenser calls
const REQUEST_GAS: u64 = 200_000;

/// JSON-RPC error object
#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
}

/// HTTP JSON-RPC protocol client
#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    token: Address,
    dispenser: Address,
    unlock_duration: Duration,
    request_timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Create a client from network configuration
    ///
    /// Both contract addresses must be configured.
    pub fn new(config: &NetworkConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let token = config
            .token_address
            .ok_or_else(|| ConfigError::Invalid("network.token_address is not set".into()))?;
        let dispenser = config
            .dispenser_address
            .ok_or_else(|| ConfigError::Invalid("network.dispenser_address is not set".into()))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: config.rpc_url.clone(),
            token,
            dispenser,
            unlock_duration: config.unlock_duration,
            request_timeout: config.request_timeout,
            next_id: AtomicU64::new(1),
        })
    }

    /// Send one JSON-RPC request and decode its result
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ClientResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        trace!("-> {} #{}", method, id);

        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| self.transport_error(e))?;

        let rpc: RpcResponse = match serde_json::from_slice(&bytes) {
            Ok(rpc) => rpc,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Transport(format!("{method}: HTTP {status}")));
            }
            Err(e) => {
                return Err(ClientError::InvalidResponse(format!("{method}: {e}")));
            }
        };

        if let Some(err) = rpc.error {
            return Err(ClientError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_value(rpc.result.unwrap_or(Value::Null))
            .map_err(|e| ClientError::InvalidResponse(format!("{method}: {e}")))
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout {
                duration_ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ProtocolClient for JsonRpcClient {
    async fn list_accounts(&self) -> ClientResult<Vec<Address>> {
        let raw: Vec<String> = self.call("eth_accounts", json!([])).await?;
        raw.iter()
            .map(|s| {
                s.parse()
                    .map_err(|_| ClientError::InvalidResponse(format!("eth_accounts: bad address {s}")))
            })
            .collect()
    }

    async fn unlock(&self, address: &Address, password: &str) -> ClientResult<bool> {
        let params = json!([address.to_hex(), password, self.unlock_duration.as_secs()]);
        match self.call::<bool>("personal_unlockAccount", params).await {
            Ok(unlocked) => Ok(unlocked),
            Err(ClientError::Rpc { code, message }) => {
                debug!("Unlock of {} refused ({}): {}", address.short(), code, message);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn balance(&self, address: &Address) -> ClientResult<TokenAmount> {
        let call = json!({
            "to": self.token.to_hex(),
            "data": format!("0x{}{}", BALANCE_OF_SELECTOR, address.to_abi_word()),
        });
        let raw: String = self.call("eth_call", json!([call, "latest"])).await?;
        TokenAmount::from_hex(&raw)
            .ok_or_else(|| ClientError::InvalidResponse(format!("balanceOf: {raw}")))
    }

    async fn request_funds(&self, address: &Address, amount: TokenAmount) -> ClientResult<TxHandle> {
        let tx = json!({
            "from": address.to_hex(),
            "to": self.dispenser.to_hex(),
            "gas": format!("0x{:x}", REQUEST_GAS),
            "data": format!("0x{}{}", REQUEST_TOKENS_SELECTOR, amount.to_abi_word()),
        });
        let raw: String = self.call("eth_sendTransaction", json!([tx])).await?;
        raw.parse()
            .map_err(|_| ClientError::InvalidResponse(format!("eth_sendTransaction: {raw}")))
    }

    async fn transaction_receipt(&self, tx: &TxHandle) -> ClientResult<Option<Receipt>> {
        let raw: Option<RawReceipt> = self
            .call("eth_getTransactionReceipt", json!([tx.to_hex()]))
            .await?;
        raw.map(parse_receipt).transpose()
    }

    fn name(&self) -> &str {
        &self.url
    }
}

fn parse_receipt(raw: RawReceipt) -> ClientResult<Receipt> {
    let tx: TxHandle = raw.transaction_hash.parse().map_err(|_| {
        ClientError::InvalidResponse(format!("receipt hash: {}", raw.transaction_hash))
    })?;

    let block_number = raw
        .block_number
        .as_deref()
        .map(parse_quantity)
        .transpose()?;

    // Receipts from before status codes existed carry no status field.
    let status = match raw.status.as_deref().map(parse_quantity).transpose()? {
        None | Some(1) => ReceiptStatus::Success,
        Some(_) => ReceiptStatus::Reverted,
    };

    Ok(Receipt {
        tx,
        block_number,
        status,
    })
}

fn parse_quantity(s: &str) -> ClientResult<u64> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| ClientError::InvalidResponse(format!("quantity without 0x: {s}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|_| ClientError::InvalidResponse(format!("bad quantity: {s}")))
}
