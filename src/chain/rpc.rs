//! EVM JSON-RPC client
//!
//! The four calls the keeper needs from the chain: balance, gas price,
//! nonce and raw transaction submission. Each call is a single attempt;
//! callers own any retry policy.

use alloy::primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use super::error::RpcError;
use super::units::{NATIVE_DECIMALS, from_base_units, parse_quantity};

/// Chain access used by balance polling and funding
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Native balance of `address` in whole coins
    async fn get_balance(&self, address: Address) -> Result<Decimal, RpcError>;

    /// Network-suggested gas price in wei
    async fn get_gas_price(&self) -> Result<u128, RpcError>;

    /// Next nonce for `address`, including pending transactions
    async fn get_nonce(&self, address: Address) -> Result<u64, RpcError>;

    /// Broadcast a signed, EIP-2718 encoded transaction and return its hash
    async fn submit_signed_transaction(&self, raw: &[u8]) -> Result<String, RpcError>;
}

/// JSON-RPC request structure
#[derive(Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC client for an EVM node
pub struct JsonRpcClient {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        info!("Initializing chain RPC client at {}", url);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.to_string(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make a JSON-RPC call
    async fn rpc_call<T, R>(&self, method: &'static str, params: T) -> Result<R, RpcError>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        debug!(method, "rpc call");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Connection(format!("HTTP request failed: {}", e)))?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RpcError::Connection(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            return Err(RpcError::Node {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response.result.ok_or(RpcError::EmptyResult(method))
    }

    async fn quantity_call<T: Serialize>(
        &self,
        method: &'static str,
        params: T,
    ) -> Result<u128, RpcError> {
        let result: String = self.rpc_call(method, params).await?;
        parse_quantity(&result)
            .map_err(|e| RpcError::Parse(format!("{} returned {:?}: {}", method, result, e)))
    }
}

#[async_trait]
impl ChainRpc for JsonRpcClient {
    async fn get_balance(&self, address: Address) -> Result<Decimal, RpcError> {
        let raw = self
            .quantity_call("eth_getBalance", (address.to_string(), "latest"))
            .await?;
        from_base_units(raw, NATIVE_DECIMALS).map_err(|e| RpcError::Parse(e.to_string()))
    }

    async fn get_gas_price(&self) -> Result<u128, RpcError> {
        self.quantity_call("eth_gasPrice", serde_json::Value::Array(vec![]))
            .await
    }

    async fn get_nonce(&self, address: Address) -> Result<u64, RpcError> {
        let nonce = self
            .quantity_call("eth_getTransactionCount", (address.to_string(), "pending"))
            .await?;
        u64::try_from(nonce).map_err(|e| RpcError::Parse(format!("nonce out of range: {}", e)))
    }

    async fn submit_signed_transaction(&self, raw: &[u8]) -> Result<String, RpcError> {
        let encoded = format!("0x{}", hex::encode(raw));
        self.rpc_call("eth_sendRawTransaction", [encoded]).await
    }
}
