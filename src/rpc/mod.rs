//! Ethereum JSON-RPC plumbing: wire types, block decoding and (with the
//! `rpc-http` feature) an HTTP [`ChainSource`](crate::ChainSource).
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::hex::{parse_hex_u128, parse_hex_u64, HexError};
use crate::types::{Block, BlockHeight, ChainTransaction};

pub mod retry;

#[cfg(feature = "rpc-http")]
pub mod client;

#[cfg(feature = "rpc-http")]
pub use client::{EthRpcClient, HttpClientConfig, DEFAULT_RPC_URL};
pub use retry::{RetryConfig, RetryPolicy};

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Method name, e.g. `eth_blockNumber`.
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
    /// Request id echoed by the node.
    pub id: u64,
}

impl JsonRpcRequest {
    /// Build a 2.0 request.
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// Error object of a failed JSON-RPC call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version.
    #[serde(default)]
    pub jsonrpc: String,
    /// Echoed request id.
    #[serde(default)]
    pub id: Value,
    /// Result on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Result value, or the node's error. A missing result is `null`.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Errors talking to a JSON-RPC node.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Connection-level failure.
    #[error("HTTP transport error: {0}")]
    Http(String),
    /// No response within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },
    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),
    /// The result did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
    /// A hex quantity in the result did not decode.
    #[error(transparent)]
    Hex(#[from] HexError),
    /// `eth_getBlockByNumber` returned `null`.
    #[error("block {0} not available")]
    BlockNotFound(BlockHeight),
}

impl RpcError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Block object of `eth_getBlockByNumber(_, true)`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    /// Hex height.
    #[serde(default)]
    pub number: String,
    /// Block hash.
    #[serde(default)]
    pub hash: String,
    /// Parent hash.
    #[serde(default)]
    pub parent_hash: String,
    /// Hex unix timestamp.
    #[serde(default)]
    pub timestamp: String,
    /// Hex gas used.
    #[serde(default)]
    pub gas_used: String,
    /// Hex gas limit.
    #[serde(default)]
    pub gas_limit: String,
    /// Hex base fee, absent before London.
    #[serde(default)]
    pub base_fee_per_gas: Option<String>,
    /// Fee recipient.
    #[serde(default)]
    pub miner: String,
    /// Full transaction objects.
    #[serde(default)]
    pub transactions: Option<Vec<RpcTransaction>>,
}

/// Transaction object nested in [`RpcBlock`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// Transaction hash.
    #[serde(default)]
    pub hash: String,
    /// Sender.
    #[serde(default)]
    pub from: String,
    /// Recipient, `null` for contract creation.
    #[serde(default)]
    pub to: Option<String>,
    /// Hex nonce.
    #[serde(default)]
    pub nonce: String,
    /// Hex gas limit.
    #[serde(default)]
    pub gas: String,
    /// Hex gas price.
    #[serde(default)]
    pub gas_price: Option<String>,
    /// Hex wei value.
    #[serde(default)]
    pub value: String,
    /// Call data.
    #[serde(default)]
    pub input: String,
}

impl TryFrom<RpcTransaction> for ChainTransaction {
    type Error = HexError;

    fn try_from(tx: RpcTransaction) -> Result<Self, Self::Error> {
        Ok(Self {
            nonce: parse_hex_u64(&tx.nonce)?,
            gas: parse_hex_u64(&tx.gas)?,
            gas_price: parse_hex_u64(tx.gas_price.as_deref().unwrap_or_default())?,
            value: parse_hex_u128(&tx.value)?,
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            input: tx.input,
        })
    }
}

impl TryFrom<RpcBlock> for Block {
    type Error = HexError;

    fn try_from(b: RpcBlock) -> Result<Self, Self::Error> {
        let transactions = b
            .transactions
            .map(|txs| {
                txs.into_iter()
                    .map(ChainTransaction::try_from)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(Self {
            number: parse_hex_u64(&b.number)?,
            timestamp: parse_hex_u64(&b.timestamp)?,
            gas_used: parse_hex_u64(&b.gas_used)?,
            gas_limit: parse_hex_u64(&b.gas_limit)?,
            base_fee_per_gas: b.base_fee_per_gas.as_deref().map(parse_hex_u64).transpose()?,
            hash: b.hash,
            parent_hash: b.parent_hash,
            miner: b.miner,
            transactions,
        })
    }
}

/// Decode the result of `eth_getBlockByNumber` for `height`.
pub fn decode_block(height: BlockHeight, result: Value) -> Result<Block, RpcError> {
    let raw: Option<RpcBlock> = serde_json::from_value(result)?;
    let raw = raw.ok_or(RpcError::BlockNotFound(height))?;
    Ok(Block::try_from(raw)?)
}
