//! [`ChainSource`] over HTTP JSON-RPC, backed by `reqwest`.
//!
//! Every request carries a timeout; transport failures, timeouts and
//! 429/5xx statuses are retried with capped exponential backoff. JSON-RPC
//! error objects are returned as-is.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::chain_source::ChainSource;
use crate::hex::{parse_hex_u64, to_hex_quantity};
use crate::rpc::{decode_block, JsonRpcRequest, JsonRpcResponse, RetryConfig, RetryPolicy, RpcError};
use crate::types::{Block, BlockHeight};

/// Public endpoint used when nothing else is configured.
pub const DEFAULT_RPC_URL: &str = "https://ethereum-rpc.publicnode.com";

/// Tuning for [`EthRpcClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout, connect included.
    pub request_timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

/// JSON-RPC client for one Ethereum endpoint.
pub struct EthRpcClient {
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    next_id: AtomicU64,
}

impl EthRpcClient {
    /// Client for `url`.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RpcError::Http(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            http,
            retry: RetryPolicy::new(config.retry),
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint this client talks to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send_once(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, RpcError> {
        let resp = self.http.post(&self.url).json(req).send().await.map_err(|e| {
            if e.is_timeout() {
                RpcError::Timeout
            } else {
                RpcError::Http(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RpcError::Status {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                RpcError::Timeout
            } else {
                RpcError::Http(e.to_string())
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, RpcError> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(&req).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => {
                    attempt += 1;
                    let Some(delay) = self.retry.next_delay(attempt) else {
                        tracing::warn!(
                            method = %req.method,
                            attempts = attempt,
                            error = %e,
                            "giving up on RPC request"
                        );
                        return Err(e);
                    };
                    tracing::debug!(
                        method = %req.method,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying RPC request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Call `method` and return the raw result value.
    pub async fn call_raw(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = self.send(JsonRpcRequest::new(id, method, params)).await?;
        resp.into_result().map_err(RpcError::Rpc)
    }

    /// Call `method` and deserialize its result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        let value = self.call_raw(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `eth_blockNumber`.
    pub async fn block_number(&self) -> Result<BlockHeight, RpcError> {
        let hex: String = self.call("eth_blockNumber", vec![]).await?;
        Ok(parse_hex_u64(&hex)?)
    }

    /// `eth_getBlockByNumber(height, true)`.
    pub async fn block_with_transactions(&self, height: BlockHeight) -> Result<Block, RpcError> {
        let result = self
            .call_raw(
                "eth_getBlockByNumber",
                vec![json!(to_hex_quantity(height)), json!(true)],
            )
            .await?;
        decode_block(height, result)
    }
}

#[async_trait]
impl ChainSource for EthRpcClient {
    async fn tip_height(&self) -> anyhow::Result<BlockHeight> {
        self.block_number()
            .await
            .with_context(|| format!("eth_blockNumber via {}", self.url))
    }

    async fn block_by_number(&self, height: BlockHeight) -> anyhow::Result<Block> {
        self.block_with_transactions(height)
            .await
            .with_context(|| format!("eth_getBlockByNumber({height})"))
    }
}
