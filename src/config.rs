//! Command-line / environment configuration for the `ethwatch` binary.
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::ensure;
use clap::Parser;

use crate::engine::{FetchFailurePolicy, LoopConfig};
use crate::logging::LogConfig;
use crate::rpc::RetryConfig;

/// Watch Ethereum addresses and serve their matched transactions over HTTP.
#[derive(Debug, Clone, Parser)]
#[command(name = "ethwatch", version, about)]
pub struct Config {
    /// JSON-RPC endpoint of the Ethereum node.
    #[arg(long, env = "ETHWATCH_RPC_URL", default_value = "https://ethereum-rpc.publicnode.com")]
    pub rpc_url: String,

    /// Address the HTTP API binds to.
    #[arg(long, env = "ETHWATCH_LISTEN", default_value = "0.0.0.0:5005")]
    pub listen: SocketAddr,

    /// Seconds between polls of the chain tip.
    #[arg(long, env = "ETHWATCH_POLL_INTERVAL_SECS", default_value_t = 15)]
    pub poll_interval_secs: u64,

    /// Per-request RPC timeout in seconds.
    #[arg(long, env = "ETHWATCH_RPC_TIMEOUT_SECS", default_value_t = 10)]
    pub rpc_timeout_secs: u64,

    /// Retries for transient RPC failures (0 disables).
    #[arg(long, env = "ETHWATCH_RPC_MAX_RETRIES", default_value_t = 3)]
    pub rpc_max_retries: u32,

    /// Delay before the first RPC retry, in milliseconds; doubles per retry.
    #[arg(long, env = "ETHWATCH_RPC_INITIAL_BACKOFF_MS", default_value_t = 200)]
    pub rpc_initial_backoff_ms: u64,

    /// What to do with the rest of a catch-up range when a block fails to load.
    #[arg(long, env = "ETHWATCH_ON_FETCH_ERROR", value_enum, default_value_t = FetchFailurePolicy::Skip)]
    pub on_fetch_error: FetchFailurePolicy,

    /// Seconds in-flight HTTP requests get to finish after a shutdown signal.
    #[arg(long, env = "ETHWATCH_SHUTDOWN_GRACE_SECS", default_value_t = 10)]
    pub shutdown_grace_secs: u64,

    /// Default log level.
    #[arg(long, env = "ETHWATCH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit JSON logs.
    #[arg(long, env = "ETHWATCH_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    /// Reject settings the loop or the client cannot run with.
    pub fn validate(self) -> anyhow::Result<Self> {
        ensure!(self.poll_interval_secs > 0, "poll interval must be at least one second");
        ensure!(self.rpc_timeout_secs > 0, "RPC timeout must be at least one second");
        ensure!(!self.rpc_url.is_empty(), "RPC URL must not be empty");
        Ok(self)
    }

    /// Settings for the ingest loop.
    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            on_fetch_error: self.on_fetch_error,
        }
    }

    /// Retry policy for the RPC client.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.rpc_max_retries,
            initial_backoff: Duration::from_millis(self.rpc_initial_backoff_ms),
            ..RetryConfig::default()
        }
    }

    /// Settings for the HTTP JSON-RPC client.
    #[cfg(feature = "rpc-http")]
    pub fn http_client_config(&self) -> crate::rpc::HttpClientConfig {
        crate::rpc::HttpClientConfig {
            request_timeout: Duration::from_secs(self.rpc_timeout_secs),
            retry: self.retry_config(),
        }
    }

    /// Logging settings.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            json: self.log_json,
            ..LogConfig::default()
        }
    }

    /// Grace period for draining HTTP requests.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
