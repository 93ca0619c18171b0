#![forbid(unsafe_code)]
#![deny(missing_docs)]
//! ethwatch: follow an Ethereum chain over JSON-RPC and record the
//! transactions that touch subscribed addresses.
//!
//! ## What you implement (or take from this crate)
//! - [`ChainSource`]: report the tip height and return full blocks by height
//!   ([`EthRpcClient`] speaks JSON-RPC over HTTP).
//! - [`ChainState`]: keep the subscriber set, the per-address transaction log
//!   and the last processed height ([`MemoryState`] keeps them in memory).
//! - [`Notifier`]: receive one call per match ([`LogNotifier`] logs it).
//!
//! ## What the loop does
//! - Polls the tip on a fixed interval and walks every block after the cursor.
//! - Moves the cursor to each block **before** matching it.
//! - Matches `from` / `to` against subscribers, appends hits to the log and
//!   notifies.
//!
//! ## Minimal usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use ethwatch::prelude::*;
//!
//! async fn run() -> anyhow::Result<()> {
//!     let source = EthRpcClient::new(DEFAULT_RPC_URL, HttpClientConfig::default())?;
//!     let state = Arc::new(MemoryState::new());
//!     let ingest = IngestLoop::new(state.clone(), source, LogNotifier, LoopConfig::default());
//!
//!     let parser = EthParser::new(state, ingest.handle());
//!     parser.subscribe("0xAbC0000000000000000000000000000000000001").await;
//!
//!     tokio::spawn(ingest.run());
//!     Ok(())
//! }
//! ```
/// Polling loop: tip, catch-up range, match, store, notify.
pub mod engine;

/// Where blocks come from.
pub mod chain_source;

/// Callbacks for matched transactions.
pub mod notifier;

/// Caller-facing facade over state and loop.
pub mod parser;

/// Per-block subscriber matching.
pub mod matcher;

/// Subscribers, transaction logs and the block cursor.
pub mod store;

/// Ethereum JSON-RPC client and wire types.
pub mod rpc;

/// Domain types shared by every layer.
pub mod types;

/// Hex quantity parsing.
pub mod hex;

/// Command-line configuration.
pub mod config;

/// Tracing subscriber setup.
pub mod logging;

/// HTTP API over [`Parser`].
#[cfg(feature = "http-api")]
pub mod api;

// Public re-exports
pub use chain_source::ChainSource;
pub use engine::{FetchFailurePolicy, IngestLoop, LoopConfig, LoopHandle, LoopState, TickOutcome};
pub use notifier::{ChannelNotifier, LogNotifier, Notification, Notifier};
pub use parser::{EthParser, Parser};
pub use store::{ChainState, MemoryState};
pub use types::{Block, BlockHeight, ChainTransaction, TransactionRecord};

#[cfg(feature = "rpc-http")]
pub use rpc::{EthRpcClient, HttpClientConfig, DEFAULT_RPC_URL};

/// Convenience prelude for end users.
pub mod prelude {
    pub use crate::{
        ChainSource, ChainState, EthParser, IngestLoop, LogNotifier, LoopConfig, MemoryState,
        Notifier, Parser,
    };

    #[cfg(feature = "rpc-http")]
    pub use crate::{EthRpcClient, HttpClientConfig, DEFAULT_RPC_URL};
}
