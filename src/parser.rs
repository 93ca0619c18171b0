//! The public face of the watcher: what the HTTP layer (or any embedder)
//! calls. Holds no logic beyond delegating to the state and the loop handle.
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::LoopHandle;
use crate::store::ChainState;
use crate::types::{BlockHeight, TransactionRecord};

/// Operations exposed to callers.
#[async_trait]
pub trait Parser: Send + Sync {
    /// Last fully processed block height.
    async fn current_block(&self) -> BlockHeight;

    /// Watch `address`. `false` only if the store rejected the write.
    async fn subscribe(&self, address: &str) -> bool;

    /// Matched transactions for `address`, oldest first.
    async fn transactions(&self, address: &str) -> Vec<TransactionRecord>;

    /// Stop the ingest loop. Idempotent; does not wait for it to exit.
    fn shutdown(&self);
}

/// [`Parser`] over a [`ChainState`] and the handle of the loop feeding it.
pub struct EthParser<S: ?Sized> {
    state: Arc<S>,
    ingest: LoopHandle,
}

impl<S: ChainState + ?Sized> EthParser<S> {
    /// Facade over `state`, stopping `ingest` on shutdown.
    pub fn new(state: Arc<S>, ingest: LoopHandle) -> Self {
        Self { state, ingest }
    }
}

#[async_trait]
impl<S: ChainState + ?Sized + 'static> Parser for EthParser<S> {
    async fn current_block(&self) -> BlockHeight {
        match self.state.get_current_block().await {
            Ok(height) => height,
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "failed to read current block");
                0
            }
        }
    }

    async fn subscribe(&self, address: &str) -> bool {
        match self.state.add_subscriber(address).await {
            Ok(()) => {
                tracing::info!(address, "new subscriber added");
                true
            }
            Err(e) => {
                tracing::error!(address, error = %format!("{e:#}"), "failed to add subscriber");
                false
            }
        }
    }

    async fn transactions(&self, address: &str) -> Vec<TransactionRecord> {
        self.state.get_transactions(address).await.unwrap_or_else(|e| {
            tracing::error!(address, error = %format!("{e:#}"), "failed to load transactions");
            Vec::new()
        })
    }

    fn shutdown(&self) {
        self.ingest.shutdown();
    }
}
