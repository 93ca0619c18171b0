//! State the engine mutates and the API reads: processing cursor, subscriber
//! set and per-address transaction logs.
use std::collections::HashSet;

use async_trait::async_trait;

use crate::types::{BlockHeight, TransactionRecord};

/// Shared mutable state. Implementations normalize every address argument
/// with [`normalize_address`](crate::types::normalize_address) and must be
/// safe to call from many tasks at once.
#[async_trait]
pub trait ChainState: Send + Sync {
    /// Register `address` for matching. Subscribing twice is a no-op.
    async fn add_subscriber(&self, address: &str) -> anyhow::Result<()>;

    /// Whether `address` is currently subscribed.
    async fn is_subscribed(&self, address: &str) -> anyhow::Result<bool>;

    /// Snapshot of the subscriber set.
    async fn list_subscribers(&self) -> anyhow::Result<HashSet<String>>;

    /// Replace the stored log for `address` with `records`.
    ///
    /// The write is dropped silently when `address` is not subscribed.
    async fn save_transactions(
        &self,
        address: &str,
        records: Vec<TransactionRecord>,
    ) -> anyhow::Result<()>;

    /// Stored log for `address`, oldest first. Empty if nothing matched.
    async fn get_transactions(&self, address: &str) -> anyhow::Result<Vec<TransactionRecord>>;

    /// Overwrite the cursor. Callers keep it monotonic.
    async fn set_current_block(&self, height: BlockHeight) -> anyhow::Result<()>;

    /// Last fully processed height; 0 before the first block.
    async fn get_current_block(&self) -> anyhow::Result<BlockHeight>;
}

// concrete stores live here
pub mod memory;
pub use memory::MemoryState;
