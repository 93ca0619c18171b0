//! Where blocks come from.
use async_trait::async_trait;

use crate::types::{Block, BlockHeight};

/// Read-only view of a chain: its tip and its blocks by height.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Highest height the node currently serves.
    async fn tip_height(&self) -> anyhow::Result<BlockHeight>;

    /// Full block at `height`, transactions included.
    async fn block_by_number(&self, height: BlockHeight) -> anyhow::Result<Block>;
}
