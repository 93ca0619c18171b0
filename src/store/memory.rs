//! Volatile in-process store. Everything is lost on restart.
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::store::ChainState;
use crate::types::{normalize_address, BlockHeight, TransactionRecord};

#[derive(Default)]
struct Inner {
    current_block: BlockHeight,
    subscribers: HashSet<String>,
    transactions: HashMap<String, Vec<TransactionRecord>>,
}

/// [`ChainState`] kept behind a single reader/writer lock.
///
/// Cursor, subscribers and logs share one critical section; no guard is held
/// across an `.await`.
#[derive(Default)]
pub struct MemoryState {
    inner: RwLock<Inner>,
}

impl MemoryState {
    /// Empty state: cursor 0, no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> anyhow::Result<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| anyhow!("chain state lock poisoned"))
    }

    fn write(&self) -> anyhow::Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| anyhow!("chain state lock poisoned"))
    }
}

#[async_trait]
impl ChainState for MemoryState {
    async fn add_subscriber(&self, address: &str) -> anyhow::Result<()> {
        let address = normalize_address(address);
        self.write()?.subscribers.insert(address);
        Ok(())
    }

    async fn is_subscribed(&self, address: &str) -> anyhow::Result<bool> {
        let address = normalize_address(address);
        Ok(self.read()?.subscribers.contains(&address))
    }

    async fn list_subscribers(&self) -> anyhow::Result<HashSet<String>> {
        Ok(self.read()?.subscribers.clone())
    }

    async fn save_transactions(
        &self,
        address: &str,
        records: Vec<TransactionRecord>,
    ) -> anyhow::Result<()> {
        let address = normalize_address(address);
        let mut inner = self.write()?;
        if inner.subscribers.contains(&address) {
            inner.transactions.insert(address, records);
        }
        Ok(())
    }

    async fn get_transactions(&self, address: &str) -> anyhow::Result<Vec<TransactionRecord>> {
        let address = normalize_address(address);
        Ok(self
            .read()?
            .transactions
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_current_block(&self, height: BlockHeight) -> anyhow::Result<()> {
        self.write()?.current_block = height;
        Ok(())
    }

    async fn get_current_block(&self) -> anyhow::Result<BlockHeight> {
        Ok(self.read()?.current_block)
    }
}
