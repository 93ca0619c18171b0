use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ethwatch::prelude::*;
use ethwatch::{BlockHeight, TransactionRecord};

fn record(hash: &str) -> TransactionRecord {
    TransactionRecord {
        hash: hash.into(),
        from: "0xaaa".into(),
        to: "0xbbb".into(),
        value: "1".into(),
        block_number: "1".into(),
        timestamp: "0".into(),
    }
}

#[tokio::test]
async fn concurrent_subscribers_all_land() -> anyhow::Result<()> {
    let state = Arc::new(MemoryState::new());
    let mut tasks = Vec::new();
    for i in 0..32 {
        let state = state.clone();
        tasks.push(tokio::spawn(async move {
            state.add_subscriber(&format!("0xA{i:02}")).await
        }));
    }
    for t in tasks {
        t.await??;
    }

    let subs = state.list_subscribers().await?;
    assert_eq!(subs.len(), 32);
    assert!(subs.contains("0xa07"));
    assert!(state.is_subscribed("0xA31").await?);
    Ok(())
}

#[tokio::test]
async fn readers_see_whole_logs_during_writes() -> anyhow::Result<()> {
    let state = Arc::new(MemoryState::new());
    state.add_subscriber("0xaaa").await?;

    let writer = {
        let state = state.clone();
        tokio::spawn(async move {
            let mut log = Vec::new();
            for i in 0..50 {
                log.push(record(&format!("0x{i}")));
                state.save_transactions("0xaaa", log.clone()).await?;
                state.set_current_block(i as BlockHeight + 1).await?;
                tokio::task::yield_now().await;
            }
            anyhow::Ok(())
        })
    };

    let mut last_len = 0;
    let mut last_cursor = 0;
    while !writer.is_finished() {
        let log = state.get_transactions("0xaaa").await?;
        assert!(log.len() >= last_len);
        let cursor = state.get_current_block().await?;
        assert!(cursor >= last_cursor);
        last_len = log.len();
        last_cursor = cursor;
        tokio::task::yield_now().await;
    }
    writer.await??;

    assert_eq!(state.get_transactions("0xaaa").await?.len(), 50);
    assert_eq!(state.get_current_block().await?, 50);
    Ok(())
}

/// State whose every call fails, to exercise the facade's fallbacks.
struct BrokenState;

#[async_trait]
impl ChainState for BrokenState {
    async fn add_subscriber(&self, _: &str) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
    async fn is_subscribed(&self, _: &str) -> anyhow::Result<bool> {
        anyhow::bail!("disk full")
    }
    async fn list_subscribers(&self) -> anyhow::Result<HashSet<String>> {
        anyhow::bail!("disk full")
    }
    async fn save_transactions(&self, _: &str, _: Vec<TransactionRecord>) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
    async fn get_transactions(&self, _: &str) -> anyhow::Result<Vec<TransactionRecord>> {
        anyhow::bail!("disk full")
    }
    async fn set_current_block(&self, _: BlockHeight) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
    async fn get_current_block(&self) -> anyhow::Result<BlockHeight> {
        anyhow::bail!("disk full")
    }
}

/// Source that is never polled in these tests.
struct IdleSource;

#[async_trait]
impl ChainSource for IdleSource {
    async fn tip_height(&self) -> anyhow::Result<BlockHeight> {
        Ok(0)
    }
    async fn block_by_number(&self, h: BlockHeight) -> anyhow::Result<ethwatch::Block> {
        anyhow::bail!("no block {h}")
    }
}

#[tokio::test]
async fn parser_delegates_to_state() -> anyhow::Result<()> {
    let state = Arc::new(MemoryState::new());
    let ingest = IngestLoop::new(state.clone(), IdleSource, LogNotifier, LoopConfig::default());
    let parser = EthParser::new(state.clone(), ingest.handle());

    assert_eq!(parser.current_block().await, 0);
    assert!(parser.subscribe("0xAbC").await);
    assert!(parser.subscribe("0xabc").await);
    assert_eq!(state.list_subscribers().await?.len(), 1);
    assert!(parser.transactions("0xabc").await.is_empty());

    state.save_transactions("0xabc", vec![record("0x1")]).await?;
    state.set_current_block(77).await?;
    assert_eq!(parser.transactions("0xABC").await, vec![record("0x1")]);
    assert_eq!(parser.current_block().await, 77);
    Ok(())
}

#[tokio::test]
async fn parser_masks_state_failures() {
    let state = Arc::new(BrokenState);
    let ingest = IngestLoop::new(state.clone(), IdleSource, LogNotifier, LoopConfig::default());
    let parser = EthParser::new(state, ingest.handle());

    assert_eq!(parser.current_block().await, 0);
    assert!(!parser.subscribe("0xabc").await);
    assert!(parser.transactions("0xabc").await.is_empty());
}

#[tokio::test]
async fn parser_shutdown_stops_the_loop() {
    let state = Arc::new(MemoryState::new());
    let ingest = IngestLoop::new(state.clone(), IdleSource, LogNotifier, LoopConfig::default());
    let handle = ingest.handle();
    let parser = EthParser::new(state, handle.clone());

    parser.shutdown();
    parser.shutdown();
    assert!(!handle.is_running());

    // the first tick fires immediately, sees the flag and exits
    ingest.run().await;
    assert_eq!(handle.state(), ethwatch::LoopState::Stopped);
}
