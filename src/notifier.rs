//! Notification sinks invoked once per matched (address, transaction) pair.
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::TransactionRecord;

/// Message attached to every match notification.
pub const MATCH_MESSAGE: &str = "found a new transaction";

/// Receives one call per match. Delivery is best effort: the engine logs a
/// failed notification and moves on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message` about `record` to subscriber `address`.
    async fn notify(
        &self,
        address: &str,
        message: &str,
        record: &TransactionRecord,
    ) -> anyhow::Result<()>;
}

/// Writes each notification as a structured `info` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        address: &str,
        message: &str,
        record: &TransactionRecord,
    ) -> anyhow::Result<()> {
        tracing::info!(
            target: "ethwatch::notify",
            address,
            hash = %record.hash,
            from = %record.from,
            to = %record.to,
            value = %record.value,
            block = %record.block_number,
            "{message}"
        );
        Ok(())
    }
}

/// An owned notification, as forwarded by [`ChannelNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Subscriber the match belongs to.
    pub address: String,
    /// Human-readable message.
    pub message: String,
    /// The matched transaction.
    pub record: TransactionRecord,
}

/// Forwards notifications into a tokio channel for in-process consumers.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(
        &self,
        address: &str,
        message: &str,
        record: &TransactionRecord,
    ) -> anyhow::Result<()> {
        self.tx
            .send(Notification {
                address: address.to_string(),
                message: message.to_string(),
                record: record.clone(),
            })
            .map_err(|_| anyhow::anyhow!("notification receiver dropped"))
    }
}
