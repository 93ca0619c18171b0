//! Chain-side values produced by a [`ChainSource`](crate::ChainSource) and the
//! records the engine keeps per subscriber.
use serde::{Deserialize, Serialize};

/// Block height.
pub type BlockHeight = u64;

/// Canonical form of an address for set membership and storage keys.
pub fn normalize_address(address: &str) -> String {
    address.to_ascii_lowercase()
}

/// A block as returned by the chain source, with its full transaction list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// Block height.
    pub number: BlockHeight,
    /// Block hash.
    pub hash: String,
    /// Parent block hash.
    pub parent_hash: String,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Gas used by all transactions in the block.
    pub gas_used: u64,
    /// Block gas limit.
    pub gas_limit: u64,
    /// EIP-1559 base fee; absent on pre-London blocks.
    pub base_fee_per_gas: Option<u64>,
    /// Fee recipient.
    pub miner: String,
    /// Transactions in block order. `None` means the node returned no
    /// transaction list at all, which the matcher treats as malformed.
    pub transactions: Option<Vec<ChainTransaction>>,
}

/// A transaction as found inside a [`Block`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainTransaction {
    /// Transaction hash.
    pub hash: String,
    /// Sender, as reported by the node (case preserved).
    pub from: String,
    /// Recipient; `None` for contract creation.
    pub to: Option<String>,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas limit.
    pub gas: u64,
    /// Gas price in wei.
    pub gas_price: u64,
    /// Transferred amount in wei.
    pub value: u128,
    /// Call data.
    pub input: String,
}

/// A matched transaction as stored per subscriber and served to API callers.
///
/// Numeric fields are decimal strings so values wider than any JSON number
/// type survive the trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Transaction hash.
    pub hash: String,
    /// Sender, lower-cased.
    pub from: String,
    /// Recipient as the node reported it; empty for contract creation.
    pub to: String,
    /// Wei amount.
    pub value: String,
    /// Height of the containing block.
    pub block_number: String,
    /// Timestamp of the containing block.
    pub timestamp: String,
}
