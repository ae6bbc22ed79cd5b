//! # World State Contract
//!
//! The [`WorldState`] trait is the boundary between Cloister and whatever
//! key-value substrate holds the ledger. Implementations store raw bytes per
//! (partition, key), hash them on demand, and apply a transaction's write
//! set atomically after checking that nothing it read has since changed.
//!
//! Versions are commit heights: every write in a commit stamps its key with
//! the height that commit was assigned. A key that has never been written,
//! or was deleted, has no version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::ContentHash;
use crate::error::LedgerResult;

/// Commit height at which a key was last written.
pub type Version = u64;

/// A stored value together with the version that wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: Version,
}

/// Lazy sequence of `(key, value)` pairs from a range or rich query.
pub type KvIter<'a> = Box<dyn Iterator<Item = LedgerResult<(String, Vec<u8>)>> + 'a>;

/// One key observed by a transaction, with the version it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadEntry {
    pub partition: String,
    pub key: String,
    pub version: Option<Version>,
}

/// One buffered mutation. `value == None` deletes the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEntry {
    pub partition: String,
    pub key: String,
    pub value: Option<Vec<u8>>,
}

/// Everything a backend needs to commit a transaction.
#[derive(Debug, Clone)]
pub struct CommitBatch {
    pub tx_id: String,
    pub function: String,
    pub creator: String,
    pub creator_msp: String,
    pub reads: Vec<ReadEntry>,
    pub writes: Vec<WriteEntry>,
}

/// Ledger-visible summary of one write. Carries the value hash, never the
/// value, so the log can be shared with every organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteSummary {
    pub partition: String,
    pub key: String,
    /// `None` for deletes.
    pub value_hash: Option<ContentHash>,
}

/// Append-only record of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRecord {
    pub tx_id: String,
    pub height: u64,
    pub function: String,
    pub creator: String,
    pub creator_msp: String,
    pub timestamp: DateTime<Utc>,
    pub writes: Vec<WriteSummary>,
}

impl TxRecord {
    /// Build the log record for `batch` committed at `height`.
    pub fn from_batch(batch: &CommitBatch, height: u64) -> Self {
        Self {
            tx_id: batch.tx_id.clone(),
            height,
            function: batch.function.clone(),
            creator: batch.creator.clone(),
            creator_msp: batch.creator_msp.clone(),
            timestamp: Utc::now(),
            writes: batch
                .writes
                .iter()
                .map(|w| WriteSummary {
                    partition: w.partition.clone(),
                    key: w.key.clone(),
                    value_hash: w.value.as_deref().map(ContentHash::of),
                })
                .collect(),
        }
    }
}

/// The storage substrate contract.
///
/// Implementations must be safe to share across threads; the node serves
/// concurrent invocations against one instance.
pub trait WorldState: Send + Sync {
    /// Point read of committed state.
    fn get(&self, partition: &str, key: &str) -> LedgerResult<Option<VersionedValue>>;

    /// Content hash of the committed value, with its version. Computed from
    /// the raw stored bytes.
    fn get_hash(&self, partition: &str, key: &str)
        -> LedgerResult<Option<(ContentHash, Version)>>;

    /// Keys in `[start, end)` in ascending order. An empty `end` means no
    /// upper bound.
    fn range<'a>(&'a self, partition: &str, start: &str, end: &str) -> LedgerResult<KvIter<'a>>;

    /// Every key in the partition in ascending order.
    fn scan<'a>(&'a self, partition: &str) -> LedgerResult<KvIter<'a>>;

    /// Validate `batch.reads` against current versions and apply
    /// `batch.writes` atomically. Returns the log record on success and
    /// [`crate::error::LedgerError::MvccConflict`] if any read is stale.
    fn apply(&self, batch: CommitBatch) -> LedgerResult<TxRecord>;

    /// Look up a committed transaction by id.
    fn transaction(&self, tx_id: &str) -> LedgerResult<Option<TxRecord>>;

    /// Height of the most recent commit (0 when nothing is committed).
    fn height(&self) -> LedgerResult<u64>;
}
