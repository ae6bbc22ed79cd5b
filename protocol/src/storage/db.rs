//! # Persistent Storage Engine
//!
//! The persistence layer for a Cloister peer, built on sled's embedded
//! key-value store.
//!
//! ## Tree Layout
//!
//! | Tree       | Key                          | Value                              |
//! |------------|------------------------------|------------------------------------|
//! | `state`    | `partition 0x00 key` (UTF-8) | commit height (8B BE) + raw value  |
//! | `tx_log`   | `tx_id` (UTF-8)              | `bincode(TxRecord)`                |
//! | `metadata` | key (UTF-8)                  | value (bytes)                      |
//!
//! Partition names never contain `0x00` (the collection config rejects
//! them), so `partition 0x00` is an unambiguous prefix and a prefix scan
//! returns exactly one partition. Values are stored as received behind
//! their version and hashed on read; nothing here ever re-encodes a value.
//!
//! A value and its version live in one sled entry, so a single `get`
//! always sees a pair written by the same commit.
//!
//! ## Atomicity
//!
//! A commit validates the read set, writes entries, appends the log record
//! and advances the height inside one sled transaction spanning all three
//! trees. Either everything lands or nothing does.

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use super::world_state::{CommitBatch, KvIter, TxRecord, Version, VersionedValue, WorldState};
use crate::crypto::ContentHash;
use crate::error::{LedgerError, LedgerResult};

/// Well-known key in the `metadata` tree for the latest commit height.
const META_HEIGHT: &[u8] = b"commit_height";

fn state_prefix(partition: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(partition.len() + 1);
    prefix.extend_from_slice(partition.as_bytes());
    prefix.push(0);
    prefix
}

fn state_key(partition: &str, key: &str) -> Vec<u8> {
    let mut k = state_prefix(partition);
    k.extend_from_slice(key.as_bytes());
    k
}

fn decode_u64(bytes: &[u8]) -> LedgerResult<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LedgerError::Serialization("invalid u64 bytes".to_string()))?;
    Ok(u64::from_be_bytes(arr))
}

const VERSION_LEN: usize = 8;

fn encode_entry(version: Version, value: &[u8]) -> Vec<u8> {
    let mut entry = Vec::with_capacity(VERSION_LEN + value.len());
    entry.extend_from_slice(&version.to_be_bytes());
    entry.extend_from_slice(value);
    entry
}

/// Split a `state` entry into its version and value bytes.
fn decode_entry(entry: &[u8]) -> LedgerResult<(Version, &[u8])> {
    if entry.len() < VERSION_LEN {
        return Err(LedgerError::Serialization(
            "state entry shorter than its version header".to_string(),
        ));
    }
    let (version, value) = entry.split_at(VERSION_LEN);
    Ok((decode_u64(version)?, value))
}

/// Persistent world state for one peer.
///
/// sled is thread-safe, so `SledWorldState` can be shared across request
/// handlers via `Arc` without external synchronization.
#[derive(Debug, Clone)]
pub struct SledWorldState {
    db: Db,
    state: Tree,
    tx_log: Tree,
    metadata: Tree,
}

impl SledWorldState {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> LedgerResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> LedgerResult<Self> {
        Ok(Self {
            state: db.open_tree("state")?,
            tx_log: db.open_tree("tx_log")?,
            metadata: db.open_tree("metadata")?,
            db,
        })
    }

    /// Number of committed transactions in the log.
    pub fn transaction_count(&self) -> usize {
        self.tx_log.len()
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> LedgerResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn prefixed_iter<'a>(&self, prefix_len: usize, iter: sled::Iter) -> KvIter<'a> {
        Box::new(iter.map(move |item| {
            let (k, v) = item?;
            let key = std::str::from_utf8(&k[prefix_len..])
                .map_err(|e| LedgerError::Serialization(e.to_string()))?
                .to_string();
            let (_, value) = decode_entry(&v)?;
            Ok((key, value.to_vec()))
        }))
    }
}

impl WorldState for SledWorldState {
    fn get(&self, partition: &str, key: &str) -> LedgerResult<Option<VersionedValue>> {
        let Some(entry) = self.state.get(state_key(partition, key))? else {
            return Ok(None);
        };
        let (version, value) = decode_entry(&entry)?;
        Ok(Some(VersionedValue {
            value: value.to_vec(),
            version,
        }))
    }

    fn get_hash(
        &self,
        partition: &str,
        key: &str,
    ) -> LedgerResult<Option<(ContentHash, Version)>> {
        Ok(self
            .get(partition, key)?
            .map(|vv| (ContentHash::of(&vv.value), vv.version)))
    }

    fn range<'a>(&'a self, partition: &str, start: &str, end: &str) -> LedgerResult<KvIter<'a>> {
        if !end.is_empty() && start >= end {
            return Ok(Box::new(std::iter::empty()));
        }
        let prefix = state_prefix(partition);
        let lower = state_key(partition, start);
        let upper = if end.is_empty() {
            // Smallest byte string greater than every `partition 0x00 ...`.
            let mut u = partition.as_bytes().to_vec();
            u.push(1);
            u
        } else {
            state_key(partition, end)
        };
        Ok(self.prefixed_iter(prefix.len(), self.state.range(lower..upper)))
    }

    fn scan<'a>(&'a self, partition: &str) -> LedgerResult<KvIter<'a>> {
        let prefix = state_prefix(partition);
        let len = prefix.len();
        Ok(self.prefixed_iter(len, self.state.scan_prefix(prefix)))
    }

    fn apply(&self, batch: CommitBatch) -> LedgerResult<TxRecord> {
        let result = (&self.state, &self.tx_log, &self.metadata).transaction(
            |(state, tx_log, metadata)| {
                for read in &batch.reads {
                    let current = match state.get(state_key(&read.partition, &read.key))? {
                        Some(entry) => Some(
                            decode_entry(&entry)
                                .map_err(ConflictableTransactionError::Abort)?
                                .0,
                        ),
                        None => None,
                    };
                    if current != read.version {
                        return Err(ConflictableTransactionError::Abort(
                            LedgerError::MvccConflict {
                                partition: read.partition.clone(),
                                key: read.key.clone(),
                            },
                        ));
                    }
                }

                let height = match metadata.get(META_HEIGHT)? {
                    Some(h) => decode_u64(&h).map_err(ConflictableTransactionError::Abort)?,
                    None => 0,
                } + 1;

                for write in &batch.writes {
                    let k = state_key(&write.partition, &write.key);
                    match &write.value {
                        Some(value) => {
                            state.insert(k, encode_entry(height, value))?;
                        }
                        None => {
                            state.remove(k)?;
                        }
                    }
                }

                let record = TxRecord::from_batch(&batch, height);
                let encoded = bincode::serialize(&record).map_err(|e| {
                    ConflictableTransactionError::Abort(LedgerError::Serialization(e.to_string()))
                })?;
                tx_log.insert(record.tx_id.as_bytes(), encoded)?;
                metadata.insert(META_HEIGHT, &height.to_be_bytes())?;
                Ok(record)
            },
        );

        let record = result.map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => LedgerError::Sled(e),
        })?;
        self.db.flush()?;
        Ok(record)
    }

    fn transaction(&self, tx_id: &str) -> LedgerResult<Option<TxRecord>> {
        match self.tx_log.get(tx_id.as_bytes())? {
            Some(bytes) => {
                let record: TxRecord = bincode::deserialize(&bytes)
                    .map_err(|e| LedgerError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn height(&self) -> LedgerResult<u64> {
        match self.metadata.get(META_HEIGHT)? {
            Some(bytes) => decode_u64(&bytes),
            None => Ok(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
