//! In-memory [`WorldState`] for tests and ephemeral peers.
//!
//! One `BTreeMap` per partition behind a single `RwLock`. Range results are
//! snapshotted under the read lock, so iterators never observe a commit
//! that lands while they are being consumed.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use super::world_state::{CommitBatch, KvIter, TxRecord, Version, VersionedValue, WorldState};
use crate::crypto::ContentHash;
use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    hash: ContentHash,
    version: Version,
}

#[derive(Debug, Default)]
struct Inner {
    partitions: HashMap<String, BTreeMap<String, Entry>>,
    log: Vec<TxRecord>,
    log_index: HashMap<String, usize>,
}

impl Inner {
    fn version_of(&self, partition: &str, key: &str) -> Option<Version> {
        self.partitions
            .get(partition)
            .and_then(|p| p.get(key))
            .map(|e| e.version)
    }

    fn height(&self) -> u64 {
        self.log.last().map(|r| r.height).unwrap_or(0)
    }
}

/// Volatile world state. Cloning is not supported; share it via `Arc`.
#[derive(Debug, Default)]
pub struct MemoryWorldState {
    inner: RwLock<Inner>,
}

impl MemoryWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(
        &self,
        partition: &str,
        lower: Bound<&str>,
        upper: Bound<&str>,
    ) -> Vec<LedgerResult<(String, Vec<u8>)>> {
        let inner = self.inner.read();
        match inner.partitions.get(partition) {
            Some(map) => map
                .range::<str, _>((lower, upper))
                .map(|(k, e)| Ok((k.clone(), e.value.clone())))
                .collect(),
            None => Vec::new(),
        }
    }
}

impl WorldState for MemoryWorldState {
    fn get(&self, partition: &str, key: &str) -> LedgerResult<Option<VersionedValue>> {
        let inner = self.inner.read();
        Ok(inner
            .partitions
            .get(partition)
            .and_then(|p| p.get(key))
            .map(|e| VersionedValue {
                value: e.value.clone(),
                version: e.version,
            }))
    }

    fn get_hash(
        &self,
        partition: &str,
        key: &str,
    ) -> LedgerResult<Option<(ContentHash, Version)>> {
        let inner = self.inner.read();
        Ok(inner
            .partitions
            .get(partition)
            .and_then(|p| p.get(key))
            .map(|e| (e.hash, e.version)))
    }

    fn range<'a>(&'a self, partition: &str, start: &str, end: &str) -> LedgerResult<KvIter<'a>> {
        if !end.is_empty() && start >= end {
            return Ok(Box::new(std::iter::empty()));
        }
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end)
        };
        let items = self.snapshot(partition, Bound::Included(start), upper);
        Ok(Box::new(items.into_iter()))
    }

    fn scan<'a>(&'a self, partition: &str) -> LedgerResult<KvIter<'a>> {
        let items = self.snapshot(partition, Bound::Unbounded, Bound::Unbounded);
        Ok(Box::new(items.into_iter()))
    }

    fn apply(&self, batch: CommitBatch) -> LedgerResult<TxRecord> {
        let mut inner = self.inner.write();

        for read in &batch.reads {
            if inner.version_of(&read.partition, &read.key) != read.version {
                return Err(LedgerError::MvccConflict {
                    partition: read.partition.clone(),
                    key: read.key.clone(),
                });
            }
        }

        let height = inner.height() + 1;
        let record = TxRecord::from_batch(&batch, height);

        for write in batch.writes {
            let partition = inner.partitions.entry(write.partition).or_default();
            match write.value {
                Some(value) => {
                    let hash = ContentHash::of(&value);
                    partition.insert(
                        write.key,
                        Entry {
                            value,
                            hash,
                            version: height,
                        },
                    );
                }
                None => {
                    partition.remove(&write.key);
                }
            }
        }

        let idx = inner.log.len();
        inner.log_index.insert(record.tx_id.clone(), idx);
        inner.log.push(record.clone());
        Ok(record)
    }

    fn transaction(&self, tx_id: &str) -> LedgerResult<Option<TxRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .log_index
            .get(tx_id)
            .and_then(|&i| inner.log.get(i))
            .cloned())
    }

    fn height(&self) -> LedgerResult<u64> {
        Ok(self.inner.read().height())
    }
}
