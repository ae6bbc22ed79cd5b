//! # Transaction Context
//!
//! Every contract operation receives a `&mut TxContext`. It is the only
//! door to ledger state, and it is passed explicitly rather than looked up
//! from anywhere ambient.
//!
//! ## Semantics
//!
//! - Reads see committed state only. A value written earlier in the same
//!   transaction is not visible until the transaction commits.
//! - Every point read and hash read records the version it observed. At
//!   commit the backend rejects the whole write set if any of those
//!   versions moved.
//! - Range and rich queries are not protected against phantoms. Once a
//!   transaction has run one, it may not write.
//! - Reads of a partition require the executing peer's organization to be
//!   a member. Writes require the client's organization to be a member.
//!   Hash reads only require the partition to exist.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::transient::TransientMap;
use crate::config::MAX_QUERY_RESULTS;
use crate::crypto::ContentHash;
use crate::error::{LedgerError, LedgerResult};
use crate::identity::{ClientIdentity, IdentityError};
use crate::storage::policy::CollectionConfig;
use crate::storage::query::RichQuery;
use crate::storage::world_state::{
    CommitBatch, KvIter, ReadEntry, TxRecord, Version, WorldState, WriteEntry,
};

/// What the caller asked for: function name, asserted identity, and
/// side-channel inputs.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub function: String,
    pub identity: Option<ClientIdentity>,
    pub transient: TransientMap,
}

impl Invocation {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Self::default()
        }
    }

    pub fn identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn transient(mut self, transient: TransientMap) -> Self {
        self.transient = transient;
        self
    }
}

type SlotKey = (String, String);

/// Buffered view of the world state for one transaction.
pub struct TxContext {
    tx_id: String,
    invocation: Invocation,
    peer_org: String,
    state: Arc<dyn WorldState>,
    collections: Arc<CollectionConfig>,
    reads: BTreeMap<SlotKey, Option<Version>>,
    writes: BTreeMap<SlotKey, Option<Vec<u8>>>,
    queried: bool,
}

impl std::fmt::Debug for TxContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxContext")
            .field("tx_id", &self.tx_id)
            .field("function", &self.invocation.function)
            .field("peer_org", &self.peer_org)
            .field("reads", &self.reads.len())
            .field("writes", &self.writes.len())
            .field("queried", &self.queried)
            .finish()
    }
}

impl TxContext {
    /// Start a transaction on a peer of `peer_org`. The id is a fresh v4
    /// UUID.
    pub fn new(
        invocation: Invocation,
        peer_org: impl Into<String>,
        state: Arc<dyn WorldState>,
        collections: Arc<CollectionConfig>,
    ) -> Self {
        Self {
            tx_id: uuid::Uuid::new_v4().simple().to_string(),
            invocation,
            peer_org: peer_org.into(),
            state,
            collections,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
            queried: false,
        }
    }

    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    pub fn function(&self) -> &str {
        &self.invocation.function
    }

    /// Organization hosting the executing peer.
    pub fn peer_org(&self) -> &str {
        &self.peer_org
    }

    /// The verified caller.
    pub fn client_identity(&self) -> Result<&ClientIdentity, IdentityError> {
        let identity = self
            .invocation
            .identity
            .as_ref()
            .ok_or(IdentityError::Missing)?;
        identity.validate()?;
        Ok(identity)
    }

    /// Side-channel inputs for this invocation.
    pub fn transient(&self) -> &TransientMap {
        &self.invocation.transient
    }

    /// Whether a range or rich query has run in this transaction.
    pub fn is_read_only(&self) -> bool {
        self.queried
    }

    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    fn client_org(&self) -> &str {
        self.invocation
            .identity
            .as_ref()
            .map(|i| i.msp_id.as_str())
            .unwrap_or_default()
    }

    fn record_read(&mut self, partition: &str, key: &str, version: Option<Version>) {
        self.reads
            .entry((partition.to_string(), key.to_string()))
            .or_insert(version);
    }

    fn check_writable(&self, partition: &str, key: &str) -> LedgerResult<()> {
        if self.queried {
            return Err(LedgerError::WriteAfterQuery {
                tx_id: self.tx_id.clone(),
            });
        }
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("key must be non-empty".into()));
        }
        self.collections.check_write(partition, self.client_org())
    }

    // -----------------------------------------------------------------------
    // Point reads
    // -----------------------------------------------------------------------

    /// Committed value at `key` in `partition`.
    pub fn get_private_data(&mut self, partition: &str, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.collections.check_read(partition, &self.peer_org)?;
        let found = self.state.get(partition, key)?;
        debug!(
            tx_id = %self.tx_id,
            partition,
            key,
            found = found.is_some(),
            "get private data"
        );
        self.record_read(partition, key, found.as_ref().map(|v| v.version));
        Ok(found.map(|v| v.value))
    }

    /// SHA-256 of the committed value at `key`. Available for any known
    /// partition, member or not.
    pub fn get_private_data_hash(
        &mut self,
        partition: &str,
        key: &str,
    ) -> LedgerResult<Option<ContentHash>> {
        self.collections.policy(partition)?;
        let found = self.state.get_hash(partition, key)?;
        debug!(
            tx_id = %self.tx_id,
            partition,
            key,
            hash = %found.as_ref().map(|(h, _)| h.short()).unwrap_or_default(),
            "get private data hash"
        );
        self.record_read(partition, key, found.as_ref().map(|(_, v)| *v));
        Ok(found.map(|(h, _)| h))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Buffer a write. Empty values are rejected; use
    /// [`TxContext::del_private_data`] to remove a key.
    pub fn put_private_data(&mut self, partition: &str, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        self.check_writable(partition, key)?;
        if value.is_empty() {
            return Err(LedgerError::EmptyValue {
                partition: partition.to_string(),
                key: key.to_string(),
            });
        }
        debug!(tx_id = %self.tx_id, partition, key, len = value.len(), "put private data");
        self.writes
            .insert((partition.to_string(), key.to_string()), Some(value));
        Ok(())
    }

    /// Buffer a delete. Deleting an absent key is not an error.
    pub fn del_private_data(&mut self, partition: &str, key: &str) -> LedgerResult<()> {
        self.check_writable(partition, key)?;
        debug!(tx_id = %self.tx_id, partition, key, "delete private data");
        self.writes
            .insert((partition.to_string(), key.to_string()), None);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Keys in `[start, end)`. An empty `start` begins after the
    /// composite-key namespace; an empty `end` is unbounded. Marks the
    /// transaction read-only.
    pub fn get_private_data_by_range(
        &mut self,
        partition: &str,
        start: &str,
        end: &str,
    ) -> LedgerResult<KvIter<'_>> {
        self.collections.check_read(partition, &self.peer_org)?;
        self.queried = true;
        let start = if start.is_empty() { "\u{1}" } else { start };
        debug!(tx_id = %self.tx_id, partition, start, end, "range query");
        self.state.range(partition, start, end)
    }

    /// Documents in `partition` matching a rich query. At most the query's
    /// `limit` results (capped at [`MAX_QUERY_RESULTS`]) are returned.
    /// Marks the transaction read-only.
    pub fn get_private_data_query_result(
        &mut self,
        partition: &str,
        query: &str,
    ) -> LedgerResult<KvIter<'_>> {
        self.get_private_data_query_result_where(partition, query, |_| true)
    }

    /// Like [`get_private_data_query_result`](Self::get_private_data_query_result),
    /// but only values accepted by `keep` are returned and count towards the
    /// `limit`.
    pub fn get_private_data_query_result_where(
        &mut self,
        partition: &str,
        query: &str,
        keep: fn(&[u8]) -> bool,
    ) -> LedgerResult<KvIter<'_>> {
        self.collections.check_read(partition, &self.peer_org)?;
        let parsed = RichQuery::parse(query)?;
        self.queried = true;
        let limit = parsed
            .limit()
            .map_or(MAX_QUERY_RESULTS, |l| l.min(MAX_QUERY_RESULTS));
        debug!(tx_id = %self.tx_id, partition, limit, "rich query");

        let iter = self.state.scan(partition)?.filter(move |item| match item {
            Ok((_, value)) => parsed.matches_bytes(value) && keep(value),
            Err(_) => true,
        });
        Ok(Box::new(iter.take(limit)))
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Apply the buffered writes atomically.
    pub fn commit(self) -> LedgerResult<TxRecord> {
        let creator = self
            .invocation
            .identity
            .as_ref()
            .map(|i| (i.id.clone(), i.msp_id.clone()))
            .unwrap_or_default();

        let batch = CommitBatch {
            tx_id: self.tx_id,
            function: self.invocation.function,
            creator: creator.0,
            creator_msp: creator.1,
            reads: self
                .reads
                .into_iter()
                .map(|((partition, key), version)| ReadEntry {
                    partition,
                    key,
                    version,
                })
                .collect(),
            writes: self
                .writes
                .into_iter()
                .map(|((partition, key), value)| WriteEntry {
                    partition,
                    key,
                    value,
                })
                .collect(),
        };

        let record = self.state.apply(batch)?;
        info!(
            tx_id = %record.tx_id,
            function = %record.function,
            height = record.height,
            writes = record.writes.len(),
            "transaction committed"
        );
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
