//! # Storage Module
//!
//! The key-value substrate Cloister runs on. Contracts never touch this
//! module directly; they go through [`crate::transaction::TxContext`],
//! which layers partition policy and read/write-set tracking on top.
//!
//! ## Architecture
//!
//! ```text
//! world_state.rs: WorldState trait, versions, commit batches, tx records
//! memory.rs     : In-memory backend for tests and ephemeral peers
//! db.rs         : sled persistence
//! keys.rs       : Composite key encoding
//! policy.rs     : Per-collection membership rules
//! query.rs      : Mango-style rich query evaluator
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! TxContext ──reads──▶ WorldState (committed state only)
//!     │
//!     └──commit──▶ CommitBatch ──apply──▶ WorldState ──▶ TxRecord log
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Values are opaque bytes.** Backends store exactly what they are
//!    given and hash exactly what they store. Two parties who submit the
//!    same bytes get the same SHA-256, and nobody else's encoder gets a say.
//!
//! 2. **Optimistic concurrency.** A commit carries the version of every key
//!    its transaction read. If any of them moved, the whole batch is
//!    rejected. There are no locks held across a transaction.
//!
//! 3. **Bincode for the transaction log.** Values are whatever the caller
//!    sent; the log is ours, and it is compact and deterministic.

pub mod db;
pub mod keys;
pub mod memory;
pub mod policy;
pub mod query;
pub mod world_state;

pub use db::SledWorldState;
pub use keys::{create_composite_key, is_composite_key, split_composite_key, validate_simple_key};
pub use memory::MemoryWorldState;
pub use policy::{CollectionConfig, CollectionDefinition, CollectionPolicy};
pub use query::RichQuery;
pub use world_state::{
    CommitBatch, KvIter, ReadEntry, TxRecord, Version, VersionedValue, WorldState, WriteEntry,
    WriteSummary,
};
