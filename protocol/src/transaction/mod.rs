//! # Transaction Module
//!
//! Execution of contract invocations against the world state.
//!
//! ## Architecture
//!
//! ```text
//! transient.rs: Side-channel inputs, never logged or persisted
//! context.rs  : TxContext: buffered reads/writes, policy checks, commit
//! peer.rs     : Peer: one org's entry point, submit vs. evaluate
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Begin**: [`Peer::begin`] opens a [`TxContext`] with a fresh id.
//! 2. **Execute**: The contract reads committed state and buffers writes.
//! 3. **Commit**: [`TxContext::commit`] hands the read and write sets to
//!    the backend, which applies them atomically or rejects them on a
//!    version conflict.
//! 4. **Log**: The backend appends a [`crate::storage::TxRecord`] holding
//!    value hashes only.
//!
//! A contract error at step 2 drops the context and nothing is written.

pub mod context;
pub mod peer;
pub mod transient;

pub use context::{Invocation, TxContext};
pub use peer::{Peer, Submitted};
pub use transient::TransientMap;
