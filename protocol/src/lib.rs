// Copyright (c) 2026 Cloister Contributors. MIT License.
// See LICENSE for details.

//! # Cloister Protocol Core Library
//!
//! The ledger side of Cloister: partitioned, access-scoped key-value state
//! with content hashing, the transaction context contracts run in, and the
//! identity types the surrounding platform hands us.
//!
//! Confidentiality comes from partition scoping, not encryption. An
//! organization's private partition is readable only on that
//! organization's peers; everyone else can ask for the SHA-256 of a value
//! and nothing more. Two parties prove they agree on a secret by storing
//! the same bytes in their own partitions and comparing hashes.
//!
//! ## Architecture
//!
//! - **config**: Partition names, transient field names, ports, limits.
//! - **crypto**: SHA-256 content hashing.
//! - **error**: `LedgerError`, the substrate failure type.
//! - **identity**: The verified caller as asserted by the platform.
//! - **storage**: The `WorldState` trait, memory and sled backends,
//!   composite keys, collection policy, rich queries.
//! - **transaction**: `TxContext`, `Peer`, and transient inputs.
//!
//! ## Design Philosophy
//!
//! 1. Stored bytes are never re-encoded. The hash is over what was sent.
//! 2. Contracts get an explicit context. Nothing is ambient.
//! 3. Confidential values never reach a log line or an error message.

pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod storage;
pub mod transaction;

pub use error::{LedgerError, LedgerResult};
