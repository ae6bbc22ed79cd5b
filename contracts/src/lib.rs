//! # Cloister Asset-Transfer Contract
//!
//! Two organizations transfer an asset without either one revealing its
//! valuation to the other or to the shared ledger:
//!
//! - **Assets**: the public record (id, color, size, owner) lives in a
//!   partition every member can read. The owner's appraised value lives in
//!   the owner's private partition.
//! - **Agreements**: a buyer commits its own appraised value to its own
//!   private partition and records its identity against the asset.
//! - **Verification**: the owner's peer compares the content hashes of
//!   the two commitments. Equal hashes mean the parties agreed, and nobody
//!   read anybody else's value to find out.
//! - **Transfer**: ownership moves to the buyer, and the seller's
//!   commitment and the agreement record are removed.
//!
//! ## Design Principles
//!
//! 1. Confidential inputs arrive only through the transient map and are
//!    never logged, echoed in errors, or re-encoded before storage.
//! 2. Every operation takes an explicit [`cloister_protocol::transaction::TxContext`].
//! 3. Every failure is one of the [`error::ErrorKind`]s, tagged with the
//!    operation that raised it.
//! 4. Only the owner may transfer or delete an asset, and private
//!    partitions are written only through a peer of the caller's own
//!    organization.

pub mod agreement;
pub mod asset;
pub mod collection;
pub mod contract;
pub mod error;
pub mod queries;
pub mod records;
pub mod transfer;
pub mod verifier;

pub use contract::{AssetTransferContract, Execution, Function};
pub use error::{ContractError, ContractResult, ErrorKind};
pub use records::{Asset, PrivateDetails};
