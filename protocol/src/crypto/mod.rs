//! # Cryptographic Primitives
//!
//! Cloister does no encryption. Confidentiality comes from partition
//! scoping; agreement comes from comparing content hashes. The only
//! primitive needed is therefore a collision-resistant hash, and we use the
//! same one the substrate uses.

pub mod hash;

pub use hash::{sha256, ContentHash};
