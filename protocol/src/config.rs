//! # Protocol Configuration & Constants
//!
//! Every name that ends up on the ledger lives here: partition names, the
//! composite-key namespace, transient field names. Renaming any of these
//! after data has been written orphans that data, so treat this file as
//! part of the storage format.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Partitions
// ---------------------------------------------------------------------------

/// The shared partition holding public asset records and transfer
/// agreements. Readable by every member organization.
pub const ASSET_COLLECTION: &str = "assetCollection";

/// Suffix appended to an organization's membership id to name its
/// private partition, e.g. `Org1MSP` -> `Org1MSPPrivateCollection`.
pub const PRIVATE_COLLECTION_SUFFIX: &str = "PrivateCollection";

/// Organizations configured by the built-in devnet collection config.
pub const DEFAULT_ORGS: [&str; 2] = ["Org1MSP", "Org2MSP"];

// ---------------------------------------------------------------------------
// Record Tags & Keys
// ---------------------------------------------------------------------------

/// Discriminator value stored in the `objectType` field of asset records.
pub const ASSET_OBJECT_TYPE: &str = "asset";

/// Namespace tag for buyer agreement records in the shared partition.
pub const TRANSFER_AGREEMENT_NAMESPACE: &str = "transferAgreement";

/// Trailing key part of the agreement sub-record holding the buyer's
/// organization.
pub const AGREEMENT_ORG_PART: &str = "org";

/// Delimiter used by the composite-key encoding. Also prefixes every
/// composite key so that composite keys never collide with plain keys.
pub const COMPOSITE_KEY_DELIMITER: char = '\u{0000}';

/// Highest unicode scalar value. Reserved as a range-scan sentinel and
/// therefore forbidden inside composite-key parts.
pub const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

// ---------------------------------------------------------------------------
// Transient Fields
// ---------------------------------------------------------------------------

/// Transient field carrying the full asset properties for create-asset.
pub const TRANSIENT_ASSET_PROPERTIES: &str = "asset_properties";

/// Transient field carrying the buyer's committed valuation.
pub const TRANSIENT_ASSET_VALUE: &str = "asset_value";

/// Transient field carrying `{id, buyerOrgId}` for transfer-asset.
pub const TRANSIENT_ASSET_OWNER: &str = "asset_owner";

/// Transient field carrying the id for delete-asset.
pub const TRANSIENT_ASSET_DELETE: &str = "asset_delete";

/// Transient field carrying the id for delete-proposal.
pub const TRANSIENT_AGREE_DELETE: &str = "agree_delete";

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Content hash algorithm applied by the substrate to stored bytes.
pub const CONTENT_HASH_ALGORITHM: &str = "SHA-256";

/// Content hash output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Upper bound on records returned by a single rich query when the query
/// itself does not carry a `limit`.
pub const MAX_QUERY_RESULTS: usize = 10_000;

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default JSON-RPC API port.
pub const DEFAULT_RPC_PORT: u16 = 7051;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9443;

/// Name of the private partition owned by `org_id`.
pub fn private_collection_name(org_id: &str) -> String {
    format!("{org_id}{PRIVATE_COLLECTION_SUFFIX}")
}
