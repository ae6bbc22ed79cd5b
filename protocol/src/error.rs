//! Substrate error type shared by every storage backend and the
//! transaction context.

/// Errors that can occur while reading or writing ledger state.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("empty value for key {key:?} in collection {partition}")]
    EmptyValue { partition: String, key: String },

    #[error("invalid collection config: {0}")]
    InvalidCollectionConfig(String),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("organization {org} is not allowed to {action} collection {partition}")]
    AccessDenied {
        org: String,
        partition: String,
        action: &'static str,
    },

    #[error("invalid rich query: {0}")]
    InvalidQuery(String),

    /// Range and rich queries offer no phantom protection, so a
    /// transaction that ran one must stay read-only.
    #[error("transaction {tx_id} executed a range or rich query and cannot write")]
    WriteAfterQuery { tx_id: String },

    #[error("MVCC read conflict on {partition}/{key:?}")]
    MvccConflict { partition: String, key: String },
}

pub type LedgerResult<T> = Result<T, LedgerError>;
