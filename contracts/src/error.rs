//! # Contract Errors
//!
//! One enum for every way an asset-transfer operation can fail. Each
//! variant names the operation that failed and, where there is one, the
//! asset id or input field involved. Appraised values and transient
//! payloads never appear in an error, so messages are safe to return to
//! any caller and to log.

use cloister_protocol::error::LedgerError;
use cloister_protocol::identity::IdentityError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error Kinds
// ---------------------------------------------------------------------------

/// Stable classification of a [`ContractError`], for callers that map
/// failures onto wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Identity,
    Authorization,
    AgreementMismatch,
    Decode,
    Substrate,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Conflict => "ConflictError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Identity => "IdentityError",
            ErrorKind::Authorization => "AuthorizationError",
            ErrorKind::AgreementMismatch => "AgreementMismatchError",
            ErrorKind::Decode => "DecodeError",
            ErrorKind::Substrate => "SubstrateError",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by asset-transfer operations.
#[derive(Debug, Error)]
pub enum ContractError {
    /// A required input is missing or malformed.
    #[error("{op}: invalid {field}: {reason}")]
    Validation {
        op: &'static str,
        field: &'static str,
        reason: String,
    },

    /// The asset already exists.
    #[error("{op}: asset {id} already exists")]
    Conflict { op: &'static str, id: String },

    /// An expected record is absent.
    #[error("{op}: {what} {id} does not exist")]
    NotFound {
        op: &'static str,
        /// Kind of record, e.g. `asset` or `transfer agreement`.
        what: &'static str,
        id: String,
    },

    /// The caller's identity or organization cannot be determined.
    #[error("{op}: {source}")]
    Identity {
        op: &'static str,
        #[source]
        source: IdentityError,
    },

    /// The caller may not perform this action.
    #[error("{op}: {reason}")]
    Authorization { op: &'static str, reason: String },

    /// Seller and buyer committed different private details.
    #[error("{op}: private details for asset {id} differ between {seller_collection} and {buyer_collection}")]
    AgreementMismatch {
        op: &'static str,
        id: String,
        seller_collection: String,
        buyer_collection: String,
    },

    /// Stored or input bytes do not parse.
    #[error("{op}: cannot decode {what}: {reason}")]
    Decode {
        op: &'static str,
        what: String,
        reason: String,
    },

    /// The ledger substrate failed.
    #[error("{op}: {source}")]
    Substrate {
        op: &'static str,
        #[source]
        source: LedgerError,
    },
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::Validation { .. } => ErrorKind::Validation,
            ContractError::Conflict { .. } => ErrorKind::Conflict,
            ContractError::NotFound { .. } => ErrorKind::NotFound,
            ContractError::Identity { .. } => ErrorKind::Identity,
            ContractError::Authorization { .. } => ErrorKind::Authorization,
            ContractError::AgreementMismatch { .. } => ErrorKind::AgreementMismatch,
            ContractError::Decode { .. } => ErrorKind::Decode,
            ContractError::Substrate { .. } => ErrorKind::Substrate,
        }
    }

    /// Name of the operation that failed.
    pub fn op(&self) -> &'static str {
        match self {
            ContractError::Validation { op, .. }
            | ContractError::Conflict { op, .. }
            | ContractError::NotFound { op, .. }
            | ContractError::Identity { op, .. }
            | ContractError::Authorization { op, .. }
            | ContractError::AgreementMismatch { op, .. }
            | ContractError::Decode { op, .. }
            | ContractError::Substrate { op, .. } => *op,
        }
    }

    /// Whether this is an optimistic-concurrency failure at commit.
    pub fn is_mvcc_conflict(&self) -> bool {
        matches!(
            self,
            ContractError::Substrate {
                source: LedgerError::MvccConflict { .. },
                ..
            }
        )
    }

    /// Wrap a substrate failure. Partition access denials are
    /// authorization failures; everything else passes through opaquely.
    pub fn ledger(op: &'static str, err: LedgerError) -> Self {
        match err {
            LedgerError::AccessDenied { .. } => ContractError::Authorization {
                op,
                reason: err.to_string(),
            },
            source => ContractError::Substrate { op, source },
        }
    }

    pub(crate) fn validation(op: &'static str, field: &'static str, reason: &str) -> Self {
        ContractError::Validation {
            op,
            field,
            reason: reason.to_string(),
        }
    }

    /// Describe a JSON failure by category and position only. serde_json
    /// messages can quote the offending input, which may be confidential.
    pub(crate) fn decode(op: &'static str, what: impl Into<String>, err: &serde_json::Error) -> Self {
        ContractError::Decode {
            op,
            what: what.into(),
            reason: format!(
                "{:?} error at line {} column {}",
                err.classify(),
                err.line(),
                err.column()
            ),
        }
    }
}

/// Failures surfacing from [`cloister_protocol::transaction::Peer::submit`]
/// happen while committing.
impl From<LedgerError> for ContractError {
    fn from(err: LedgerError) -> Self {
        ContractError::ledger("commit", err)
    }
}

pub type ContractResult<T> = Result<T, ContractError>;

/// Attach an operation name to a substrate result.
pub trait LedgerResultExt<T> {
    fn during(self, op: &'static str) -> ContractResult<T>;
}

impl<T> LedgerResultExt<T> for Result<T, LedgerError> {
    fn during(self, op: &'static str) -> ContractResult<T> {
        self.map_err(|e| ContractError::ledger(op, e))
    }
}
