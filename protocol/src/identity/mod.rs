//! # Caller Identity
//!
//! Authentication happens outside Cloister. By the time an invocation
//! reaches a contract, the surrounding platform has verified the caller's
//! certificate and hands us two strings: an opaque identity id and the id
//! of the organization (membership service) that issued it.
//!
//! The identity id is what gets recorded as an asset `owner`. It is opaque:
//! contracts compare it for equality and never parse it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when the execution context lacks verified credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// No verified identity is attached to the invocation.
    #[error("no verified client identity in transaction context")]
    Missing,

    /// The identity is present but its id is empty.
    #[error("client identity id is empty")]
    EmptyId,

    /// The identity is present but its organization id is empty.
    #[error("client organization id is empty")]
    EmptyOrg,
}

/// A verified caller as asserted by the identity subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdentity {
    /// Opaque identity string, stable for a given certificate.
    pub id: String,
    /// Organization membership id, e.g. `Org1MSP`.
    pub msp_id: String,
}

impl ClientIdentity {
    /// Build an identity, rejecting empty components.
    pub fn new(id: impl Into<String>, msp_id: impl Into<String>) -> Result<Self, IdentityError> {
        let identity = Self {
            id: id.into(),
            msp_id: msp_id.into(),
        };
        identity.validate()?;
        Ok(identity)
    }

    /// Build the conventional x509 identity id: `x509::<subject>::<issuer>`.
    pub fn from_x509(
        subject: &str,
        issuer: &str,
        msp_id: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        Self::new(format!("x509::{subject}::{issuer}"), msp_id)
    }

    /// Check that both components are non-empty. Identities decoded from
    /// the wire bypass [`ClientIdentity::new`], so the transaction context
    /// calls this again before handing the identity to a contract.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.id.is_empty() {
            return Err(IdentityError::EmptyId);
        }
        if self.msp_id.is_empty() {
            return Err(IdentityError::EmptyOrg);
        }
        Ok(())
    }
}
