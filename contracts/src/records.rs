//! # Records and Inputs
//!
//! Stored record shapes and the transient payloads that create them.
//!
//! The shared partition holds more than one kind of value, so public
//! records carry an `objectType` discriminator and are decoded through
//! [`LedgerRecord`]. A value whose tag is missing or unknown is a decode
//! failure, never a best-effort guess.
//!
//! Types that can hold an appraised value implement `Debug` by hand so the
//! value never ends up in a log line or a panic message.

use cloister_protocol::config::TRANSIENT_ASSET_VALUE;
use cloister_protocol::storage::keys::validate_simple_key;
use cloister_protocol::transaction::TxContext;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ContractError, ContractResult};

// ---------------------------------------------------------------------------
// Stored Records
// ---------------------------------------------------------------------------

/// Public asset record, readable by every member organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub color: String,
    pub size: i64,
    /// Identity id of the current owner.
    pub owner: String,
}

/// Every record kind that lives in the shared partition under a plain key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "objectType")]
pub enum LedgerRecord {
    #[serde(rename = "asset")]
    Asset(Asset),
}

impl Asset {
    /// Encode with the `objectType` tag.
    pub fn to_bytes(&self, op: &'static str) -> ContractResult<Vec<u8>> {
        serde_json::to_vec(&LedgerRecord::Asset(self.clone()))
            .map_err(|e| ContractError::decode(op, format!("asset {}", self.id), &e))
    }

    /// JSON form as stored, including `objectType`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "objectType": cloister_protocol::config::ASSET_OBJECT_TYPE,
            "id": self.id,
            "color": self.color,
            "size": self.size,
            "owner": self.owner,
        })
    }

    /// Decode a stored value, requiring the `asset` tag.
    pub fn from_bytes(op: &'static str, id: &str, bytes: &[u8]) -> ContractResult<Self> {
        match serde_json::from_slice::<LedgerRecord>(bytes) {
            Ok(LedgerRecord::Asset(asset)) => Ok(asset),
            Err(e) => Err(ContractError::decode(op, format!("asset {id}"), &e)),
        }
    }
}

/// An organization's private valuation of an asset.
///
/// For sellers this is written by create-asset. For buyers it is whatever
/// bytes they sent to agree-to-transfer, stored untouched. Both sides must
/// use the same field names or the hashes can never match, so this type
/// takes no aliases.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateDetails {
    pub id: String,
    pub appraised_value: i64,
}

/// Field names of a stored valuation, in the order the seller's copy is
/// encoded.
const PRIVATE_DETAILS_FIELDS: [&str; 2] = ["id", "appraisedValue"];

impl fmt::Debug for PrivateDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateDetails")
            .field("id", &self.id)
            .field("appraised_value", &"<redacted>")
            .finish()
    }
}

impl PrivateDetails {
    pub fn from_bytes(op: &'static str, id: &str, bytes: &[u8]) -> ContractResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| ContractError::decode(op, format!("private details {id}"), &e))
    }

    /// Decode a buyer's valuation from the raw `asset_value` payload.
    ///
    /// The payload is stored as-is, so it must be an object with exactly
    /// the fields the seller's copy has. Anything else could never hash
    /// equal and is refused here instead of failing later at transfer.
    pub fn from_commitment(op: &'static str, raw: &[u8]) -> ContractResult<Self> {
        let value: serde_json::Value = serde_json::from_slice(raw).map_err(|e| {
            ContractError::decode(op, format!("transient field {TRANSIENT_ASSET_VALUE}"), &e)
        })?;
        let canonical = value.as_object().is_some_and(|fields| {
            fields.len() == PRIVATE_DETAILS_FIELDS.len()
                && PRIVATE_DETAILS_FIELDS.iter().all(|f| fields.contains_key(*f))
        });
        if !canonical {
            return Err(ContractError::validation(
                op,
                TRANSIENT_ASSET_VALUE,
                r#"must be a JSON object with exactly the fields {"id","appraisedValue"}"#,
            ));
        }
        let details: Self = serde_json::from_value(value).map_err(|e| {
            ContractError::decode(op, format!("transient field {TRANSIENT_ASSET_VALUE}"), &e)
        })?;
        details.validate(op)?;
        Ok(details)
    }

    pub fn validate(&self, op: &'static str) -> ContractResult<()> {
        validate_id(op, &self.id)?;
        if self.appraised_value <= 0 {
            return Err(ContractError::validation(
                op,
                "appraisedValue",
                "must be a positive integer",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transient Inputs
// ---------------------------------------------------------------------------

/// Payload of `asset_properties`. Missing fields decode to empty values and
/// are caught by [`AssetProperties::validate`].
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetProperties {
    #[serde(alias = "object_type", alias = "type")]
    pub object_type: String,
    #[serde(alias = "asset_id")]
    pub id: String,
    pub color: String,
    pub size: i64,
    #[serde(alias = "appraised_value")]
    pub appraised_value: i64,
}

impl fmt::Debug for AssetProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetProperties")
            .field("object_type", &self.object_type)
            .field("id", &self.id)
            .field("color", &self.color)
            .field("size", &self.size)
            .field("appraised_value", &"<redacted>")
            .finish()
    }
}

impl AssetProperties {
    pub fn validate(&self, op: &'static str) -> ContractResult<()> {
        if self.object_type.is_empty() {
            return Err(ContractError::validation(op, "objectType", "must be a non-empty string"));
        }
        if self.object_type != cloister_protocol::config::ASSET_OBJECT_TYPE {
            return Err(ContractError::validation(op, "objectType", "must be \"asset\""));
        }
        validate_id(op, &self.id)?;
        if self.color.is_empty() {
            return Err(ContractError::validation(op, "color", "must be a non-empty string"));
        }
        if self.size <= 0 {
            return Err(ContractError::validation(op, "size", "must be a positive integer"));
        }
        if self.appraised_value <= 0 {
            return Err(ContractError::validation(
                op,
                "appraisedValue",
                "must be a positive integer",
            ));
        }
        Ok(())
    }
}

/// Payload of `asset_owner`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferTarget {
    #[serde(alias = "asset_id")]
    pub id: String,
    #[serde(alias = "buyer_msp")]
    pub buyer_org_id: String,
}

impl TransferTarget {
    pub fn validate(&self, op: &'static str) -> ContractResult<()> {
        validate_id(op, &self.id)?;
        if self.buyer_org_id.is_empty() {
            return Err(ContractError::validation(op, "buyerOrgId", "must be a non-empty string"));
        }
        Ok(())
    }
}

/// Payload of `asset_delete` and `agree_delete`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteTarget {
    #[serde(alias = "asset_id")]
    pub id: String,
}

impl DeleteTarget {
    pub fn validate(&self, op: &'static str) -> ContractResult<()> {
        validate_id(op, &self.id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Asset ids are plain keys: non-empty and outside the composite-key
/// namespace.
pub fn validate_id(op: &'static str, id: &str) -> ContractResult<()> {
    if id.is_empty() {
        return Err(ContractError::validation(op, "id", "must be a non-empty string"));
    }
    validate_simple_key(id)
        .map_err(|_| ContractError::validation(op, "id", "must not start with U+0000"))
}

/// Raw bytes of a required transient field.
pub fn transient_bytes<'a>(
    ctx: &'a TxContext,
    field: &'static str,
    op: &'static str,
) -> ContractResult<&'a [u8]> {
    ctx.transient()
        .get(field)
        .ok_or_else(|| ContractError::validation(op, field, "not found in the transient map"))
}

/// Decode a required transient field as JSON.
pub fn decode_transient<T: DeserializeOwned>(
    ctx: &TxContext,
    field: &'static str,
    op: &'static str,
) -> ContractResult<T> {
    let bytes = transient_bytes(ctx, field, op)?;
    serde_json::from_slice(bytes)
        .map_err(|e| ContractError::decode(op, format!("transient field {field}"), &e))
}
