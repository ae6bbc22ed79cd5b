//! # Agreement Verification
//!
//! The check at the heart of a transfer. The seller's peer asks the
//! substrate for the hash of the seller's private details and the hash of
//! the buyer's committed valuation, and compares them. It never sees the
//! buyer's value, only its hash. Equal hashes mean both sides committed the
//! same bytes.

use cloister_protocol::config::private_collection_name;
use cloister_protocol::error::LedgerError;
use cloister_protocol::transaction::TxContext;
use tracing::{debug, warn};

use crate::collection::verified_org_collection;
use crate::error::{ContractError, ContractResult, LedgerResultExt};

/// Succeed only if the caller is `recorded_owner` and the seller and buyer
/// partitions hold byte-identical commitments for `id`.
pub fn verify_agreement(
    ctx: &mut TxContext,
    op: &'static str,
    id: &str,
    recorded_owner: &str,
    buyer_org_id: &str,
) -> ContractResult<()> {
    let caller = ctx
        .client_identity()
        .map_err(|source| ContractError::Identity { op, source })?;
    if caller.id != recorded_owner {
        warn!(asset_id = id, "transfer rejected: caller is not the owner");
        return Err(ContractError::Authorization {
            op,
            reason: format!("submitting client identity does not own asset {id}"),
        });
    }

    let seller_collection = verified_org_collection(ctx, op)?;
    let buyer_collection = private_collection_name(buyer_org_id);

    let seller_hash = ctx
        .get_private_data_hash(&seller_collection, id)
        .during(op)?
        .ok_or_else(|| ContractError::NotFound {
            op,
            what: "seller commitment for asset",
            id: id.to_string(),
        })?;

    let buyer_hash = match ctx.get_private_data_hash(&buyer_collection, id) {
        Ok(hash) => hash,
        Err(LedgerError::UnknownCollection(_)) => {
            return Err(ContractError::validation(
                op,
                "buyerOrgId",
                "names no configured organization",
            ))
        }
        Err(e) => return Err(ContractError::ledger(op, e)),
    }
    .ok_or_else(|| ContractError::NotFound {
        op,
        what: "buyer commitment for asset",
        id: id.to_string(),
    })?;

    if seller_hash != buyer_hash {
        warn!(
            asset_id = id,
            seller = %seller_hash.short(),
            buyer = %buyer_hash.short(),
            "commitment hashes differ"
        );
        return Err(ContractError::AgreementMismatch {
            op,
            id: id.to_string(),
            seller_collection,
            buyer_collection,
        });
    }

    debug!(asset_id = id, hash = %seller_hash.short(), "commitments match");
    Ok(())
}
