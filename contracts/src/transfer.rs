//! # Transfer
//!
//! Reassigns ownership once both sides have committed matching valuations.
//! All of it happens in one transaction: if any step fails, the context is
//! dropped and none of the buffered writes reach the ledger.

use cloister_protocol::config::{ASSET_COLLECTION, TRANSIENT_ASSET_OWNER};
use cloister_protocol::transaction::TxContext;
use tracing::{info, warn};

use crate::agreement::{agreement_key, agreement_org_key, read_agreement_record};
use crate::asset::read_asset_as;
use crate::collection::verified_org_collection;
use crate::error::{ContractError, ContractResult, LedgerResultExt};
use crate::records::{decode_transient, Asset, TransferTarget};
use crate::verifier::verify_agreement;

/// Transfer the asset named by the `asset_owner` transient field to the
/// buyer recorded in its transfer agreement.
///
/// The agreement must have been made from `buyerOrgId`, the organization
/// whose commitment was verified. An agreement recorded from any other
/// organization is an authorization failure.
///
/// Afterwards the asset is owned by the buyer, the seller's private
/// details and both agreement records are gone, and the buyer's committed
/// valuation stays where it is.
pub fn transfer_asset(ctx: &mut TxContext) -> ContractResult<Asset> {
    const OP: &str = "TransferAsset";

    let target: TransferTarget = decode_transient(ctx, TRANSIENT_ASSET_OWNER, OP)?;
    target.validate(OP)?;

    let mut asset = read_asset_as(ctx, &target.id, OP)?;
    verify_agreement(ctx, OP, &asset.id, &asset.owner, &target.buyer_org_id)?;
    let agreement = read_agreement_record(ctx, &asset.id, OP)?;
    if agreement.buyer_org.as_deref() != Some(target.buyer_org_id.as_str()) {
        warn!(
            asset_id = %asset.id,
            buyer_org = %target.buyer_org_id,
            "transfer rejected: agreement was not made from the buyer organization"
        );
        return Err(ContractError::Authorization {
            op: OP,
            reason: format!(
                "transfer agreement for asset {} was not made from {}",
                asset.id, target.buyer_org_id
            ),
        });
    }

    asset.owner = agreement.buyer;
    ctx.put_private_data(ASSET_COLLECTION, &asset.id, asset.to_bytes(OP)?)
        .during(OP)?;

    let seller_collection = verified_org_collection(ctx, OP)?;
    ctx.del_private_data(&seller_collection, &asset.id)
        .during(OP)?;

    let key = agreement_key(OP, &asset.id)?;
    ctx.del_private_data(ASSET_COLLECTION, &key).during(OP)?;
    let org_key = agreement_org_key(OP, &asset.id)?;
    ctx.del_private_data(ASSET_COLLECTION, &org_key).during(OP)?;

    info!(
        asset_id = %asset.id,
        buyer_org = %target.buyer_org_id,
        "asset transferred"
    );
    Ok(asset)
}
