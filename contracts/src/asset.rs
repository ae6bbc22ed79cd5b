//! # Asset Records
//!
//! Create, read and delete the public asset record and the owner's private
//! valuation.
//!
//! Creation writes two values: the public [`Asset`] to the shared
//! partition and [`PrivateDetails`] to the creator's private partition.
//! Both land in the same transaction. They are separate values with
//! separate visibility, and other organizations only ever see the second
//! one as a hash.

use cloister_protocol::config::{
    ASSET_COLLECTION, TRANSIENT_ASSET_DELETE, TRANSIENT_ASSET_PROPERTIES,
};
use cloister_protocol::transaction::TxContext;
use tracing::{info, warn};

use crate::collection::verified_org_collection;
use crate::error::{ContractError, ContractResult, LedgerResultExt};
use crate::records::{decode_transient, validate_id, Asset, AssetProperties, DeleteTarget, PrivateDetails};

/// Create an asset from the `asset_properties` transient field. The caller
/// becomes the owner.
pub fn create_asset(ctx: &mut TxContext) -> ContractResult<Asset> {
    const OP: &str = "CreateAsset";

    let props: AssetProperties = decode_transient(ctx, TRANSIENT_ASSET_PROPERTIES, OP)?;
    props.validate(OP)?;
    let collection = verified_org_collection(ctx, OP)?;

    if ctx
        .get_private_data(ASSET_COLLECTION, &props.id)
        .during(OP)?
        .is_some()
    {
        warn!(asset_id = %props.id, "asset already exists");
        return Err(ContractError::Conflict { op: OP, id: props.id });
    }

    let owner = ctx
        .client_identity()
        .map_err(|source| ContractError::Identity { op: OP, source })?
        .id
        .clone();

    let asset = Asset {
        id: props.id.clone(),
        color: props.color.clone(),
        size: props.size,
        owner,
    };
    ctx.put_private_data(ASSET_COLLECTION, &asset.id, asset.to_bytes(OP)?)
        .during(OP)?;

    let details = PrivateDetails {
        id: props.id,
        appraised_value: props.appraised_value,
    };
    let details_bytes = serde_json::to_vec(&details)
        .map_err(|e| ContractError::decode(OP, format!("private details {}", details.id), &e))?;
    ctx.put_private_data(&collection, &details.id, details_bytes)
        .during(OP)?;

    info!(asset_id = %asset.id, %collection, "asset created");
    Ok(asset)
}

/// Public record for `id`.
pub fn read_asset(ctx: &mut TxContext, id: &str) -> ContractResult<Asset> {
    read_asset_as(ctx, id, "ReadAsset")
}

pub(crate) fn read_asset_as(ctx: &mut TxContext, id: &str, op: &'static str) -> ContractResult<Asset> {
    validate_id(op, id)?;
    let bytes = ctx
        .get_private_data(ASSET_COLLECTION, id)
        .during(op)?
        .ok_or_else(|| ContractError::NotFound {
            op,
            what: "asset",
            id: id.to_string(),
        })?;
    Asset::from_bytes(op, id, &bytes)
}

/// Private details for `id` in `collection`. The executing peer must be a
/// member of `collection`.
pub fn read_asset_private_details(
    ctx: &mut TxContext,
    collection: &str,
    id: &str,
) -> ContractResult<PrivateDetails> {
    const OP: &str = "ReadAssetPrivateDetails";

    validate_id(OP, id)?;
    let bytes = ctx
        .get_private_data(collection, id)
        .during(OP)?
        .ok_or_else(|| ContractError::NotFound {
            op: OP,
            what: "private details for asset",
            id: id.to_string(),
        })?;
    PrivateDetails::from_bytes(OP, id, &bytes)
}

/// Delete the asset named by the `asset_delete` transient field, along
/// with the caller's private details for it. Only the owner may delete.
pub fn delete_asset(ctx: &mut TxContext) -> ContractResult<()> {
    const OP: &str = "DeleteAsset";

    let target: DeleteTarget = decode_transient(ctx, TRANSIENT_ASSET_DELETE, OP)?;
    target.validate(OP)?;
    let collection = verified_org_collection(ctx, OP)?;

    let asset = read_asset_as(ctx, &target.id, OP)?;
    let caller = ctx
        .client_identity()
        .map_err(|source| ContractError::Identity { op: OP, source })?;
    if caller.id != asset.owner {
        warn!(asset_id = %asset.id, "delete rejected: caller is not the owner");
        return Err(ContractError::Authorization {
            op: OP,
            reason: format!("submitting client identity does not own asset {}", asset.id),
        });
    }

    ctx.del_private_data(ASSET_COLLECTION, &asset.id).during(OP)?;
    ctx.del_private_data(&collection, &asset.id).during(OP)?;

    info!(asset_id = %asset.id, %collection, "asset deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use cloister_protocol::identity::ClientIdentity;
    use cloister_protocol::storage::{CollectionConfig, MemoryWorldState, WorldState};
    use cloister_protocol::transaction::{Invocation, Peer, TransientMap};
    use std::sync::Arc;

    const PROPS: &str =
        r#"{"objectType":"asset","id":"asset1","color":"blue","size":10,"appraisedValue":100}"#;

    fn peers() -> (Arc<dyn WorldState>, Peer, Peer) {
        let state: Arc<dyn WorldState> = Arc::new(MemoryWorldState::new());
        let cols = Arc::new(CollectionConfig::for_orgs(&["Org1MSP", "Org2MSP"]).unwrap());
        (
            Arc::clone(&state),
            Peer::new("Org1MSP", Arc::clone(&state), Arc::clone(&cols)),
            Peer::new("Org2MSP", state, cols),
        )
    }

    fn alice() -> ClientIdentity {
        ClientIdentity::new("x509::CN=alice::CN=ca.org1", "Org1MSP").unwrap()
    }

    fn bob() -> ClientIdentity {
        ClientIdentity::new("x509::CN=bob::CN=ca.org2", "Org2MSP").unwrap()
    }

    fn invoke(function: &str, who: ClientIdentity, field: &str, payload: &str) -> Invocation {
        Invocation::new(function)
            .identity(who)
            .transient(TransientMap::new().with(field, payload.as_bytes().to_vec()))
    }

    #[test]
    fn create_then_read() {
        let (_, org1, _) = peers();
        let created = org1
            .submit(invoke("CreateAsset", alice(), TRANSIENT_ASSET_PROPERTIES, PROPS), create_asset)
            .unwrap()
            .value;
        assert_eq!(created.owner, alice().id);

        let asset = org1
            .evaluate(Invocation::new("ReadAsset").identity(alice()), |ctx| {
                read_asset(ctx, "asset1")
            })
            .unwrap();
        assert_eq!(asset, created);
        assert_eq!(asset.color, "blue");
        assert_eq!(asset.size, 10);

        let details = org1
            .evaluate(Invocation::new("ReadAssetPrivateDetails").identity(alice()), |ctx| {
                read_asset_private_details(ctx, "Org1MSPPrivateCollection", "asset1")
            })
            .unwrap();
        assert_eq!(details.appraised_value, 100);
    }

    #[test]
    fn duplicate_create_conflicts_without_writing() {
        let (state, org1, _) = peers();
        org1.submit(invoke("CreateAsset", alice(), TRANSIENT_ASSET_PROPERTIES, PROPS), create_asset)
            .unwrap();
        let height = state.height().unwrap();

        let err = org1
            .submit(invoke("CreateAsset", alice(), TRANSIENT_ASSET_PROPERTIES, PROPS), create_asset)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(state.height().unwrap(), height);
    }

    #[test]
    fn missing_transient_field_is_a_validation_error() {
        let (_, org1, _) = peers();
        let err = org1
            .submit(Invocation::new("CreateAsset").identity(alice()), create_asset)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn malformed_transient_payload_is_a_decode_error() {
        let (_, org1, _) = peers();
        let err = org1
            .submit(
                invoke("CreateAsset", alice(), TRANSIENT_ASSET_PROPERTIES, "{not json"),
                create_asset,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn create_through_foreign_peer_is_rejected() {
        let (_, _, org2) = peers();
        let err = org2
            .submit(invoke("CreateAsset", alice(), TRANSIENT_ASSET_PROPERTIES, PROPS), create_asset)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn read_missing_asset() {
        let (_, org1, _) = peers();
        let err = org1
            .evaluate(Invocation::new("ReadAsset").identity(alice()), |ctx| {
                read_asset(ctx, "nope")
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn other_org_cannot_read_private_details() {
        let (_, org1, org2) = peers();
        org1.submit(invoke("CreateAsset", alice(), TRANSIENT_ASSET_PROPERTIES, PROPS), create_asset)
            .unwrap();
        let err = org2
            .evaluate(Invocation::new("ReadAssetPrivateDetails").identity(bob()), |ctx| {
                read_asset_private_details(ctx, "Org1MSPPrivateCollection", "asset1")
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn owner_deletes_asset_and_details() {
        let (state, org1, _) = peers();
        org1.submit(invoke("CreateAsset", alice(), TRANSIENT_ASSET_PROPERTIES, PROPS), create_asset)
            .unwrap();
        org1.submit(
            invoke("DeleteAsset", alice(), TRANSIENT_ASSET_DELETE, r#"{"id":"asset1"}"#),
            delete_asset,
        )
        .unwrap();
        assert!(state.get(ASSET_COLLECTION, "asset1").unwrap().is_none());
        assert!(state
            .get("Org1MSPPrivateCollection", "asset1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn non_owner_cannot_delete() {
        let (state, org1, _) = peers();
        org1.submit(invoke("CreateAsset", alice(), TRANSIENT_ASSET_PROPERTIES, PROPS), create_asset)
            .unwrap();
        let mallory = ClientIdentity::new("x509::CN=mallory::CN=ca.org1", "Org1MSP").unwrap();
        let err = org1
            .submit(
                invoke("DeleteAsset", mallory, TRANSIENT_ASSET_DELETE, r#"{"id":"asset1"}"#),
                delete_asset,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(state.get(ASSET_COLLECTION, "asset1").unwrap().is_some());
    }

    #[test]
    fn delete_missing_asset_is_not_found() {
        let (_, org1, _) = peers();
        let err = org1
            .submit(
                invoke("DeleteAsset", alice(), TRANSIENT_ASSET_DELETE, r#"{"id":"ghost"}"#),
                delete_asset,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
