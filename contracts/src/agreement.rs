//! # Transfer Agreements
//!
//! A buyer agrees to a transfer by committing a valuation to its own
//! private partition and recording its identity in the shared partition
//! under the composite key `("transferAgreement", id)`. The buyer's
//! organization sits next to it at `("transferAgreement", id, "org")`, so
//! a transfer can check that the identity it hands the asset to belongs to
//! the organization whose commitment it verified. The keys are
//! deterministic, so there is at most one live agreement per asset and a
//! second agreement replaces the first.
//!
//! The buyer's valuation is stored as the exact bytes it sent. The seller
//! later compares hashes, and any re-encoding here (key order, spacing,
//! number formatting) would make equal valuations hash differently.

use cloister_protocol::config::{
    AGREEMENT_ORG_PART, ASSET_COLLECTION, TRANSFER_AGREEMENT_NAMESPACE, TRANSIENT_AGREE_DELETE,
    TRANSIENT_ASSET_VALUE,
};
use cloister_protocol::storage::keys::create_composite_key;
use cloister_protocol::transaction::TxContext;
use tracing::{info, warn};

use crate::collection::verified_org_collection;
use crate::error::{ContractError, ContractResult, LedgerResultExt};
use crate::records::{decode_transient, transient_bytes, validate_id, DeleteTarget, PrivateDetails};

/// The identity and organization recorded by the last agree-to-transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementRecord {
    pub buyer: String,
    /// `None` when the organization sub-record is missing.
    pub buyer_org: Option<String>,
}

/// Shared-partition key of the agreement record for `id`.
pub fn agreement_key(op: &'static str, id: &str) -> ContractResult<String> {
    create_composite_key(TRANSFER_AGREEMENT_NAMESPACE, &[id])
        .map_err(|_| ContractError::validation(op, "id", "contains a reserved character"))
}

/// Shared-partition key of the buyer-organization sub-record for `id`.
pub fn agreement_org_key(op: &'static str, id: &str) -> ContractResult<String> {
    create_composite_key(TRANSFER_AGREEMENT_NAMESPACE, &[id, AGREEMENT_ORG_PART])
        .map_err(|_| ContractError::validation(op, "id", "contains a reserved character"))
}

/// Record the caller's agreement to buy, from the `asset_value` transient
/// field.
pub fn agree_to_transfer(ctx: &mut TxContext) -> ContractResult<()> {
    const OP: &str = "AgreeToTransfer";

    let caller = ctx
        .client_identity()
        .map_err(|source| ContractError::Identity { op: OP, source })?;
    let (buyer, buyer_org) = (caller.id.clone(), caller.msp_id.clone());

    let raw = transient_bytes(ctx, TRANSIENT_ASSET_VALUE, OP)?.to_vec();
    // Decoded only to validate. What gets stored is `raw`.
    let value = PrivateDetails::from_commitment(OP, &raw)?;

    let collection = verified_org_collection(ctx, OP)?;
    let key = agreement_key(OP, &value.id)?;
    let org_key = agreement_org_key(OP, &value.id)?;

    ctx.put_private_data(&collection, &value.id, raw).during(OP)?;
    ctx.put_private_data(ASSET_COLLECTION, &key, buyer.into_bytes())
        .during(OP)?;
    ctx.put_private_data(ASSET_COLLECTION, &org_key, buyer_org.into_bytes())
        .during(OP)?;

    info!(asset_id = %value.id, %collection, "transfer agreement recorded");
    Ok(())
}

/// Identity of the buyer that agreed to purchase `id`.
pub fn read_transfer_agreement(ctx: &mut TxContext, id: &str) -> ContractResult<String> {
    read_transfer_agreement_as(ctx, id, "ReadTransferAgreement")
}

pub(crate) fn read_transfer_agreement_as(
    ctx: &mut TxContext,
    id: &str,
    op: &'static str,
) -> ContractResult<String> {
    validate_id(op, id)?;
    let key = agreement_key(op, id)?;
    let bytes = ctx
        .get_private_data(ASSET_COLLECTION, &key)
        .during(op)?
        .ok_or_else(|| ContractError::NotFound {
            op,
            what: "transfer agreement for asset",
            id: id.to_string(),
        })?;
    utf8_field(op, id, bytes, "buyer identity")
}

/// Buyer identity together with the organization it agreed from.
pub(crate) fn read_agreement_record(
    ctx: &mut TxContext,
    id: &str,
    op: &'static str,
) -> ContractResult<AgreementRecord> {
    let buyer = read_transfer_agreement_as(ctx, id, op)?;
    let org_key = agreement_org_key(op, id)?;
    let buyer_org = ctx
        .get_private_data(ASSET_COLLECTION, &org_key)
        .during(op)?
        .map(|bytes| utf8_field(op, id, bytes, "buyer organization"))
        .transpose()?;
    Ok(AgreementRecord { buyer, buyer_org })
}

fn utf8_field(op: &'static str, id: &str, bytes: Vec<u8>, what: &str) -> ContractResult<String> {
    String::from_utf8(bytes).map_err(|_| ContractError::Decode {
        op,
        what: format!("transfer agreement for asset {id}"),
        reason: format!("{what} is not valid UTF-8"),
    })
}

/// Withdraw the caller's proposal for the asset named by `agree_delete`.
///
/// Removes the caller's private valuation and both agreement records.
/// Records that are already gone are not an error. An agreement that
/// names some other buyer is left alone and the call fails.
pub fn delete_proposal(ctx: &mut TxContext) -> ContractResult<()> {
    const OP: &str = "DeleteProposal";

    let target: DeleteTarget = decode_transient(ctx, TRANSIENT_AGREE_DELETE, OP)?;
    target.validate(OP)?;
    let collection = verified_org_collection(ctx, OP)?;
    let key = agreement_key(OP, &target.id)?;
    let org_key = agreement_org_key(OP, &target.id)?;

    if let Some(recorded) = ctx.get_private_data(ASSET_COLLECTION, &key).during(OP)? {
        let caller = ctx
            .client_identity()
            .map_err(|source| ContractError::Identity { op: OP, source })?;
        if recorded != caller.id.as_bytes() {
            warn!(asset_id = %target.id, "proposal belongs to another buyer");
            return Err(ContractError::Authorization {
                op: OP,
                reason: format!(
                    "transfer agreement for asset {} was made by another identity",
                    target.id
                ),
            });
        }
    }

    ctx.del_private_data(&collection, &target.id).during(OP)?;
    ctx.del_private_data(ASSET_COLLECTION, &key).during(OP)?;
    ctx.del_private_data(ASSET_COLLECTION, &org_key).during(OP)?;

    info!(asset_id = %target.id, %collection, "transfer proposal deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use cloister_protocol::crypto::ContentHash;
    use cloister_protocol::identity::ClientIdentity;
    use cloister_protocol::storage::{CollectionConfig, MemoryWorldState, WorldState};
    use cloister_protocol::transaction::{Invocation, Peer, TransientMap};
    use std::sync::Arc;

    fn org2() -> (Arc<dyn WorldState>, Peer) {
        let state: Arc<dyn WorldState> = Arc::new(MemoryWorldState::new());
        let cols = Arc::new(CollectionConfig::for_orgs(&["Org1MSP", "Org2MSP"]).unwrap());
        (Arc::clone(&state), Peer::new("Org2MSP", state, cols))
    }

    fn bob() -> ClientIdentity {
        ClientIdentity::new("x509::CN=bob::CN=ca.org2", "Org2MSP").unwrap()
    }

    fn agree(peer: &Peer, who: ClientIdentity, raw: &[u8]) -> ContractResult<()> {
        peer.submit(
            Invocation::new("AgreeToTransfer")
                .identity(who)
                .transient(TransientMap::new().with(TRANSIENT_ASSET_VALUE, raw.to_vec())),
            agree_to_transfer,
        )
        .map(|s| s.value)
    }

    #[test]
    fn agreement_key_encoding() {
        assert_eq!(
            agreement_key("Test", "asset1").unwrap(),
            "\u{0}transferAgreement\u{0}asset1\u{0}"
        );
    }

    #[test]
    fn committed_bytes_hash_exactly() {
        let (state, peer) = org2();
        // Unusual spacing and key order must survive untouched.
        let raw = br#"{ "appraisedValue" :100,  "id":"asset1" }"#;
        agree(&peer, bob(), raw).unwrap();

        let (hash, _) = state
            .get_hash("Org2MSPPrivateCollection", "asset1")
            .unwrap()
            .unwrap();
        assert_eq!(hash, ContentHash::of(raw));

        let buyer = peer
            .evaluate(Invocation::new("ReadTransferAgreement").identity(bob()), |ctx| {
                read_transfer_agreement(ctx, "asset1")
            })
            .unwrap();
        assert_eq!(buyer, bob().id);

        let org_key = agreement_org_key("Test", "asset1").unwrap();
        assert_eq!(org_key, "\u{0}transferAgreement\u{0}asset1\u{0}org\u{0}");
        let org = state.get(ASSET_COLLECTION, &org_key).unwrap().unwrap();
        assert_eq!(org.value, b"Org2MSP");
    }

    #[test]
    fn invalid_valuation_is_rejected() {
        let (_, peer) = org2();
        let err = agree(&peer, bob(), br#"{"id":"asset1","appraisedValue":0}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = agree(&peer, bob(), br#"{"appraisedValue":10}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = agree(&peer, bob(), br#"{"asset_id":"asset1","appraised_value":10}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn second_agreement_replaces_first() {
        let (state, peer) = org2();
        agree(&peer, bob(), br#"{"id":"asset1","appraisedValue":90}"#).unwrap();
        let carol = ClientIdentity::new("x509::CN=carol::CN=ca.org2", "Org2MSP").unwrap();
        agree(&peer, carol.clone(), br#"{"id":"asset1","appraisedValue":100}"#).unwrap();

        let key = agreement_key("Test", "asset1").unwrap();
        let stored = state.get(ASSET_COLLECTION, &key).unwrap().unwrap();
        assert_eq!(stored.value, carol.id.into_bytes());
    }

    #[test]
    fn delete_proposal_is_idempotent() {
        let (state, peer) = org2();
        agree(&peer, bob(), br#"{"id":"asset1","appraisedValue":100}"#).unwrap();

        for _ in 0..2 {
            peer.submit(
                Invocation::new("DeleteProposal").identity(bob()).transient(
                    TransientMap::new().with(TRANSIENT_AGREE_DELETE, br#"{"id":"asset1"}"#.to_vec()),
                ),
                delete_proposal,
            )
            .unwrap();
        }

        let key = agreement_key("Test", "asset1").unwrap();
        assert!(state.get(ASSET_COLLECTION, &key).unwrap().is_none());
        let org_key = agreement_org_key("Test", "asset1").unwrap();
        assert!(state.get(ASSET_COLLECTION, &org_key).unwrap().is_none());
        assert!(state
            .get("Org2MSPPrivateCollection", "asset1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn cannot_delete_someone_elses_proposal() {
        let (_, peer) = org2();
        agree(&peer, bob(), br#"{"id":"asset1","appraisedValue":100}"#).unwrap();
        let carol = ClientIdentity::new("x509::CN=carol::CN=ca.org2", "Org2MSP").unwrap();
        let err = peer
            .submit(
                Invocation::new("DeleteProposal").identity(carol).transient(
                    TransientMap::new().with(TRANSIENT_AGREE_DELETE, br#"{"id":"asset1"}"#.to_vec()),
                ),
                delete_proposal,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn missing_agreement_is_not_found() {
        let (_, peer) = org2();
        let err = peer
            .evaluate(Invocation::new("ReadTransferAgreement").identity(bob()), |ctx| {
                read_transfer_agreement(ctx, "asset1")
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
