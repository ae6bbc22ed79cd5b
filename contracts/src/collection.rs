//! Resolving the caller's private collection.

use cloister_protocol::config::private_collection_name;
use cloister_protocol::transaction::TxContext;

use crate::error::{ContractError, ContractResult};

/// Private collection of the caller's organization.
pub fn org_collection(ctx: &TxContext, op: &'static str) -> ContractResult<String> {
    let identity = ctx
        .client_identity()
        .map_err(|source| ContractError::Identity { op, source })?;
    Ok(private_collection_name(&identity.msp_id))
}

/// Like [`org_collection`], but also requires that the caller is talking to
/// a peer of its own organization. Every operation that writes a private
/// collection goes through here, so one org cannot write another org's
/// commitments through its own peer.
pub fn verified_org_collection(ctx: &TxContext, op: &'static str) -> ContractResult<String> {
    let identity = ctx
        .client_identity()
        .map_err(|source| ContractError::Identity { op, source })?;
    if identity.msp_id != ctx.peer_org() {
        return Err(ContractError::Authorization {
            op,
            reason: format!(
                "client from org {} may not read or write private data on an org {} peer",
                identity.msp_id,
                ctx.peer_org()
            ),
        });
    }
    Ok(private_collection_name(&identity.msp_id))
}
