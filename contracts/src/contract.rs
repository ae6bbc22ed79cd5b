//! # Contract Dispatch
//!
//! [`AssetTransferContract`] maps function names, as sent by clients, onto
//! the operations in this crate and renders their results as JSON.
//!
//! | Function                  | Args              | Kind     |
//! |---------------------------|-------------------|----------|
//! | `CreateAsset`             | transient only    | submit   |
//! | `AgreeToTransfer`         | transient only    | submit   |
//! | `TransferAsset`           | transient only    | submit   |
//! | `DeleteAsset`             | transient only    | submit   |
//! | `DeleteProposal`          | transient only    | submit   |
//! | `ReadAsset`               | `id`              | evaluate |
//! | `ReadAssetPrivateDetails` | `collection, id`  | evaluate |
//! | `ReadTransferAgreement`   | `id`              | evaluate |
//! | `GetAssetByRange`         | `start, end`      | evaluate |
//! | `QueryAssetByOwner`       | `owner`           | evaluate |
//! | `QueryAssets`             | `query`           | evaluate |
//! | `GetClientID`             | none              | evaluate |

use cloister_protocol::storage::TxRecord;
use cloister_protocol::transaction::{Invocation, Peer, TxContext};
use serde_json::{json, Value};

use crate::agreement::{agree_to_transfer, delete_proposal, read_transfer_agreement};
use crate::asset::{create_asset, delete_asset, read_asset, read_asset_private_details};
use crate::error::{ContractError, ContractResult};
use crate::queries::{get_asset_by_range, query_asset_by_owner, query_assets};
use crate::records::Asset;
use crate::transfer::transfer_asset;

/// Every invocable function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    CreateAsset,
    AgreeToTransfer,
    TransferAsset,
    DeleteAsset,
    DeleteProposal,
    ReadAsset,
    ReadAssetPrivateDetails,
    ReadTransferAgreement,
    GetAssetByRange,
    QueryAssetByOwner,
    QueryAssets,
    GetClientId,
}

impl Function {
    pub const ALL: [Function; 12] = [
        Function::CreateAsset,
        Function::AgreeToTransfer,
        Function::TransferAsset,
        Function::DeleteAsset,
        Function::DeleteProposal,
        Function::ReadAsset,
        Function::ReadAssetPrivateDetails,
        Function::ReadTransferAgreement,
        Function::GetAssetByRange,
        Function::QueryAssetByOwner,
        Function::QueryAssets,
        Function::GetClientId,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Function::CreateAsset => "CreateAsset",
            Function::AgreeToTransfer => "AgreeToTransfer",
            Function::TransferAsset => "TransferAsset",
            Function::DeleteAsset => "DeleteAsset",
            Function::DeleteProposal => "DeleteProposal",
            Function::ReadAsset => "ReadAsset",
            Function::ReadAssetPrivateDetails => "ReadAssetPrivateDetails",
            Function::ReadTransferAgreement => "ReadTransferAgreement",
            Function::GetAssetByRange => "GetAssetByRange",
            Function::QueryAssetByOwner => "QueryAssetByOwner",
            Function::QueryAssets => "QueryAssets",
            Function::GetClientId => "GetClientID",
        }
    }

    /// Look up a function by its wire name. `ReturnID` is accepted for
    /// `GetClientID`.
    pub fn parse(name: &str) -> Option<Self> {
        if name == "ReturnID" {
            return Some(Function::GetClientId);
        }
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Functions that never write, and so run as evaluations.
    pub fn is_read_only(self) -> bool {
        !matches!(
            self,
            Function::CreateAsset
                | Function::AgreeToTransfer
                | Function::TransferAsset
                | Function::DeleteAsset
                | Function::DeleteProposal
        )
    }

    fn arity(self) -> usize {
        match self {
            Function::ReadAsset
            | Function::ReadTransferAgreement
            | Function::QueryAssetByOwner
            | Function::QueryAssets => 1,
            Function::ReadAssetPrivateDetails | Function::GetAssetByRange => 2,
            _ => 0,
        }
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity id of the caller.
pub fn return_caller_identity(ctx: &TxContext) -> ContractResult<String> {
    ctx.client_identity()
        .map(|id| id.id.clone())
        .map_err(|source| ContractError::Identity {
            op: "GetClientID",
            source,
        })
}

/// Outcome of [`AssetTransferContract::execute`].
#[derive(Debug, Clone)]
pub struct Execution {
    pub function: Function,
    pub result: Value,
    /// Present for committed submissions.
    pub record: Option<TxRecord>,
}

fn assets_json(assets: Vec<Asset>) -> Value {
    Value::Array(assets.iter().map(Asset::to_json).collect())
}

/// The asset-transfer contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetTransferContract;

impl AssetTransferContract {
    pub fn is_read_only(&self, function: &str) -> bool {
        Function::parse(function).is_some_and(Function::is_read_only)
    }

    fn resolve(function: &str) -> ContractResult<Function> {
        Function::parse(function).ok_or_else(|| ContractError::Validation {
            op: "invoke",
            field: "function",
            reason: format!("unknown function {function:?}"),
        })
    }

    /// Run `function` inside `ctx`.
    pub fn invoke(&self, ctx: &mut TxContext, function: &str, args: &[String]) -> ContractResult<Value> {
        let f = Self::resolve(function)?;
        if args.len() != f.arity() {
            return Err(ContractError::Validation {
                op: f.name(),
                field: "args",
                reason: format!("expected {} arguments, got {}", f.arity(), args.len()),
            });
        }

        Ok(match f {
            Function::CreateAsset => create_asset(ctx)?.to_json(),
            Function::AgreeToTransfer => {
                agree_to_transfer(ctx)?;
                Value::Null
            }
            Function::TransferAsset => transfer_asset(ctx)?.to_json(),
            Function::DeleteAsset => {
                delete_asset(ctx)?;
                Value::Null
            }
            Function::DeleteProposal => {
                delete_proposal(ctx)?;
                Value::Null
            }
            Function::ReadAsset => read_asset(ctx, &args[0])?.to_json(),
            Function::ReadAssetPrivateDetails => {
                let details = read_asset_private_details(ctx, &args[0], &args[1])?;
                json!({ "id": details.id, "appraisedValue": details.appraised_value })
            }
            Function::ReadTransferAgreement => {
                let buyer = read_transfer_agreement(ctx, &args[0])?;
                json!({ "id": args[0], "buyerId": buyer })
            }
            Function::GetAssetByRange => assets_json(get_asset_by_range(ctx, &args[0], &args[1])?),
            Function::QueryAssetByOwner => assets_json(query_asset_by_owner(ctx, &args[0])?),
            Function::QueryAssets => assets_json(query_assets(ctx, &args[0])?),
            Function::GetClientId => Value::String(return_caller_identity(ctx)?),
        })
    }

    /// Submit or evaluate `invocation.function` on `peer`, depending on
    /// whether it writes.
    pub fn execute(&self, peer: &Peer, invocation: Invocation, args: &[String]) -> ContractResult<Execution> {
        let function = Self::resolve(&invocation.function)?;
        let name = invocation.function.clone();

        if function.is_read_only() {
            let result = peer.evaluate(invocation, |ctx| self.invoke(ctx, &name, args))?;
            Ok(Execution {
                function,
                result,
                record: None,
            })
        } else {
            let submitted = peer.submit(invocation, |ctx| self.invoke(ctx, &name, args))?;
            Ok(Execution {
                function,
                result: submitted.value,
                record: Some(submitted.record),
            })
        }
    }
}
