//! # Asset Queries
//!
//! Browsing the shared partition by key range or rich query.
//!
//! These are point-in-time reads with no phantom protection: nothing stops
//! another transaction from adding a matching asset between the query and
//! commit. The transaction context enforces this by refusing writes once a
//! query has run, so these operations belong in evaluate calls only.
//!
//! Values that do not decode as asset records are skipped, and a rich
//! query's `limit` counts assets only.

use cloister_protocol::config::{ASSET_COLLECTION, ASSET_OBJECT_TYPE};
use cloister_protocol::storage::KvIter;
use cloister_protocol::transaction::TxContext;
use serde_json::json;
use tracing::debug;

use crate::error::{ContractResult, LedgerResultExt};
use crate::records::{Asset, LedgerRecord};

fn collect_assets(iter: KvIter<'_>, op: &'static str) -> ContractResult<Vec<Asset>> {
    let mut assets = Vec::new();
    for item in iter {
        let (key, value) = item.during(op)?;
        match serde_json::from_slice::<LedgerRecord>(&value) {
            Ok(LedgerRecord::Asset(asset)) => assets.push(asset),
            Err(_) => debug!(key = %key.escape_debug(), "skipping non-asset record"),
        }
    }
    Ok(assets)
}

fn is_asset(value: &[u8]) -> bool {
    serde_json::from_slice::<LedgerRecord>(value).is_ok()
}

/// Assets with ids in `[start, end)`. An empty `end` means no upper bound.
pub fn get_asset_by_range(ctx: &mut TxContext, start: &str, end: &str) -> ContractResult<Vec<Asset>> {
    const OP: &str = "GetAssetByRange";
    let iter = ctx
        .get_private_data_by_range(ASSET_COLLECTION, start, end)
        .during(OP)?;
    collect_assets(iter, OP)
}

/// Assets owned by `owner`, compared exactly.
pub fn query_asset_by_owner(ctx: &mut TxContext, owner: &str) -> ContractResult<Vec<Asset>> {
    const OP: &str = "QueryAssetByOwner";
    let query = json!({
        "selector": {
            "objectType": ASSET_OBJECT_TYPE,
            "owner": owner,
        }
    })
    .to_string();
    let iter = ctx
        .get_private_data_query_result_where(ASSET_COLLECTION, &query, is_asset)
        .during(OP)?;
    collect_assets(iter, OP)
}

/// Run a caller-supplied rich query, passed through verbatim.
pub fn query_assets(ctx: &mut TxContext, query: &str) -> ContractResult<Vec<Asset>> {
    const OP: &str = "QueryAssets";
    let iter = ctx
        .get_private_data_query_result_where(ASSET_COLLECTION, query, is_asset)
        .during(OP)?;
    collect_assets(iter, OP)
}
