//! Integration tests run against both world-state backends.
//!
//! Every scenario executes once on `MemoryWorldState` and once on a
//! temporary `SledWorldState`, through `Peer` and `TxContext` the way a
//! contract would. The two backends must agree on hashes, versions,
//! conflicts, scan order and the transaction log.

use std::sync::Arc;

use cloister_protocol::config::{private_collection_name, ASSET_COLLECTION};
use cloister_protocol::crypto::ContentHash;
use cloister_protocol::identity::ClientIdentity;
use cloister_protocol::storage::keys::create_composite_key;
use cloister_protocol::storage::{
    CollectionConfig, MemoryWorldState, SledWorldState, WorldState,
};
use cloister_protocol::transaction::{Invocation, Peer, TxContext};
use cloister_protocol::{LedgerError, LedgerResult};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn backends() -> Vec<(&'static str, Arc<dyn WorldState>)> {
    vec![
        ("memory", Arc::new(MemoryWorldState::new())),
        ("sled", Arc::new(SledWorldState::open_temporary().unwrap())),
    ]
}

fn peers(state: &Arc<dyn WorldState>) -> (Peer, Peer) {
    let cols = Arc::new(CollectionConfig::for_orgs(&["Org1MSP", "Org2MSP"]).unwrap());
    (
        Peer::new("Org1MSP", Arc::clone(state), Arc::clone(&cols)),
        Peer::new("Org2MSP", Arc::clone(state), cols),
    )
}

fn alice() -> ClientIdentity {
    ClientIdentity::new("x509::CN=alice::CN=ca.org1", "Org1MSP").unwrap()
}

fn bob() -> ClientIdentity {
    ClientIdentity::new("x509::CN=bob::CN=ca.org2", "Org2MSP").unwrap()
}

fn put(peer: &Peer, who: ClientIdentity, partition: &str, key: &str, value: &[u8]) -> u64 {
    peer.submit(Invocation::new("Put").identity(who), |ctx: &mut TxContext| {
        ctx.put_private_data(partition, key, value.to_vec())
    })
    .unwrap()
    .record
    .height
}

fn asset(id: &str, color: &str, owner: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "objectType": "asset",
        "id": id,
        "color": color,
        "size": 5,
        "owner": owner,
    }))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn equal_bytes_in_different_partitions_hash_equal() {
    for (name, state) in backends() {
        let (org1, org2) = peers(&state);
        let value = br#"{"id":"asset1","appraisedValue":100}"#;
        put(&org1, alice(), &private_collection_name("Org1MSP"), "asset1", value);
        put(&org2, bob(), &private_collection_name("Org2MSP"), "asset1", value);

        let (theirs, mine) = org2
            .evaluate(Invocation::new("Check").identity(bob()), |ctx| {
                LedgerResult::Ok((
                    ctx.get_private_data_hash(&private_collection_name("Org1MSP"), "asset1")?,
                    ctx.get_private_data_hash(&private_collection_name("Org2MSP"), "asset1")?,
                ))
            })
            .unwrap();
        assert_eq!(theirs, Some(ContentHash::of(value)), "{name}");
        assert_eq!(theirs, mine, "{name}");

        let err = org2
            .evaluate(Invocation::new("Peek").identity(bob()), |ctx| {
                ctx.get_private_data(&private_collection_name("Org1MSP"), "asset1")
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccessDenied { .. }), "{name}: {err}");
    }
}

#[test]
fn stale_read_aborts_the_whole_commit() {
    for (name, state) in backends() {
        let (org1, _) = peers(&state);
        put(&org1, alice(), ASSET_COLLECTION, "asset1", b"v1");

        let mut slow = org1.begin(Invocation::new("Slow").identity(alice()));
        slow.get_private_data(ASSET_COLLECTION, "asset1").unwrap();
        slow.put_private_data(ASSET_COLLECTION, "asset1", b"slow".to_vec())
            .unwrap();
        slow.put_private_data(ASSET_COLLECTION, "other", b"slow".to_vec())
            .unwrap();

        put(&org1, alice(), ASSET_COLLECTION, "asset1", b"fast");
        let height = state.height().unwrap();

        let err = slow.commit().unwrap_err();
        assert!(matches!(err, LedgerError::MvccConflict { .. }), "{name}: {err}");
        assert_eq!(state.height().unwrap(), height, "{name}");
        assert_eq!(
            state.get(ASSET_COLLECTION, "asset1").unwrap().unwrap().value,
            b"fast",
            "{name}"
        );
        assert!(state.get(ASSET_COLLECTION, "other").unwrap().is_none(), "{name}");
    }
}

#[test]
fn versions_are_commit_heights() {
    for (name, state) in backends() {
        let (org1, _) = peers(&state);
        let first = put(&org1, alice(), ASSET_COLLECTION, "a", b"1");
        let second = put(&org1, alice(), ASSET_COLLECTION, "b", b"2");
        assert_eq!((first, second), (1, 2), "{name}");

        assert_eq!(state.get(ASSET_COLLECTION, "a").unwrap().unwrap().version, 1, "{name}");
        assert_eq!(state.get_hash(ASSET_COLLECTION, "b").unwrap().unwrap().1, 2, "{name}");

        org1.submit(Invocation::new("Del").identity(alice()), |ctx: &mut TxContext| {
            ctx.del_private_data(ASSET_COLLECTION, "a")
        })
        .unwrap();
        assert!(state.get(ASSET_COLLECTION, "a").unwrap().is_none(), "{name}");
        assert!(state.get_hash(ASSET_COLLECTION, "a").unwrap().is_none(), "{name}");
        assert_eq!(state.height().unwrap(), 3, "{name}");
    }
}

#[test]
fn scans_agree_and_skip_composite_keys() {
    let mut results = Vec::new();
    for (name, state) in backends() {
        let (org1, _) = peers(&state);
        put(&org1, alice(), ASSET_COLLECTION, "asset3", &asset("asset3", "red", "alice"));
        put(&org1, alice(), ASSET_COLLECTION, "asset1", &asset("asset1", "blue", "alice"));
        put(&org1, alice(), ASSET_COLLECTION, "asset2", &asset("asset2", "blue", "bob"));
        let agreement = create_composite_key("transferAgreement", &["asset1"]).unwrap();
        put(&org1, alice(), ASSET_COLLECTION, &agreement, b"x509::bob");

        let (ranged, queried) = org1
            .evaluate(Invocation::new("Scan").identity(alice()), |ctx| {
                let ranged: Vec<String> = ctx
                    .get_private_data_by_range(ASSET_COLLECTION, "", "")?
                    .map(|kv| kv.map(|(k, _)| k))
                    .collect::<LedgerResult<_>>()?;
                let queried: Vec<String> = ctx
                    .get_private_data_query_result(
                        ASSET_COLLECTION,
                        r#"{"selector":{"color":"blue"}}"#,
                    )?
                    .map(|kv| kv.map(|(k, _)| k))
                    .collect::<LedgerResult<_>>()?;
                LedgerResult::Ok((ranged, queried))
            })
            .unwrap();

        assert_eq!(ranged, ["asset1", "asset2", "asset3"], "{name}");
        assert_eq!(queried, ["asset1", "asset2"], "{name}");
        results.push((ranged, queried));
    }
    assert_eq!(results[0], results[1]);
}

#[test]
fn bounded_range_excludes_end() {
    for (name, state) in backends() {
        let (org1, _) = peers(&state);
        for id in ["a", "b", "c", "d"] {
            put(&org1, alice(), ASSET_COLLECTION, id, id.as_bytes());
        }
        let keys: Vec<String> = org1
            .evaluate(Invocation::new("Range").identity(alice()), |ctx| {
                ctx.get_private_data_by_range(ASSET_COLLECTION, "b", "d")?
                    .map(|kv| kv.map(|(k, _)| k))
                    .collect::<LedgerResult<Vec<_>>>()
            })
            .unwrap();
        assert_eq!(keys, ["b", "c"], "{name}");
    }
}

#[test]
fn query_then_write_is_refused() {
    for (name, state) in backends() {
        let (org1, _) = peers(&state);
        let err = org1
            .submit(Invocation::new("Mixed").identity(alice()), |ctx: &mut TxContext| {
                let _ = ctx.get_private_data_by_range(ASSET_COLLECTION, "", "")?.count();
                ctx.put_private_data(ASSET_COLLECTION, "k", b"v".to_vec())
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::WriteAfterQuery { .. }), "{name}: {err}");
        assert_eq!(state.height().unwrap(), 0, "{name}");
    }
}

#[test]
fn transaction_log_records_hashes() {
    for (name, state) in backends() {
        let (org1, _) = peers(&state);
        let value = br#"{"id":"asset1","appraisedValue":100}"#;
        let submitted = org1
            .submit(Invocation::new("CreateAsset").identity(alice()), |ctx: &mut TxContext| {
                ctx.put_private_data(&private_collection_name("Org1MSP"), "asset1", value.to_vec())
            })
            .unwrap();

        let logged = state.transaction(&submitted.record.tx_id).unwrap().unwrap();
        assert_eq!(logged, submitted.record, "{name}");
        assert_eq!(logged.function, "CreateAsset", "{name}");
        assert_eq!(logged.creator, alice().id, "{name}");
        assert_eq!(logged.creator_msp, "Org1MSP", "{name}");
        assert_eq!(logged.writes.len(), 1, "{name}");
        assert_eq!(logged.writes[0].value_hash, Some(ContentHash::of(value)), "{name}");
        assert!(state.transaction("missing").unwrap().is_none(), "{name}");
    }
}
