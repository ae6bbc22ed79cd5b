//! # Collection Access Policy
//!
//! Every partition ("collection") has a member list. Members may read and
//! write its values; non-members may only ask for content hashes. The
//! configuration file uses the platform's collections-config shape:
//!
//! ```json
//! [
//!   {
//!     "name": "assetCollection",
//!     "policy": "OR('Org1MSP.member', 'Org2MSP.member')",
//!     "memberOnlyRead": true,
//!     "memberOnlyWrite": true
//!   }
//! ]
//! ```
//!
//! Only disjunctive (`OR`) member policies are understood, which is all
//! the asset-transfer deployment ever uses.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{private_collection_name, ASSET_COLLECTION};
use crate::error::{LedgerError, LedgerResult};

/// Principal roles accepted after the org id in a policy principal.
const PRINCIPAL_ROLES: [&str; 4] = [".member", ".peer", ".client", ".admin"];

fn default_true() -> bool {
    true
}

/// One entry of the collections config file, as written on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDefinition {
    pub name: String,
    pub policy: String,
    #[serde(default = "default_true")]
    pub member_only_read: bool,
    #[serde(default = "default_true")]
    pub member_only_write: bool,
}

/// Parsed access rules for a single partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPolicy {
    pub name: String,
    pub members: BTreeSet<String>,
    pub member_only_read: bool,
    pub member_only_write: bool,
}

impl CollectionPolicy {
    pub fn is_member(&self, org: &str) -> bool {
        self.members.contains(org)
    }
}

/// Extract member org ids from a policy such as
/// `OR('Org1MSP.member', 'Org2MSP.member')`.
pub fn parse_member_orgs(policy: &str) -> LedgerResult<BTreeSet<String>> {
    let trimmed = policy.trim();
    if trimmed.starts_with("AND(") || trimmed.starts_with("OutOf(") {
        return Err(LedgerError::InvalidCollectionConfig(format!(
            "only OR member policies are supported, got {trimmed}"
        )));
    }

    let mut members = BTreeSet::new();
    for (i, principal) in trimmed.split('\'').enumerate() {
        // Odd segments are the quoted principals.
        if i % 2 == 0 {
            continue;
        }
        let org = PRINCIPAL_ROLES
            .iter()
            .find_map(|role| principal.strip_suffix(role))
            .ok_or_else(|| {
                LedgerError::InvalidCollectionConfig(format!(
                    "principal {principal:?} has no recognized role"
                ))
            })?;
        if org.is_empty() {
            return Err(LedgerError::InvalidCollectionConfig(format!(
                "principal {principal:?} names no organization"
            )));
        }
        members.insert(org.to_string());
    }

    if members.is_empty() {
        return Err(LedgerError::InvalidCollectionConfig(format!(
            "policy {trimmed:?} lists no members"
        )));
    }
    Ok(members)
}

/// Access rules for every partition known to a peer.
#[derive(Debug, Clone, Default)]
pub struct CollectionConfig {
    definitions: Vec<CollectionDefinition>,
    policies: BTreeMap<String, CollectionPolicy>,
}

impl CollectionConfig {
    /// Build from parsed definitions, rejecting duplicates and names that
    /// cannot be used as storage prefixes.
    pub fn from_definitions(definitions: Vec<CollectionDefinition>) -> LedgerResult<Self> {
        let mut policies = BTreeMap::new();
        for def in &definitions {
            if def.name.is_empty() || def.name.contains('\u{0}') {
                return Err(LedgerError::InvalidCollectionConfig(format!(
                    "invalid collection name {:?}",
                    def.name
                )));
            }
            let policy = CollectionPolicy {
                name: def.name.clone(),
                members: parse_member_orgs(&def.policy)?,
                member_only_read: def.member_only_read,
                member_only_write: def.member_only_write,
            };
            if policies.insert(def.name.clone(), policy).is_some() {
                return Err(LedgerError::InvalidCollectionConfig(format!(
                    "duplicate collection {}",
                    def.name
                )));
            }
        }
        Ok(Self {
            definitions,
            policies,
        })
    }

    /// Parse the JSON collections config file.
    pub fn from_json(bytes: &[u8]) -> LedgerResult<Self> {
        let definitions: Vec<CollectionDefinition> = serde_json::from_slice(bytes)
            .map_err(|e| LedgerError::InvalidCollectionConfig(e.to_string()))?;
        Self::from_definitions(definitions)
    }

    /// Render the config in its on-disk form.
    pub fn to_json_pretty(&self) -> LedgerResult<String> {
        serde_json::to_string_pretty(&self.definitions)
            .map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// The standard layout: one shared partition readable by all `orgs`,
    /// plus one private partition per org.
    pub fn for_orgs<S: AsRef<str>>(orgs: &[S]) -> LedgerResult<Self> {
        let shared_policy = format!(
            "OR({})",
            orgs.iter()
                .map(|o| format!("'{}.member'", o.as_ref()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut definitions = vec![CollectionDefinition {
            name: ASSET_COLLECTION.to_string(),
            policy: shared_policy,
            member_only_read: true,
            member_only_write: true,
        }];
        for org in orgs {
            let org = org.as_ref();
            definitions.push(CollectionDefinition {
                name: private_collection_name(org),
                policy: format!("OR('{org}.member')"),
                member_only_read: true,
                member_only_write: false,
            });
        }
        Self::from_definitions(definitions)
    }

    pub fn policy(&self, partition: &str) -> LedgerResult<&CollectionPolicy> {
        self.policies
            .get(partition)
            .ok_or_else(|| LedgerError::UnknownCollection(partition.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    /// Values may be read only on member peers.
    pub fn check_read(&self, partition: &str, peer_org: &str) -> LedgerResult<()> {
        let policy = self.policy(partition)?;
        if policy.member_only_read && !policy.is_member(peer_org) {
            return Err(LedgerError::AccessDenied {
                org: peer_org.to_string(),
                partition: partition.to_string(),
                action: "read",
            });
        }
        Ok(())
    }

    /// Writes are gated on the submitting client's organization.
    pub fn check_write(&self, partition: &str, client_org: &str) -> LedgerResult<()> {
        let policy = self.policy(partition)?;
        if policy.member_only_write && !policy.is_member(client_org) {
            return Err(LedgerError::AccessDenied {
                org: client_org.to_string(),
                partition: partition.to_string(),
                action: "write",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_policy() {
        let members = parse_member_orgs("OR('Org1MSP.member', 'Org2MSP.peer')").unwrap();
        assert!(members.contains("Org1MSP"));
        assert!(members.contains("Org2MSP"));
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn parse_rejects_and_policy() {
        assert!(parse_member_orgs("AND('Org1MSP.member', 'Org2MSP.member')").is_err());
    }

    #[test]
    fn parse_rejects_unknown_role() {
        assert!(parse_member_orgs("OR('Org1MSP.owner')").is_err());
        assert!(parse_member_orgs("OR()").is_err());
    }

    #[test]
    fn standard_layout_access_rules() {
        let cfg = CollectionConfig::for_orgs(&["Org1MSP", "Org2MSP"]).unwrap();

        cfg.check_read(ASSET_COLLECTION, "Org1MSP").unwrap();
        cfg.check_read(ASSET_COLLECTION, "Org2MSP").unwrap();
        assert!(cfg.check_read(ASSET_COLLECTION, "Org3MSP").is_err());

        cfg.check_read("Org1MSPPrivateCollection", "Org1MSP").unwrap();
        assert!(matches!(
            cfg.check_read("Org1MSPPrivateCollection", "Org2MSP"),
            Err(LedgerError::AccessDenied { action: "read", .. })
        ));

        // Private partitions accept writes from any client org.
        cfg.check_write("Org1MSPPrivateCollection", "Org2MSP").unwrap();
        assert!(cfg.check_write(ASSET_COLLECTION, "Org3MSP").is_err());
    }

    #[test]
    fn unknown_collection() {
        let cfg = CollectionConfig::for_orgs(&["Org1MSP"]).unwrap();
        assert!(matches!(
            cfg.policy("nope"),
            Err(LedgerError::UnknownCollection(_))
        ));
    }

    #[test]
    fn json_round_trip_preserves_rules() {
        let cfg = CollectionConfig::for_orgs(&["Org1MSP", "Org2MSP"]).unwrap();
        let json = cfg.to_json_pretty().unwrap();
        let parsed = CollectionConfig::from_json(json.as_bytes()).unwrap();
        assert_eq!(
            parsed.policy(ASSET_COLLECTION).unwrap(),
            cfg.policy(ASSET_COLLECTION).unwrap()
        );
        assert_eq!(parsed.names().count(), 3);
    }

    #[test]
    fn member_flags_default_to_true() {
        let json = br#"[{"name":"c","policy":"OR('A.member')"}]"#;
        let cfg = CollectionConfig::from_json(json).unwrap();
        let policy = cfg.policy("c").unwrap();
        assert!(policy.member_only_read);
        assert!(policy.member_only_write);
    }

    #[test]
    fn duplicate_collections_rejected() {
        let json = br#"[{"name":"c","policy":"OR('A.member')"},{"name":"c","policy":"OR('B.member')"}]"#;
        assert!(CollectionConfig::from_json(json).is_err());
    }
}
