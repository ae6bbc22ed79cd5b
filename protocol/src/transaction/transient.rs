//! Side-channel inputs for a single invocation.
//!
//! Transient fields reach the contract alongside the invocation but are
//! never written to the transaction log. Confidential payloads (asset
//! properties, appraised values, transfer targets) travel only this way.

use std::collections::BTreeMap;
use std::fmt;

/// Field name to raw bytes, scoped to one invocation.
///
/// The `Debug` impl prints field names and sizes only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TransientMap {
    fields: BTreeMap<String, Vec<u8>>,
}

impl TransientMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(field, bytes);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.fields.insert(field.into(), bytes.into());
    }

    /// Raw bytes for `field`, exactly as supplied by the caller.
    pub fn get(&self, field: &str) -> Option<&[u8]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl fmt::Debug for TransientMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.fields
                    .iter()
                    .map(|(k, v)| (k, format!("<{} bytes>", v.len()))),
            )
            .finish()
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for TransientMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
