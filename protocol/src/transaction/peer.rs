//! A peer: one organization's handle on the shared world state.

use std::sync::Arc;
use tracing::{debug, warn};

use super::context::{Invocation, TxContext};
use crate::error::LedgerError;
use crate::storage::policy::CollectionConfig;
use crate::storage::world_state::{TxRecord, WorldState};

/// Result of a committed invocation.
#[derive(Debug, Clone)]
pub struct Submitted<T> {
    pub value: T,
    pub record: TxRecord,
}

/// Executes invocations on behalf of the organization hosting it.
#[derive(Clone)]
pub struct Peer {
    org_id: String,
    state: Arc<dyn WorldState>,
    collections: Arc<CollectionConfig>,
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer").field("org_id", &self.org_id).finish()
    }
}

impl Peer {
    pub fn new(
        org_id: impl Into<String>,
        state: Arc<dyn WorldState>,
        collections: Arc<CollectionConfig>,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            state,
            collections,
        }
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn state(&self) -> &Arc<dyn WorldState> {
        &self.state
    }

    pub fn collections(&self) -> &CollectionConfig {
        &self.collections
    }

    /// Open a transaction context without running anything in it.
    pub fn begin(&self, invocation: Invocation) -> TxContext {
        TxContext::new(
            invocation,
            self.org_id.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.collections),
        )
    }

    /// Run `f` and commit its writes if it succeeds. On error nothing is
    /// written.
    pub fn submit<T, E, F>(&self, invocation: Invocation, f: F) -> Result<Submitted<T>, E>
    where
        F: FnOnce(&mut TxContext) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let mut ctx = self.begin(invocation);
        match f(&mut ctx) {
            Ok(value) => {
                let record = ctx.commit()?;
                Ok(Submitted { value, record })
            }
            Err(e) => {
                warn!(
                    tx_id = ctx.tx_id(),
                    function = ctx.function(),
                    discarded_writes = ctx.pending_writes(),
                    "invocation failed, discarding write set"
                );
                Err(e)
            }
        }
    }

    /// Run `f` against committed state and discard any writes.
    pub fn evaluate<T, E, F>(&self, invocation: Invocation, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut TxContext) -> Result<T, E>,
    {
        let mut ctx = self.begin(invocation);
        let result = f(&mut ctx);
        debug!(tx_id = ctx.tx_id(), function = ctx.function(), "evaluated");
        result
    }
}
