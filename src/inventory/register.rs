//! Entity registration service
//!
//! Front door for ingestion workers: resolves identifying attributes to a
//! stable numeric identity, creating the entity on first sight.
//!
//! `get_or_create` returns [`NONE`] to the immediate caller on first
//! creation — the identity only becomes visible after the asynchronous
//! reconciliation persists the record, so callers must tolerate a brief
//! window where the same logical entity is registered more than once and
//! converges afterwards.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::now_ms;

use super::cache::InventoryCache;
use super::entity::{EntityAttrs, EntityId, InventoryRecord, NONE};
use super::reconciler::ReconcilerHandle;

pub struct RegisterService {
    cache: Arc<InventoryCache>,
    reconciler: ReconcilerHandle,
}

impl RegisterService {
    /// Wire a register service to the cache and reconciler of one entity
    /// kind. All collaborators are injected; nothing is resolved at runtime.
    pub fn new(cache: Arc<InventoryCache>, reconciler: ReconcilerHandle) -> Self {
        Self { cache, reconciler }
    }

    /// Pure lookup; never creates.
    pub async fn get(&self, attrs: &EntityAttrs) -> EntityId {
        debug_assert_eq!(attrs.scope(), self.cache.scope());
        self.cache.get_id(&attrs.natural_key()).await
    }

    /// Resolve the identity for the given attributes, registering the entity
    /// if it is unknown.
    ///
    /// Returns [`NONE`] while registration is still in flight.
    #[instrument(skip(self, attrs), fields(scope = ?attrs.scope()))]
    pub async fn get_or_create(&self, attrs: &EntityAttrs) -> EntityId {
        debug_assert_eq!(attrs.scope(), self.cache.scope());

        let id = self.cache.get_id(&attrs.natural_key()).await;
        if id != NONE {
            return id;
        }

        let record = InventoryRecord::new(attrs.clone(), now_ms());
        self.reconciler.submit(record).await;

        NONE
    }

    /// Record a liveness signal for a known entity.
    ///
    /// Heartbeats racing ahead of registration are expected under
    /// concurrency; an unknown id is logged and dropped, never an error.
    #[instrument(skip(self))]
    pub async fn heartbeat(&self, id: EntityId, heartbeat_ms: i64) {
        match self.cache.get(id).await {
            Some(record) => {
                self.reconciler
                    .submit(record.with_heartbeat(heartbeat_ms))
                    .await;
            }
            None => {
                warn!(
                    "heartbeat for entity {id} in {:?} inventory, but no record found",
                    self.cache.scope()
                );
            }
        }
    }
}
