//! Two-direction read-through inventory cache
//!
//! One cache instance serves one entity kind with a pair of bounded LRU maps:
//! natural key → id and id → record. Misses fall through to the injected
//! [`InventoryDao`]; store results are written back before being returned.
//!
//! A miss that also misses the store returns the [`NONE`] sentinel (ids) or
//! `None` (records) — callers treat that as "not yet registered", never as an
//! error. Store failures are logged and degrade to a miss; retrying is the
//! store implementation's business, not ours.
//!
//! The maps are guarded by short mutex sections only; no lock is held across
//! a store round trip, so a slow store on one key never blocks cache writes
//! for other keys.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::Scope;

use super::dao::InventoryDao;
use super::entity::{EntityId, InventoryRecord, NONE};
use super::lru::LruMap;

pub struct InventoryCache {
    scope: Scope,
    key_to_id: Mutex<LruMap<String, EntityId>>,
    id_to_record: Mutex<LruMap<EntityId, InventoryRecord>>,
    dao: Arc<dyn InventoryDao>,
}

impl InventoryCache {
    /// Build a cache for one entity kind.
    ///
    /// `max_inventory_size` bounds each direction independently; the maps
    /// evict least-recently-accessed entries beyond it.
    pub fn new(scope: Scope, dao: Arc<dyn InventoryDao>, max_inventory_size: usize) -> Self {
        Self {
            scope,
            key_to_id: Mutex::new(LruMap::new(max_inventory_size)),
            id_to_record: Mutex::new(LruMap::new(max_inventory_size)),
            dao,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Resolve a natural key to its assigned identity.
    ///
    /// Returns [`NONE`] when neither the cache nor the store knows the key.
    pub async fn get_id(&self, natural_key: &str) -> EntityId {
        let key = natural_key.to_owned();

        {
            let mut map = self.key_to_id.lock();
            if let Some(id) = map.get(&key) {
                if *id != NONE {
                    return *id;
                }
            }
        }

        let id = match self.dao.lookup_id(natural_key).await {
            Ok(id) => id,
            Err(e) => {
                warn!("store lookup for key {natural_key} failed, treating as miss: {e}");
                NONE
            }
        };

        if id != NONE {
            self.key_to_id.lock().insert(key, id);
        }

        id
    }

    /// Load an entity snapshot by identity.
    pub async fn get(&self, id: EntityId) -> Option<InventoryRecord> {
        if id == NONE {
            return None;
        }

        {
            let mut map = self.id_to_record.lock();
            if let Some(record) = map.get(&id) {
                return Some(record.clone());
            }
        }

        match self.dao.get(id).await {
            Ok(Some(record)) => {
                self.id_to_record.lock().insert(id, record.clone());
                Some(record)
            }
            Ok(None) => {
                debug!("entity {id} not found in {:?} inventory", self.scope);
                None
            }
            Err(e) => {
                warn!("store read for entity {id} failed, treating as miss: {e}");
                None
            }
        }
    }

    /// Pre-populate both directions from the store after a restart.
    ///
    /// Returns the number of records loaded. A store failure leaves the
    /// cache cold; entries will be pulled in lazily instead.
    pub async fn warm_up(&self, since_ms: i64) -> usize {
        let records = match self.dao.load_updated_since(since_ms).await {
            Ok(records) => records,
            Err(e) => {
                warn!("cache warm-up for {:?} inventory failed: {e}", self.scope);
                return 0;
            }
        };

        let count = records.len();
        for record in records {
            self.key_to_id
                .lock()
                .insert(record.natural_key(), record.sequence);
            self.id_to_record.lock().insert(record.sequence, record);
        }

        debug!("warmed up {count} {:?} inventory entries", self.scope);
        count
    }
}
