//! In-memory store (no persistence)
//!
//! Reference [`InventoryDao`] implementation. Useful for:
//! - Testing without database dependencies
//! - Local/single-node wiring where durability is not required
//!
//! All data is lost on restart; sequences restart at 1.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use super::dao::{DaoResult, InventoryDao};
use super::entity::{EntityId, InventoryRecord, NONE};

#[derive(Default)]
struct Inner {
    by_key: HashMap<String, InventoryRecord>,
    key_by_id: HashMap<EntityId, String>,
}

/// In-memory inventory store with atomic sequence assignment
pub struct MemoryDao {
    inner: RwLock<Inner>,
    sequence: AtomicI32,
    save_count: AtomicUsize,
}

impl MemoryDao {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            sequence: AtomicI32::new(0),
            save_count: AtomicUsize::new(0),
        }
    }

    /// Number of distinct records currently stored.
    pub fn record_count(&self) -> usize {
        self.inner.read().by_key.len()
    }

    /// Total `save` calls served; lets tests assert write suppression.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

impl Default for MemoryDao {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryDao for MemoryDao {
    async fn lookup_id(&self, natural_key: &str) -> DaoResult<EntityId> {
        let inner = self.inner.read();
        Ok(inner
            .by_key
            .get(natural_key)
            .map(|record| record.sequence)
            .unwrap_or(NONE))
    }

    async fn get(&self, id: EntityId) -> DaoResult<Option<InventoryRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .key_by_id
            .get(&id)
            .and_then(|key| inner.by_key.get(key))
            .cloned())
    }

    async fn save(&self, record: InventoryRecord) -> DaoResult<InventoryRecord> {
        let key = record.natural_key();
        let mut record = record;

        let mut inner = self.inner.write();

        if record.sequence == NONE {
            record.sequence = match inner.by_key.get(&key) {
                // The key raced in before us, keep its identity stable.
                Some(existing) => existing.sequence,
                None => self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            };
        }

        trace!("persisting entity {} for key {key}", record.sequence);

        inner.key_by_id.insert(record.sequence, key.clone());
        inner.by_key.insert(key, record.clone());
        drop(inner);

        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn load_updated_since(&self, since_ms: i64) -> DaoResult<Vec<InventoryRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .by_key
            .values()
            .filter(|record| record.last_update_time >= since_ms)
            .cloned()
            .collect())
    }
}
