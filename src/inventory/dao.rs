//! Persistence contract for inventory records
//!
//! The core never talks to a concrete store directly; caches and the
//! reconciler depend on this trait only. Implementations live outside the
//! core (document store, relational store) except for the in-memory
//! reference implementation in [`super::memory`].
//!
//! "Not found" is not an error anywhere in this contract: `lookup_id`
//! returns the [`NONE`] sentinel and `get` returns `None`. Errors mean the
//! store itself misbehaved; call sites log them and degrade to a miss.

use std::fmt;

use async_trait::async_trait;

use super::entity::{EntityId, InventoryRecord};

/// Result type alias for store operations
pub type DaoResult<T> = Result<T, DaoError>;

/// Errors surfaced by a store implementation
#[derive(Debug)]
pub enum DaoError {
    /// The store cannot be reached at all
    Unavailable(String),

    /// The store answered but the operation failed
    QueryFailed(String),

    /// A persisted record could not be decoded
    Corrupt(String),
}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoError::Unavailable(msg) => write!(f, "inventory store unavailable: {}", msg),
            DaoError::QueryFailed(msg) => write!(f, "inventory store query failed: {}", msg),
            DaoError::Corrupt(msg) => write!(f, "inventory record corrupt: {}", msg),
        }
    }
}

impl std::error::Error for DaoError {}

/// Store contract for one entity kind.
///
/// Implementations must be `Send + Sync`; they are shared across the cache,
/// the register service, and the reconciler workers.
#[async_trait]
pub trait InventoryDao: Send + Sync {
    /// Resolve a natural key to its assigned identity.
    ///
    /// Returns [`NONE`](super::entity::NONE) when no record exists for the
    /// key.
    async fn lookup_id(&self, natural_key: &str) -> DaoResult<EntityId>;

    /// Load a record by its assigned identity.
    async fn get(&self, id: EntityId) -> DaoResult<Option<InventoryRecord>>;

    /// Persist a record, keyed by its natural key.
    ///
    /// Inserting a record whose `sequence` is unassigned allocates a fresh
    /// sequence; re-saving an existing key overwrites the stored snapshot and
    /// keeps the sequence stable. Returns the record as persisted.
    async fn save(&self, record: InventoryRecord) -> DaoResult<InventoryRecord>;

    /// Records whose `last_update_time` is at or after the given timestamp.
    ///
    /// Used for cold-cache warm-up after a restart.
    async fn load_updated_since(&self, since_ms: i64) -> DaoResult<Vec<InventoryRecord>>;
}
