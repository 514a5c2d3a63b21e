//! Entity registration and caching
//!
//! This subsystem resolves every observed logical entity to a stable numeric
//! identity shared across the cluster, reconciling concurrent and duplicate
//! registrations without a global lock.
//!
//! ## Architecture Overview
//!
//! ```text
//!   ingestion workers (many threads)
//!        │ get / get_or_create / heartbeat
//!        ▼
//!   RegisterService ──lookup──▶ InventoryCache ──miss──▶ InventoryDao
//!        │ new / updated snapshots                          ▲
//!        ▼                                                  │ persist
//!   ReconcilerHandle ──hash(natural key)──▶ worker pool ────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Immutable snapshots**: records are values; mutation derives a new
//!    snapshot instead of touching shared state
//! 2. **Sentinels, not errors**: unknown keys resolve to [`NONE`], unknown
//!    ids to `None`; callers treat both as "not yet registered"
//! 3. **Per-key serialization**: the reconciler partitions submissions by
//!    natural key, so merges are linearizable per key and parallel across
//!    keys

pub mod cache;
pub mod dao;
pub mod entity;
mod lru;
pub mod memory;
pub mod reconciler;
pub mod register;

pub use cache::InventoryCache;
pub use dao::{DaoError, DaoResult, InventoryDao};
pub use entity::{EntityAttrs, EntityId, InventoryRecord, NONE};
pub use memory::MemoryDao;
pub use reconciler::ReconcilerHandle;
pub use register::RegisterService;
