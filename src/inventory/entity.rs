//! Inventory entity snapshots
//!
//! Every observed logical entity (service, instance, endpoint, SQL statement)
//! is represented by an immutable [`InventoryRecord`]. Mutation never happens
//! in place: the register service and the reconciler derive a new snapshot and
//! hand it downstream, so records can be shared freely across tasks.
//!
//! ## Natural keys
//!
//! The de-duplication key of a record is a pure function of its identifying
//! attributes. Long free-text attributes (raw SQL) are truncated to a fixed
//! 64-character prefix before key construction; two statements sharing that
//! prefix intentionally collapse into one entity.
//!
//! ## Merge precedence
//!
//! Concurrent submissions for the same key are merged field-by-field: the
//! record with the strictly greater `last_update_time` wins, ties keep the
//! existing values. `register_time` merges to the minimum and
//! `heartbeat_time` to the maximum so that neither ever moves backwards.

use serde::{Deserialize, Serialize};

use crate::Scope;

/// Cluster-wide numeric identity of an inventory entity.
pub type EntityId = i32;

/// Sentinel for "no identity assigned yet". Stores hand out sequences
/// starting at 1.
pub const NONE: EntityId = 0;

const KEY_SPLIT: char = '|';

/// Free-text attributes contribute at most this many characters to the key.
const FREE_TEXT_PREFIX: usize = 64;

fn free_text_prefix(text: &str) -> String {
    text.chars().take(FREE_TEXT_PREFIX).collect()
}

/// Identifying and descriptive attributes, one variant per entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityAttrs {
    Service {
        name: String,
    },
    ServiceInstance {
        service_id: EntityId,
        name: String,
    },
    Endpoint {
        service_id: EntityId,
        name: String,
    },
    SqlAccess {
        service_id: EntityId,
        endpoint_id: EntityId,
        name: String,
        sql: String,
    },
}

impl EntityAttrs {
    pub fn scope(&self) -> Scope {
        match self {
            EntityAttrs::Service { .. } => Scope::Service,
            EntityAttrs::ServiceInstance { .. } => Scope::ServiceInstance,
            EntityAttrs::Endpoint { .. } => Scope::Endpoint,
            EntityAttrs::SqlAccess { .. } => Scope::SqlAccess,
        }
    }

    /// Deterministic de-duplication key derived from identifying attributes.
    pub fn natural_key(&self) -> String {
        match self {
            EntityAttrs::Service { name } => name.clone(),
            EntityAttrs::ServiceInstance { service_id, name } => {
                format!("{service_id}{KEY_SPLIT}{name}")
            }
            EntityAttrs::Endpoint { service_id, name } => {
                format!("{service_id}{KEY_SPLIT}{name}")
            }
            EntityAttrs::SqlAccess {
                service_id,
                endpoint_id,
                name,
                sql,
            } => format!(
                "{service_id}{KEY_SPLIT}{endpoint_id}{KEY_SPLIT}{name}{KEY_SPLIT}{}",
                free_text_prefix(sql)
            ),
        }
    }

    /// Display name of the entity itself (without owner composition).
    pub fn name(&self) -> &str {
        match self {
            EntityAttrs::Service { name }
            | EntityAttrs::ServiceInstance { name, .. }
            | EntityAttrs::Endpoint { name, .. }
            | EntityAttrs::SqlAccess { name, .. } => name,
        }
    }

    /// Identity of the owning service for hierarchical kinds.
    pub fn service_id(&self) -> Option<EntityId> {
        match self {
            EntityAttrs::Service { .. } => None,
            EntityAttrs::ServiceInstance { service_id, .. }
            | EntityAttrs::Endpoint { service_id, .. }
            | EntityAttrs::SqlAccess { service_id, .. } => Some(*service_id),
        }
    }

    pub fn sql(&self) -> Option<&str> {
        match self {
            EntityAttrs::SqlAccess { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

/// Immutable snapshot of one inventory entity.
///
/// All timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// Store-assigned identity, [`NONE`] until the first persist completes.
    pub sequence: EntityId,

    pub attrs: EntityAttrs,

    /// First time this entity was seen anywhere in the cluster.
    pub register_time: i64,

    /// Last liveness signal; monotonic per entity.
    pub heartbeat_time: i64,

    /// Governs field precedence during [`InventoryRecord::merge`].
    pub last_update_time: i64,
}

impl InventoryRecord {
    /// Fresh, unpersisted record as produced by `get_or_create`.
    pub fn new(attrs: EntityAttrs, now_ms: i64) -> Self {
        Self {
            sequence: NONE,
            attrs,
            register_time: now_ms,
            heartbeat_time: now_ms,
            last_update_time: now_ms,
        }
    }

    pub fn scope(&self) -> Scope {
        self.attrs.scope()
    }

    pub fn natural_key(&self) -> String {
        self.attrs.natural_key()
    }

    /// Snapshot with an advanced heartbeat. The heartbeat never moves
    /// backwards, a stale timestamp leaves the record untouched.
    pub fn with_heartbeat(&self, heartbeat_ms: i64) -> Self {
        let mut next = self.clone();
        next.heartbeat_time = next.heartbeat_time.max(heartbeat_ms);
        next
    }

    /// Merge an incoming submission into this (persisted) record.
    ///
    /// Returns the merged snapshot and whether any field actually changed;
    /// callers suppress the store write when nothing changed.
    pub fn merge(&self, incoming: &InventoryRecord) -> (InventoryRecord, bool) {
        let mut merged = self.clone();
        let mut changed = false;

        if merged.sequence == NONE && incoming.sequence != NONE {
            merged.sequence = incoming.sequence;
            changed = true;
        }

        if incoming.register_time < merged.register_time {
            merged.register_time = incoming.register_time;
            changed = true;
        }

        if incoming.heartbeat_time > merged.heartbeat_time {
            merged.heartbeat_time = incoming.heartbeat_time;
            changed = true;
        }

        if incoming.last_update_time > merged.last_update_time {
            if merged.attrs != incoming.attrs {
                merged.attrs = incoming.attrs.clone();
            }
            merged.last_update_time = incoming.last_update_time;
            changed = true;
        }

        (merged, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sql_attrs(sql: &str) -> EntityAttrs {
        EntityAttrs::SqlAccess {
            service_id: 3,
            endpoint_id: 7,
            name: "order-lookup".to_string(),
            sql: sql.to_string(),
        }
    }

    #[test]
    fn natural_key_composes_identifying_attributes() {
        let attrs = sql_attrs("SELECT 1");
        assert_eq!(attrs.natural_key(), "3|7|order-lookup|SELECT 1");
    }

    #[test]
    fn long_sql_shares_key_on_common_prefix() {
        let prefix = "SELECT * FROM orders WHERE customer_id = ? AND state = 'open' --";
        assert_eq!(prefix.chars().count(), 64);

        let a = sql_attrs(&format!("{prefix} ORDER BY id"));
        let b = sql_attrs(&format!("{prefix} ORDER BY created_at"));

        assert_eq!(a.natural_key(), b.natural_key());
    }

    #[test]
    fn short_sql_is_kept_verbatim() {
        let a = sql_attrs("SELECT 1");
        let b = sql_attrs("SELECT 2");
        assert_ne!(a.natural_key(), b.natural_key());
    }

    proptest! {
        // Key derivation is a pure function: equal attributes, equal keys.
        #[test]
        fn prop_natural_key_deterministic(
            service_id in 0i32..10_000,
            endpoint_id in 0i32..10_000,
            name in "[a-z/_-]{1,24}",
            sql in ".{0,200}",
        ) {
            let attrs = EntityAttrs::SqlAccess {
                service_id,
                endpoint_id,
                name,
                sql,
            };

            prop_assert_eq!(attrs.natural_key(), attrs.clone().natural_key());
        }

        // The truncated prefix never exceeds 64 characters regardless of input.
        #[test]
        fn prop_free_text_prefix_bounded(sql in ".{0,300}") {
            let key = sql_attrs(&sql).natural_key();
            let tail = key.rsplit('|').next().unwrap();
            prop_assert!(tail.chars().count() <= 64);
        }
    }

    fn record(sequence: EntityId, name: &str, register: i64, heartbeat: i64, update: i64) -> InventoryRecord {
        InventoryRecord {
            sequence,
            attrs: EntityAttrs::Endpoint {
                service_id: 1,
                name: name.to_string(),
            },
            register_time: register,
            heartbeat_time: heartbeat,
            last_update_time: update,
        }
    }

    #[test]
    fn merge_adopts_fields_from_newer_record() {
        let existing = record(5, "GET:/old", 100, 100, 100);
        let incoming = record(5, "GET:/new", 150, 200, 200);

        let (merged, changed) = existing.merge(&incoming);

        assert!(changed);
        assert_eq!(merged.attrs.name(), "GET:/new");
        assert_eq!(merged.register_time, 100);
        assert_eq!(merged.heartbeat_time, 200);
        assert_eq!(merged.last_update_time, 200);
    }

    #[test]
    fn merge_keeps_existing_on_tie() {
        let existing = record(5, "GET:/a", 100, 100, 100);
        let incoming = record(5, "GET:/b", 100, 100, 100);

        let (merged, changed) = existing.merge(&incoming);

        assert!(!changed);
        assert_eq!(merged, existing);
    }

    #[test]
    fn merge_is_commutative_on_field_values() {
        let e1 = record(9, "GET:/orders", 80, 120, 120);
        let e2 = record(9, "GET:/orders/{id}", 90, 110, 150);

        let (m12, _) = e1.merge(&e2);
        let (m21, _) = e2.merge(&e1);

        assert_eq!(m12.attrs, m21.attrs);
        assert_eq!(m12.register_time, m21.register_time);
        assert_eq!(m12.heartbeat_time, m21.heartbeat_time);
        assert_eq!(m12.last_update_time, m21.last_update_time);
    }

    #[test]
    fn merge_suppresses_unchanged_heartbeat() {
        let existing = record(5, "GET:/a", 100, 300, 100);
        let incoming = existing.with_heartbeat(300);

        let (_, changed) = existing.merge(&incoming);
        assert!(!changed);
    }

    #[test]
    fn merge_takes_sequence_once_assigned() {
        let unassigned = record(NONE, "GET:/a", 100, 100, 100);
        let assigned = record(12, "GET:/a", 100, 100, 100);

        let (merged, changed) = unassigned.merge(&assigned);
        assert!(changed);
        assert_eq!(merged.sequence, 12);

        // An already-assigned record never loses its sequence.
        let (merged, _) = assigned.merge(&unassigned);
        assert_eq!(merged.sequence, 12);
    }

    #[test]
    fn heartbeat_is_monotonic() {
        let rec = record(5, "GET:/a", 100, 200, 100);
        assert_eq!(rec.with_heartbeat(150).heartbeat_time, 200);
        assert_eq!(rec.with_heartbeat(250).heartbeat_time, 250);
    }
}
