pub mod alarm;
pub mod config;
pub mod inventory;

use serde::{Deserialize, Serialize};

pub use inventory::entity::{EntityId, NONE};

/// Entity catalogs recognized by this backend.
///
/// Every metric sample and every inventory record belongs to exactly one
/// scope. Metrics tagged with a scope id outside this catalog are dropped by
/// the dispatcher without further processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Service,
    ServiceInstance,
    Endpoint,
    SqlAccess,
}

impl Scope {
    /// Resolve a raw scope id carried in metric metadata.
    ///
    /// Returns `None` for ids outside the catalog; callers treat that as
    /// "not alarmable", never as an error.
    pub fn from_id(id: i32) -> Option<Scope> {
        match id {
            1 => Some(Scope::Service),
            2 => Some(Scope::ServiceInstance),
            3 => Some(Scope::Endpoint),
            4 => Some(Scope::SqlAccess),
            _ => None,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Scope::Service => 1,
            Scope::ServiceInstance => 2,
            Scope::Endpoint => 3,
            Scope::SqlAccess => 4,
        }
    }
}

/// Metadata attached to a computed metric value by the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricMeta {
    /// Raw scope id; resolved against the [`Scope`] catalog on dispatch.
    pub scope_id: i32,

    /// Identity of the entity this value was computed for.
    pub entity_id: EntityId,

    /// Metric name used to match alarm rules (e.g. `endpoint_avg`).
    pub metrics_name: String,
}

/// One computed metric value flowing into the alarm pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub meta: MetricMeta,

    /// Aggregated value for the covered interval.
    pub value: f64,

    /// Interval timestamp in epoch milliseconds.
    pub timestamp: i64,
}

/// Current wall clock in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
