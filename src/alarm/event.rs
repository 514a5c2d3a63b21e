//! Alarm subjects, messages, and the callback contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Scope;
use crate::inventory::entity::EntityId;

/// Display-friendly identity of the entity an alarm is about.
///
/// Built by the dispatcher from inventory metadata before any rule is
/// evaluated; hierarchical scopes carry their owner in the name
/// (`"GET:/orders in checkout"`).
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSubject {
    pub scope: Scope,
    pub entity_id: EntityId,
    pub name: String,
}

/// One firing of an alarm rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmMessage {
    pub rule_name: String,
    pub metrics_name: String,

    pub scope: Scope,
    pub entity_id: EntityId,
    pub entity_name: String,

    /// Rendered, human-readable description.
    pub message: String,

    /// The sample value that completed the trigger condition.
    pub value: f64,

    /// Timestamp of the triggering sample, epoch milliseconds.
    pub start_time: i64,
}

/// Receiver of alarm firings (webhook sender, pager bridge, ...).
///
/// Implementations are injected at core construction and are never part of
/// this crate. A failed callback is logged and isolated; it does not affect
/// other callbacks or later evaluations.
#[async_trait]
pub trait AlarmCallback: Send + Sync {
    async fn on_fire(&self, alarm: &AlarmMessage) -> anyhow::Result<()>;
}
