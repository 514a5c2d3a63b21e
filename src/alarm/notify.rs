//! NotifyDispatcher - metric fan-in to the alarm engine
//!
//! Entry point for computed metric values. For each sample the dispatcher:
//!
//! 1. Resolves the raw scope id against the recognized catalogs; unknown
//!    scopes are silently dropped, not errors.
//! 2. Builds a display-friendly alarm subject from inventory metadata.
//!    Hierarchical scopes (endpoint, SQL access) compose the owning
//!    service's name as `"<child> in <parent>"`. If the entity or its owner
//!    cannot be resolved, the metric is dropped with a warning - an alarm
//!    without a readable subject is worse than a dropped alarm.
//! 3. Looks up the running rules for the metric name (one snapshot load)
//!    and feeds the sample into each; firings go to the core's callbacks.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{instrument, trace, warn};

use crate::inventory::cache::InventoryCache;
use crate::inventory::entity::{EntityId, NONE};
use crate::{MetricSample, Scope};

use super::core::AlarmCore;
use super::event::AlarmSubject;

pub struct NotifyDispatcher {
    caches: HashMap<Scope, Arc<InventoryCache>>,
    core: Arc<AlarmCore>,
}

impl NotifyDispatcher {
    /// Wire the dispatcher to the per-kind inventory caches and the alarm
    /// core. All collaborators are injected at construction.
    pub fn new(caches: HashMap<Scope, Arc<InventoryCache>>, core: Arc<AlarmCore>) -> Self {
        Self { caches, core }
    }

    #[instrument(skip(self, sample), fields(metric = %sample.meta.metrics_name))]
    pub async fn notify(&self, sample: &MetricSample) {
        let Some(scope) = Scope::from_id(sample.meta.scope_id) else {
            trace!(
                "metric carries unrecognized scope id {}, dropping",
                sample.meta.scope_id
            );
            return;
        };

        let Some(subject) = self.resolve_subject(scope, sample.meta.entity_id).await else {
            warn!(
                "cannot resolve alarm subject for entity {} in {scope:?} inventory, dropping metric",
                sample.meta.entity_id
            );
            return;
        };

        let rules = self.core.find_running_rules(&sample.meta.metrics_name);
        if rules.is_empty() {
            return;
        }

        for rule in rules {
            if let Some(alarm) = rule.in_sample(&subject, sample) {
                self.core.dispatch(&alarm).await;
            }
        }
    }

    async fn resolve_subject(&self, scope: Scope, entity_id: EntityId) -> Option<AlarmSubject> {
        let cache = self.caches.get(&scope)?;
        let record = cache.get(entity_id).await?;

        let name = match scope {
            Scope::Service | Scope::ServiceInstance => record.attrs.name().to_string(),

            // Hierarchical scopes render with their owning service.
            Scope::Endpoint | Scope::SqlAccess => {
                let service_id = record.attrs.service_id().unwrap_or(NONE);
                let service = self.caches.get(&Scope::Service)?.get(service_id).await?;
                format!("{} in {}", record.attrs.name(), service.attrs.name())
            }
        };

        Some(AlarmSubject {
            scope,
            entity_id,
            name,
        })
    }
}
