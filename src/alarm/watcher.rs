//! Hot-reloadable alarm rule set
//!
//! Holds the active rule definitions as an atomically-swappable immutable
//! snapshot. A reload replaces the snapshot wholesale and rebuilds the
//! core's running context, so readers never observe a partially-updated
//! rule set.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use super::core::AlarmCore;
use super::rule::AlarmRule;

pub struct RulesWatcher {
    rules: ArcSwap<Vec<Arc<AlarmRule>>>,
    core: Arc<AlarmCore>,
}

impl RulesWatcher {
    pub fn new(rules: Vec<AlarmRule>, core: Arc<AlarmCore>) -> Self {
        let rules: Vec<Arc<AlarmRule>> = rules.into_iter().map(Arc::new).collect();
        core.rebuild(&rules);

        Self {
            rules: ArcSwap::from_pointee(rules),
            core,
        }
    }

    /// Replace the active rule set wholesale.
    pub fn reload(&self, rules: Vec<AlarmRule>) {
        let rules: Vec<Arc<AlarmRule>> = rules.into_iter().map(Arc::new).collect();
        info!("reloading alarm rules ({} definitions)", rules.len());

        // Rebuild first so a reader racing the swap sees either the old
        // snapshot with the old context or the new one with the new context.
        self.core.rebuild(&rules);
        self.rules.store(Arc::new(rules));
    }

    /// The currently active rule snapshot.
    pub fn active(&self) -> Arc<Vec<Arc<AlarmRule>>> {
        self.rules.load_full()
    }

    /// Rule definitions applying to a metric name; lock-free read against
    /// the current snapshot.
    pub fn rules_for_metric(&self, metrics_name: &str) -> Vec<Arc<AlarmRule>> {
        self.active()
            .iter()
            .filter(|rule| rule.metrics_name == metrics_name)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::rule::CompareOp;

    fn rule(name: &str, metric: &str) -> AlarmRule {
        AlarmRule {
            rule_name: name.to_string(),
            metrics_name: metric.to_string(),
            op: CompareOp::Gt,
            threshold: 1.0,
            period: 5,
            count: 3,
            silence_period: None,
            include_names: vec![],
            exclude_names: vec![],
            message: None,
        }
    }

    #[test]
    fn reload_replaces_the_snapshot_wholesale() {
        let core = Arc::new(AlarmCore::new(&[], vec![]));
        let watcher = RulesWatcher::new(vec![rule("r1", "endpoint_avg")], core.clone());

        assert_eq!(watcher.rules_for_metric("endpoint_avg").len(), 1);
        assert_eq!(core.find_running_rules("endpoint_avg").len(), 1);

        watcher.reload(vec![rule("r2", "service_p99"), rule("r3", "service_p99")]);

        assert!(watcher.rules_for_metric("endpoint_avg").is_empty());
        assert_eq!(watcher.rules_for_metric("service_p99").len(), 2);
        assert!(core.find_running_rules("endpoint_avg").is_empty());
        assert_eq!(core.find_running_rules("service_p99").len(), 2);
    }

    #[test]
    fn active_snapshot_is_stable_across_reloads() {
        let core = Arc::new(AlarmCore::new(&[], vec![]));
        let watcher = RulesWatcher::new(vec![rule("r1", "endpoint_avg")], core);

        let snapshot = watcher.active();
        watcher.reload(vec![]);

        // The caller's snapshot is untouched by the swap.
        assert_eq!(snapshot.len(), 1);
        assert!(watcher.active().is_empty());
    }
}
