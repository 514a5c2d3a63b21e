//! AlarmCore - running-rule context and callback dispatch
//!
//! The core owns the mapping from metric name to the live [`RunningRule`]
//! instances evaluating it. The whole mapping is one immutable snapshot
//! behind an atomic pointer: a rule reload builds a fresh context and swaps
//! it wholesale, so an in-flight evaluation keeps working against the
//! snapshot it loaded and never sees a mixed rule set.
//!
//! Callbacks are fixed at construction. A failing callback is logged and
//! isolated; the remaining callbacks and all later evaluations proceed.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, error};

use super::event::{AlarmCallback, AlarmMessage};
use super::rule::AlarmRule;
use super::running::RunningRule;

/// Immutable mapping from metric name to running rules
#[derive(Default)]
pub struct RunningContext {
    rules: HashMap<String, Vec<Arc<RunningRule>>>,
}

impl RunningContext {
    fn build(rules: &[Arc<AlarmRule>]) -> Self {
        let mut mapping: HashMap<String, Vec<Arc<RunningRule>>> = HashMap::new();

        for rule in rules {
            mapping
                .entry(rule.metrics_name.clone())
                .or_default()
                .push(Arc::new(RunningRule::new(rule.clone())));
        }

        Self { rules: mapping }
    }
}

pub struct AlarmCore {
    context: ArcSwap<RunningContext>,
    callbacks: Vec<Arc<dyn AlarmCallback>>,
}

impl AlarmCore {
    pub fn new(rules: &[Arc<AlarmRule>], callbacks: Vec<Arc<dyn AlarmCallback>>) -> Self {
        Self {
            context: ArcSwap::from_pointee(RunningContext::build(rules)),
            callbacks,
        }
    }

    /// Replace the running context wholesale from a new rule set.
    ///
    /// Window state of the previous context is discarded; rules start
    /// accumulating from scratch, which keeps the swap race-free.
    pub fn rebuild(&self, rules: &[Arc<AlarmRule>]) {
        debug!("rebuilding alarm context with {} rules", rules.len());
        self.context.store(Arc::new(RunningContext::build(rules)));
    }

    /// Running rules for a metric name, all taken from one snapshot.
    ///
    /// Pure lookup, safe for highly concurrent access; an empty result means
    /// the metric is not alarmable right now.
    pub fn find_running_rules(&self, metrics_name: &str) -> Vec<Arc<RunningRule>> {
        self.context
            .load()
            .rules
            .get(metrics_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Fan an alarm out to every registered callback.
    pub async fn dispatch(&self, alarm: &AlarmMessage) {
        for callback in &self.callbacks {
            if let Err(e) = callback.on_fire(alarm).await {
                error!(
                    "alarm callback failed for rule {}: {e:#}",
                    alarm.rule_name
                );
            }
        }
    }
}
