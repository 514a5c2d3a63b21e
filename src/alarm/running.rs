//! RunningRule - live sliding-window evaluation of one rule
//!
//! A running rule holds one window per matched entity. Each window is a
//! fixed-capacity ring of time-aligned buckets; buckets older than the
//! window span are discarded, keeping memory bounded by
//! window length × entity cardinality × rule count.
//!
//! ## Window State Machine
//!
//! ```text
//! no samples yet                      → Quiet
//! breaching buckets < count           → Accumulating (no alarm)
//! breaching buckets >= count          → Fired (alarm, once per silence span)
//! breach sustained within silence     → Silenced (no duplicate alarm)
//! ```
//!
//! A transition into `Fired` produces exactly one alarm message; repeated
//! breaches while still inside the rule's silence period are reported as
//! `Silenced` until the cool-down elapses and the rule re-arms.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::inventory::entity::EntityId;
use crate::{MetricSample, Scope};

use super::event::{AlarmMessage, AlarmSubject};
use super::rule::AlarmRule;

/// Buckets are aligned to wall-clock minutes.
pub(crate) const BUCKET_MS: i64 = 60_000;

/// Outcome of feeding one sample into a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvaluation {
    Quiet,
    Accumulating,
    Fired,
    Silenced,
}

#[derive(Debug, Default)]
struct Window {
    /// (bucket, latest value in that bucket), ascending by bucket.
    samples: VecDeque<(i64, f64)>,

    /// Bucket of the last firing; governs the silence period.
    last_fired_bucket: Option<i64>,
}

impl Window {
    fn add(&mut self, rule: &AlarmRule, bucket: i64, value: f64) -> WindowEvaluation {
        let period = rule.period as i64;

        // Samples that fell out of the window before arriving are ignored.
        if let Some(&(newest, _)) = self.samples.back() {
            if bucket <= newest - period {
                return WindowEvaluation::Quiet;
            }
        }

        // Latest value wins within a bucket.
        if let Some(slot) = self.samples.iter_mut().find(|(b, _)| *b == bucket) {
            slot.1 = value;
        } else {
            let position = self
                .samples
                .iter()
                .position(|(b, _)| *b > bucket)
                .unwrap_or(self.samples.len());
            self.samples.insert(position, (bucket, value));
        }

        // Evict buckets that slid out of the window.
        let newest = self.samples.back().map(|(b, _)| *b).unwrap_or(bucket);
        while let Some(&(oldest, _)) = self.samples.front() {
            if oldest <= newest - period {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        let breaches = self
            .samples
            .iter()
            .filter(|(_, v)| rule.op.compare(*v, rule.threshold))
            .count();

        if breaches >= rule.count {
            match self.last_fired_bucket {
                Some(last) if newest - last < rule.silence() as i64 => WindowEvaluation::Silenced,
                _ => {
                    self.last_fired_bucket = Some(newest);
                    WindowEvaluation::Fired
                }
            }
        } else if breaches > 0 {
            WindowEvaluation::Accumulating
        } else {
            WindowEvaluation::Quiet
        }
    }
}

/// Live instance of one rule, tracking windows for every matched entity.
///
/// Windows are created lazily on first metric match and retained for the
/// life of the rule instance. Updates to one entity's window are
/// synchronized by the map shard; different entities never contend on the
/// same window.
pub struct RunningRule {
    rule: Arc<AlarmRule>,
    windows: DashMap<(Scope, EntityId), Window>,
}

impl RunningRule {
    pub fn new(rule: Arc<AlarmRule>) -> Self {
        Self {
            rule,
            windows: DashMap::new(),
        }
    }

    pub fn rule(&self) -> &AlarmRule {
        &self.rule
    }

    /// Feed one sample; returns an alarm message on a transition into
    /// `Fired`.
    pub fn in_sample(&self, subject: &AlarmSubject, sample: &MetricSample) -> Option<AlarmMessage> {
        if !self.rule.applies_to(&subject.name) {
            return None;
        }

        let bucket = sample.timestamp.div_euclid(BUCKET_MS);

        let evaluation = {
            let mut window = self
                .windows
                .entry((subject.scope, subject.entity_id))
                .or_default();
            window.add(&self.rule, bucket, sample.value)
        };

        trace!(
            "rule {} on {}: {} -> {evaluation:?}",
            self.rule.rule_name, subject.name, sample.value
        );

        match evaluation {
            WindowEvaluation::Fired => Some(self.build_message(subject, sample)),
            _ => None,
        }
    }

    fn build_message(&self, subject: &AlarmSubject, sample: &MetricSample) -> AlarmMessage {
        let message = match &self.rule.message {
            Some(template) => template.replace("{name}", &subject.name),
            None => format!(
                "{} of {} was {} {} in {} of the last {} minutes (latest {:.2})",
                self.rule.metrics_name,
                subject.name,
                self.rule.op.symbol(),
                self.rule.threshold,
                self.rule.count,
                self.rule.period,
                sample.value,
            ),
        };

        AlarmMessage {
            rule_name: self.rule.rule_name.clone(),
            metrics_name: self.rule.metrics_name.clone(),
            scope: subject.scope,
            entity_id: subject.entity_id,
            entity_name: subject.name.clone(),
            message,
            value: sample.value,
            start_time: sample.timestamp,
        }
    }
}
