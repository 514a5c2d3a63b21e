use tracing::trace;

use crate::alarm::rule::{AlarmRule, CompareOp};

/// Sizing knobs for the inventory core
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct CoreConfig {
    /// Upper bound per cache direction and entity kind.
    #[serde(default = "default_max_inventory_size")]
    pub max_inventory_size: usize,

    /// Worker tasks in the reconciliation stream processor.
    #[serde(default = "default_reconcile_workers")]
    pub reconcile_workers: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_inventory_size: default_max_inventory_size(),
            reconcile_workers: default_reconcile_workers(),
        }
    }
}

fn default_max_inventory_size() -> usize {
    10_000
}

fn default_reconcile_workers() -> usize {
    4
}

/// Top-level alarm rules file
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RulesFile {
    pub rules: Vec<RuleConfig>,
}

/// One rule definition as written by operators
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RuleConfig {
    pub rule_name: String,
    pub metrics_name: String,

    /// Comparison operator symbol: `>`, `>=`, `<`, `<=`, `=`.
    pub op: String,
    pub threshold: f64,

    #[serde(default = "default_period")]
    pub period: usize,

    #[serde(default = "default_count")]
    pub count: usize,

    pub silence_period: Option<usize>,

    #[serde(default)]
    pub include_names: Vec<String>,

    #[serde(default)]
    pub exclude_names: Vec<String>,

    pub message: Option<String>,
}

fn default_period() -> usize {
    10
}

fn default_count() -> usize {
    3
}

impl RuleConfig {
    pub fn into_rule(self) -> anyhow::Result<AlarmRule> {
        let op = CompareOp::parse(&self.op).ok_or_else(|| {
            anyhow::anyhow!(
                "unsupported comparison operator `{}` in rule {}",
                self.op,
                self.rule_name
            )
        })?;

        if self.period == 0 || self.count == 0 {
            anyhow::bail!("rule {} needs a non-zero period and count", self.rule_name);
        }

        if self.count > self.period {
            anyhow::bail!(
                "rule {} can never fire: count {} exceeds period {}",
                self.rule_name,
                self.count,
                self.period
            );
        }

        Ok(AlarmRule {
            rule_name: self.rule_name,
            metrics_name: self.metrics_name,
            op,
            threshold: self.threshold,
            period: self.period,
            count: self.count,
            silence_period: self.silence_period,
            include_names: self.include_names,
            exclude_names: self.exclude_names,
            message: self.message,
        })
    }
}

pub fn read_rules_file(path: &str) -> anyhow::Result<Vec<AlarmRule>> {
    let file_content = std::fs::read_to_string(path)?;
    parse_rules(&file_content)
}

pub fn parse_rules(content: &str) -> anyhow::Result<Vec<AlarmRule>> {
    let parsed: RulesFile = serde_json::from_str(content)
        .map_err(|_| anyhow::anyhow!("Invalid alarm rules file provided!"))
        .inspect(|file| trace!("loaded rules: {file:?}"))?;

    parsed.rules.into_iter().map(RuleConfig::into_rule).collect()
}
