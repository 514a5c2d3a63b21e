//! Alarm rule definitions
//!
//! Rules are immutable once loaded; a reload replaces the whole set (see
//! [`super::watcher`]). Window lengths and silence periods are expressed in
//! one-minute buckets.

/// Comparison between an observed value and a rule threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl CompareOp {
    /// Parse the operator symbol used in rule files (`>`, `>=`, `<`, `<=`,
    /// `=`).
    pub fn parse(symbol: &str) -> Option<CompareOp> {
        match symbol.trim() {
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Gte),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Lte),
            "=" | "==" => Some(CompareOp::Eq),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Eq => "=",
        }
    }

    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            CompareOp::Gt => value > threshold,
            CompareOp::Gte => value >= threshold,
            CompareOp::Lt => value < threshold,
            CompareOp::Lte => value <= threshold,
            CompareOp::Eq => value == threshold,
        }
    }
}

/// One operator-defined alerting rule
#[derive(Debug, Clone)]
pub struct AlarmRule {
    /// Unique rule name, carried into alarm messages.
    pub rule_name: String,

    /// Metric this rule applies to.
    pub metrics_name: String,

    pub op: CompareOp,
    pub threshold: f64,

    /// Window length in buckets.
    pub period: usize,

    /// Breaching buckets within the window required to fire.
    pub count: usize,

    /// Cool-down after a firing, in buckets. Defaults to `period`.
    pub silence_period: Option<usize>,

    /// Only entities with these names are evaluated (empty = all).
    pub include_names: Vec<String>,

    /// Entities with these names are never evaluated.
    pub exclude_names: Vec<String>,

    /// Message template; `{name}` expands to the alarm subject.
    pub message: Option<String>,
}

impl AlarmRule {
    pub fn silence(&self) -> usize {
        self.silence_period.unwrap_or(self.period)
    }

    /// Whether the entity name passes this rule's include/exclude filters.
    pub fn applies_to(&self, entity_name: &str) -> bool {
        if self
            .exclude_names
            .iter()
            .any(|excluded| excluded == entity_name)
        {
            return false;
        }

        self.include_names.is_empty()
            || self
                .include_names
                .iter()
                .any(|included| included == entity_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_with_filters(include: &[&str], exclude: &[&str]) -> AlarmRule {
        AlarmRule {
            rule_name: "endpoint_avg_rule".to_string(),
            metrics_name: "endpoint_avg".to_string(),
            op: CompareOp::Gte,
            threshold: 75.0,
            period: 10,
            count: 3,
            silence_period: None,
            include_names: include.iter().map(|s| s.to_string()).collect(),
            exclude_names: exclude.iter().map(|s| s.to_string()).collect(),
            message: None,
        }
    }

    #[test]
    fn parse_known_operators() {
        assert_eq!(CompareOp::parse(">"), Some(CompareOp::Gt));
        assert_eq!(CompareOp::parse(" >= "), Some(CompareOp::Gte));
        assert_eq!(CompareOp::parse("=="), Some(CompareOp::Eq));
        assert_eq!(CompareOp::parse("~"), None);
    }

    #[test]
    fn compare_matches_symbol_semantics() {
        assert!(CompareOp::Gt.compare(80.0, 75.0));
        assert!(!CompareOp::Gt.compare(75.0, 75.0));
        assert!(CompareOp::Gte.compare(75.0, 75.0));
        assert!(CompareOp::Lt.compare(10.0, 75.0));
        assert!(CompareOp::Eq.compare(75.0, 75.0));
    }

    #[test]
    fn empty_include_list_matches_everything() {
        let rule = rule_with_filters(&[], &[]);
        assert!(rule.applies_to("checkout"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let rule = rule_with_filters(&["checkout"], &["checkout"]);
        assert!(!rule.applies_to("checkout"));
    }

    #[test]
    fn include_list_restricts_matching() {
        let rule = rule_with_filters(&["checkout"], &[]);
        assert!(rule.applies_to("checkout"));
        assert!(!rule.applies_to("billing"));
    }

    #[test]
    fn silence_defaults_to_period() {
        let mut rule = rule_with_filters(&[], &[]);
        assert_eq!(rule.silence(), 10);

        rule.silence_period = Some(3);
        assert_eq!(rule.silence(), 3);
    }
}
