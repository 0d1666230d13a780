use super::config::{Action, Rule};
use super::pattern::HostPattern;

/// A rule with its host glob compiled.
#[derive(Debug, Clone)]
struct CompiledRule {
    action: Action,
    host: HostPattern,
    method: Option<String>,
}

impl CompiledRule {
    fn applies(&self, method: &str, host: &str) -> bool {
        if !self.host.matches(host) {
            return false;
        }
        match &self.method {
            Some(m) => m.eq_ignore_ascii_case(method),
            None => true,
        }
    }

    fn describe(&self) -> String {
        let action = match self.action {
            Action::Allow => "allow",
            Action::Deny => "deny",
        };
        match &self.method {
            Some(m) => format!("{} {} {}", action, m.to_uppercase(), self.host.as_str()),
            None => format!("{} {}", action, self.host.as_str()),
        }
    }
}

/// Result of a network policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub action: Action,
    pub reason: String,
    /// Zero-based index of the rule that decided, `None` for default deny.
    pub matched_rule: Option<usize>,
}

impl Evaluation {
    pub fn is_allowed(&self) -> bool {
        self.action == Action::Allow
    }
}

/// Ordered, first-match-wins network rules with default deny.
///
/// Built once from configuration and only read afterwards, so one instance
/// can be shared across request handlers without locking.
#[derive(Debug, Clone, Default)]
pub struct NetworkPolicy {
    rules: Vec<CompiledRule>,
}

impl NetworkPolicy {
    pub fn new(rules: &[Rule]) -> Self {
        let rules = rules
            .iter()
            .map(|r| CompiledRule {
                action: r.action,
                host: HostPattern::new(&r.host),
                method: r.method.clone(),
            })
            .collect();
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate a request. The first rule whose host glob matches `host` and
    /// whose method (if any) equals `method` ignoring case decides. No match
    /// denies.
    pub fn evaluate(&self, method: &str, host: &str) -> Evaluation {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.applies(method, host) {
                return Evaluation {
                    action: rule.action,
                    reason: format!("rule #{} {}", index + 1, rule.describe()),
                    matched_rule: Some(index),
                };
            }
        }

        Evaluation {
            action: Action::Deny,
            reason: "no matching rule (default deny)".to_string(),
            matched_rule: None,
        }
    }

    pub fn is_allowed(&self, method: &str, host: &str) -> bool {
        self.evaluate(method, host).is_allowed()
    }
}
