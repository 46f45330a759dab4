//! Trigger rules and priority classification
//!
//! A fixed, ordered table of keyword rules maps change content to a
//! priority class. The first rule with a matching trigger substring wins;
//! changes matching no rule fall back to size/kind heuristics. Rule
//! cooldowns are the only runtime-mutable part of the table, adjusted by
//! the adaptive tuner as the user applies or dismisses suggestions.

use crate::change::{ChangeKind, CodeChange};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Cooldown bounds for adaptive tuning
const MIN_COOLDOWN_MS: i64 = 1_000;
const MAX_COOLDOWN_MS: i64 = 120_000;

/// Urgency class for an analysis trigger, most urgent first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Immediate,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Token-bucket cost: urgent work is cheap so it is starved last.
    pub fn token_cost(&self) -> f64 {
        match self {
            Priority::Immediate => 1.0,
            Priority::High => 2.0,
            Priority::Medium => 3.0,
            Priority::Low => 4.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Immediate => "immediate",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// One entry in the trigger rule table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRule {
    pub id: String,
    pub priority: Priority,
    /// Case-insensitive substrings that activate the rule
    pub triggers: Vec<String>,
    pub cooldown_ms: i64,
    /// Whether matching this rule warrants a billed external call
    pub call_required: bool,
    pub description: String,
}

impl TriggerRule {
    /// Check whether any trigger substring occurs in the content,
    /// case-insensitively.
    pub fn matches(&self, content: &str) -> bool {
        let haystack = content.to_lowercase();
        self.triggers
            .iter()
            .any(|t| haystack.contains(&t.to_lowercase()))
    }
}

/// The ordered rule table plus classification fallback heuristics
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<TriggerRule>,
}

impl RuleTable {
    /// Validate and adopt a rule table. Misconfiguration is reported
    /// here, at construction, never at decision time.
    pub fn new(rules: Vec<TriggerRule>) -> Result<Self> {
        let mut ids = HashSet::new();
        let mut priorities = HashSet::new();

        for rule in &rules {
            if rule.id.trim().is_empty() {
                bail!("trigger rule with empty id");
            }
            if !ids.insert(rule.id.as_str()) {
                bail!("duplicate trigger rule id: {}", rule.id);
            }
            if !priorities.insert(rule.priority) {
                bail!(
                    "duplicate priority {} across trigger rules (cooldown lookup would be ambiguous)",
                    rule.priority.label()
                );
            }
            if rule.triggers.is_empty() {
                bail!("trigger rule {} has no trigger substrings", rule.id);
            }
            if rule.cooldown_ms <= 0 {
                bail!(
                    "trigger rule {} has non-positive cooldown ({}ms)",
                    rule.id,
                    rule.cooldown_ms
                );
            }
        }

        Ok(Self { rules })
    }

    /// The built-in mentoring rule table.
    pub fn with_defaults() -> Self {
        // Known-good table; validation cannot fail on it.
        Self {
            rules: default_rules(),
        }
    }

    /// Load a rule table from JSON (host-tuned tables go through the
    /// same validation as the built-in one).
    pub fn from_json(raw: &str) -> Result<Self> {
        let rules: Vec<TriggerRule> = serde_json::from_str(raw)?;
        Self::new(rules)
    }

    /// Assign a priority to a change: first matching rule in table order
    /// wins, otherwise size/kind heuristics.
    pub fn classify(&self, change: &CodeChange) -> Priority {
        for rule in &self.rules {
            if rule.matches(&change.content) {
                return rule.priority;
            }
        }

        if change.lines_changed > 50 {
            Priority::High
        } else if change.lines_changed > 20 {
            Priority::Medium
        } else if change.kind == ChangeKind::Deletion {
            Priority::Low
        } else {
            Priority::Medium
        }
    }

    /// Cooldown window for a priority class, from the rule carrying it.
    pub fn cooldown_for(&self, priority: Priority) -> Option<i64> {
        self.rules
            .iter()
            .find(|r| r.priority == priority)
            .map(|r| r.cooldown_ms)
    }

    /// Adaptive tuning: shrink the cooldown of rules the user finds
    /// helpful, grow the cooldown of noisy ones. Returns false for an
    /// unknown rule id.
    pub fn adjust_cooldown(&mut self, rule_id: &str, was_helpful: bool) -> bool {
        let Some(rule) = self.rules.iter_mut().find(|r| r.id == rule_id) else {
            return false;
        };

        rule.cooldown_ms = if was_helpful {
            (rule.cooldown_ms * 9 / 10).max(MIN_COOLDOWN_MS)
        } else {
            (rule.cooldown_ms * 12 / 10).min(MAX_COOLDOWN_MS)
        };
        true
    }

    pub fn rule(&self, rule_id: &str) -> Option<&TriggerRule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Built-in rules, ordered most urgent first. Triggers are lowercase
/// keyword markers, not patterns (literal containment only).
fn default_rules() -> Vec<TriggerRule> {
    vec![
        TriggerRule {
            id: "critical-errors".to_string(),
            priority: Priority::Immediate,
            triggers: vec![
                "syntaxerror".to_string(),
                "referenceerror".to_string(),
                "unexpected token".to_string(),
                "cannot read propert".to_string(),
                "nullpointerexception".to_string(),
                "null pointer".to_string(),
                "undefined is not a".to_string(),
            ],
            cooldown_ms: 1_000,
            call_required: true,
            description: "Syntax errors and null dereference risks".to_string(),
        },
        TriggerRule {
            id: "security-risks".to_string(),
            priority: Priority::High,
            triggers: vec![
                "eval(".to_string(),
                "exec(".to_string(),
                "innerhtml".to_string(),
                "document.write".to_string(),
                "dangerouslysetinnerhtml".to_string(),
                "os.system".to_string(),
                "pickle.loads".to_string(),
                "child_process".to_string(),
            ],
            cooldown_ms: 5_000,
            call_required: true,
            description: "Injection-prone and unsafe execution patterns".to_string(),
        },
        TriggerRule {
            id: "async-pitfalls".to_string(),
            priority: Priority::Medium,
            triggers: vec![
                "settimeout(".to_string(),
                "setinterval(".to_string(),
                "promise.all".to_string(),
                ".then(".to_string(),
                "await ".to_string(),
            ],
            cooldown_ms: 15_000,
            call_required: true,
            description: "Timing and promise-handling pitfalls".to_string(),
        },
        TriggerRule {
            id: "housekeeping-markers".to_string(),
            priority: Priority::Low,
            // Explicit developer flags; no billed call needed to surface them
            triggers: vec![
                "todo".to_string(),
                "fixme".to_string(),
                "hack".to_string(),
                "xxx".to_string(),
            ],
            cooldown_ms: 30_000,
            call_required: false,
            description: "Developer housekeeping markers".to_string(),
        },
    ]
}
