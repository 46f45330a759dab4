//! Per-priority-class trigger cooldowns
//!
//! Suppresses repeated triggers of the same priority class inside the
//! window its rule defines. Immediate priority is never tracked here;
//! the controller bypasses cooldown for it entirely.

use crate::rules::{Priority, RuleTable};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub const DEFAULT_COOLDOWN_MS: i64 = 10_000;

pub struct CooldownTracker {
    /// Last admitted trigger per priority class; absent means never.
    last_trigger: HashMap<Priority, DateTime<Utc>>,
    /// Window for priorities no rule carries
    default_cooldown_ms: i64,
}

impl CooldownTracker {
    pub fn new(default_cooldown_ms: i64) -> Self {
        Self {
            last_trigger: HashMap::new(),
            default_cooldown_ms,
        }
    }

    pub fn is_in_cooldown(&self, priority: Priority, rules: &RuleTable) -> bool {
        self.is_in_cooldown_at(Utc::now(), priority, rules)
    }

    pub fn is_in_cooldown_at(
        &self,
        now: DateTime<Utc>,
        priority: Priority,
        rules: &RuleTable,
    ) -> bool {
        if priority == Priority::Immediate {
            return false;
        }
        let Some(last) = self.last_trigger.get(&priority) else {
            return false;
        };

        let window_ms = rules
            .cooldown_for(priority)
            .unwrap_or(self.default_cooldown_ms);
        (now - *last).num_milliseconds() < window_ms
    }

    pub fn mark_triggered(&mut self, priority: Priority) {
        self.mark_triggered_at(Utc::now(), priority);
    }

    pub fn mark_triggered_at(&mut self, now: DateTime<Utc>, priority: Priority) {
        self.last_trigger.insert(priority, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_never_triggered_is_not_in_cooldown() {
        let tracker = CooldownTracker::new(DEFAULT_COOLDOWN_MS);
        let rules = RuleTable::with_defaults();
        assert!(!tracker.is_in_cooldown_at(Utc::now(), Priority::High, &rules));
    }

    #[test]
    fn test_cooldown_window_from_rule() {
        let mut tracker = CooldownTracker::new(DEFAULT_COOLDOWN_MS);
        let rules = RuleTable::with_defaults();
        let start = Utc::now();

        // The high-priority rule carries a 5000ms window.
        tracker.mark_triggered_at(start, Priority::High);
        let within = start + Duration::milliseconds(2_000);
        assert!(tracker.is_in_cooldown_at(within, Priority::High, &rules));

        let past = start + Duration::milliseconds(6_000);
        assert!(!tracker.is_in_cooldown_at(past, Priority::High, &rules));
    }

    #[test]
    fn test_classes_are_tracked_independently() {
        let mut tracker = CooldownTracker::new(DEFAULT_COOLDOWN_MS);
        let rules = RuleTable::with_defaults();
        let start = Utc::now();

        tracker.mark_triggered_at(start, Priority::High);
        let soon = start + Duration::milliseconds(100);
        assert!(tracker.is_in_cooldown_at(soon, Priority::High, &rules));
        assert!(!tracker.is_in_cooldown_at(soon, Priority::Medium, &rules));
    }

    #[test]
    fn test_immediate_bypasses_cooldown() {
        let mut tracker = CooldownTracker::new(DEFAULT_COOLDOWN_MS);
        let rules = RuleTable::with_defaults();
        let start = Utc::now();

        tracker.mark_triggered_at(start, Priority::Immediate);
        assert!(!tracker.is_in_cooldown_at(start, Priority::Immediate, &rules));
    }
}
