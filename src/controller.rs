//! Analysis admission control
//!
//! The orchestrator owning every piece of mutable state: the rule
//! table, token bucket, cooldown timestamps, result cache, and the
//! pending-analysis queue. `should_trigger` is the one decision path:
//! classify, bypass for immediate, then cache, cooldown, and token
//! checks in that order. Cache is consulted before any rate budget is
//! spent; cooldown guards repeats of the same issue class; the bucket
//! is the last, coarsest gate on total call volume. Every branch
//! returns a concrete decision; suppression is an outcome, not an
//! error.

use crate::bucket::TokenBucket;
use crate::cache::AnalysisCache;
use crate::change::CodeChange;
use crate::config::ControllerConfig;
use crate::cooldown::CooldownTracker;
use crate::dispatch::AnalysisResult;
use crate::queue::{AnalysisQueue, AnalysisRequest};
use crate::rules::{Priority, RuleTable, TriggerRule};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const REASON_CRITICAL: &str = "critical issue detected";
pub const REASON_CACHED: &str = "using cached analysis";
pub const REASON_COOLDOWN: &str = "in cooldown period";
pub const REASON_RATE_LIMITED: &str = "rate limit exceeded";
pub const REASON_APPROVED: &str = "analysis approved";

/// Outcome of one admission check. `trigger == false` is throttling
/// behavior, not a failure; the reason is surfaced as diagnostic text.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub trigger: bool,
    pub priority: Priority,
    pub reason: &'static str,
    pub use_cache: bool,
}

/// Diagnostic snapshot for status surfaces
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub tokens: u32,
    pub token_capacity: u32,
    pub queue_size: usize,
    pub cache_size: usize,
    pub active_rule_ids: Vec<String>,
    /// Tokens billed across this controller's lifetime, from recorded
    /// analysis results
    pub session_tokens: u64,
}

pub struct AdmissionController {
    config: ControllerConfig,
    rules: RuleTable,
    bucket: TokenBucket,
    cooldowns: CooldownTracker,
    cache: AnalysisCache,
    queue: AnalysisQueue,
    session_tokens: u64,
}

impl AdmissionController {
    /// Construct with the built-in rule table.
    pub fn new(config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, RuleTable::with_defaults()))
    }

    /// Construct with a host-supplied rule table. Misconfiguration in
    /// either the config or the rules is reported here, never at
    /// decision time.
    pub fn with_rules(config: ControllerConfig, rules: Vec<TriggerRule>) -> Result<Self> {
        config.validate()?;
        let table = RuleTable::new(rules)?;
        Ok(Self::assemble(config, table))
    }

    fn assemble(config: ControllerConfig, rules: RuleTable) -> Self {
        let bucket = TokenBucket::new(config.bucket_capacity, config.refill_rate_per_sec);
        let cooldowns = CooldownTracker::new(config.default_cooldown_ms);
        let cache = AnalysisCache::new(config.cache_ttl_minutes);
        Self {
            config,
            rules,
            bucket,
            cooldowns,
            cache,
            queue: AnalysisQueue::new(),
            session_tokens: 0,
        }
    }

    /// Should this change trigger an analysis now?
    pub fn should_trigger(&mut self, change: &CodeChange, session_id: &str) -> Decision {
        self.decide_at(Utc::now(), change, session_id)
    }

    /// Decision path with an explicit clock, for deterministic replay.
    pub fn decide_at(
        &mut self,
        now: DateTime<Utc>,
        change: &CodeChange,
        session_id: &str,
    ) -> Decision {
        let priority = self.rules.classify(change);

        // Immediate skips every gate so syntax errors and null
        // dereference risks are never silently dropped. The caller
        // dispatches these directly; they do not touch the queue.
        if priority == Priority::Immediate {
            return Decision {
                trigger: true,
                priority,
                reason: REASON_CRITICAL,
                use_cache: false,
            };
        }

        if self.cache.get_at(now, change, session_id).is_some() {
            return Decision {
                trigger: false,
                priority,
                reason: REASON_CACHED,
                use_cache: true,
            };
        }

        if self.cooldowns.is_in_cooldown_at(now, priority, &self.rules) {
            return Decision {
                trigger: false,
                priority,
                reason: REASON_COOLDOWN,
                use_cache: false,
            };
        }

        if !self.bucket.try_consume_at(now, priority) {
            return Decision {
                trigger: false,
                priority,
                reason: REASON_RATE_LIMITED,
                use_cache: false,
            };
        }

        self.cooldowns.mark_triggered_at(now, priority);
        Decision {
            trigger: true,
            priority,
            reason: REASON_APPROVED,
            use_cache: false,
        }
    }

    pub fn classify(&self, change: &CodeChange) -> Priority {
        self.rules.classify(change)
    }

    /// Queue an admitted request for the periodic drain.
    pub fn enqueue_analysis(&mut self, request: AnalysisRequest) {
        self.queue.enqueue(request);
    }

    pub fn dequeue_analysis(&mut self) -> Option<AnalysisRequest> {
        self.queue.dequeue()
    }

    pub fn get_cached_analysis(
        &self,
        change: &CodeChange,
        session_id: &str,
    ) -> Option<AnalysisResult> {
        self.cache
            .get(change, session_id)
            .map(|cached| cached.result.clone())
    }

    /// Store a completed analysis and meter its billed tokens.
    pub fn set_cached_analysis(
        &mut self,
        change: &CodeChange,
        result: AnalysisResult,
        session_id: &str,
    ) {
        if let Some(tokens) = result.tokens_used {
            self.session_tokens += u64::from(tokens);
        }
        self.cache.put(change, result, session_id);
    }

    /// Feedback loop: the host reports whether a rule's suggestion was
    /// applied (helpful) or dismissed. Returns false for unknown ids.
    pub fn adjust_cooldown(&mut self, rule_id: &str, was_helpful: bool) -> bool {
        self.rules.adjust_cooldown(rule_id, was_helpful)
    }

    /// Purge expired cache entries; returns how many were removed.
    pub fn sweep_cache(&mut self) -> usize {
        self.cache.sweep()
    }

    pub fn status(&self) -> ControllerStatus {
        let bucket = self.bucket.status();
        ControllerStatus {
            tokens: bucket.tokens,
            token_capacity: bucket.capacity,
            queue_size: self.queue.len(),
            cache_size: self.cache.len(),
            active_rule_ids: self.rules.ids(),
            session_tokens: self.session_tokens,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    #[cfg(test)]
    pub(crate) fn cache_mut(&mut self) -> &mut AnalysisCache {
        &mut self.cache
    }
}
