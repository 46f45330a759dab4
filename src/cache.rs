//! TTL-bounded cache of analysis results
//!
//! Avoids paying for a fresh analysis when a near-identical change was
//! already analyzed in the same session. Keys hash the change language
//! and a fixed-length content prefix together with the session id;
//! cross-session collisions are possible but bounded, which is
//! acceptable for an advisory system. Expired entries are never
//! returned from `get`;
//! a periodic sweep purges them so memory does not grow between reads.

use crate::change::CodeChange;
use crate::dispatch::AnalysisResult;
use crate::util;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

pub const DEFAULT_TTL_MINUTES: i64 = 30;

/// A cached analysis with its expiry bookkeeping
#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub result: AnalysisResult,
    /// Session that paid for the analysis
    pub session: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct AnalysisCache {
    entries: HashMap<String, CachedAnalysis>,
    ttl: Duration,
}

impl AnalysisCache {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn get(&self, change: &CodeChange, session_id: &str) -> Option<&CachedAnalysis> {
        self.get_at(Utc::now(), change, session_id)
    }

    /// Look up an unexpired entry for this change and session.
    pub fn get_at(
        &self,
        now: DateTime<Utc>,
        change: &CodeChange,
        session_id: &str,
    ) -> Option<&CachedAnalysis> {
        self.entries
            .get(&cache_key(change, session_id))
            .filter(|entry| now <= entry.expires_at)
    }

    pub fn put(&mut self, change: &CodeChange, result: AnalysisResult, session_id: &str) {
        self.put_at(Utc::now(), change, result, session_id);
    }

    pub fn put_at(
        &mut self,
        now: DateTime<Utc>,
        change: &CodeChange,
        result: AnalysisResult,
        session_id: &str,
    ) {
        self.entries.insert(
            cache_key(change, session_id),
            CachedAnalysis {
                result,
                session: session_id.to_string(),
                created_at: now,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn sweep(&mut self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn sweep_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.expires_at);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stable key over (language, hash(content prefix + session)).
fn cache_key(change: &CodeChange, session_id: &str) -> String {
    let content_hash = util::hash_str(&format!("{}{}", change.content_prefix(), session_id));
    util::hash_str(&format!("{}:{}", change.language, content_hash))
}
