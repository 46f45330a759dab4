//! Code change snapshots
//!
//! A `CodeChange` is the unit the admission controller reasons about:
//! the current and previous content of an edited file plus a derived
//! content signature used for cache keys. Immutable once constructed.

use crate::util;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How many leading characters feed the content signature. Edits past
/// this prefix hash identically, which is an accepted false-cache-hit
/// risk for an advisory system.
const SIGNATURE_PREFIX_CHARS: usize = 200;

/// Kind of edit that produced the change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Addition,
    Deletion,
    Modification,
}

impl ChangeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Addition => "addition",
            ChangeKind::Deletion => "deletion",
            ChangeKind::Modification => "modification",
        }
    }
}

/// A snapshot of one edit to one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChange {
    /// Full content after the edit
    pub content: String,
    /// Full content before the edit
    pub previous_content: String,
    /// Source file the edit touched
    pub file: PathBuf,
    /// Language identifier, e.g. "rust" or "typescript"
    pub language: String,
    pub kind: ChangeKind,
    pub lines_changed: usize,
    signature: String,
}

impl CodeChange {
    pub fn new(
        file: PathBuf,
        language: impl Into<String>,
        kind: ChangeKind,
        previous_content: impl Into<String>,
        content: impl Into<String>,
        lines_changed: usize,
    ) -> Self {
        let content = content.into();
        let signature = util::hash_str(util::char_prefix(&content, SIGNATURE_PREFIX_CHARS));
        Self {
            content,
            previous_content: previous_content.into(),
            file,
            language: language.into(),
            kind,
            lines_changed,
            signature,
        }
    }

    /// Build a change from before/after content, deriving the kind and
    /// the number of changed lines.
    pub fn from_contents(
        file: PathBuf,
        language: impl Into<String>,
        previous_content: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let previous_content = previous_content.into();
        let content = content.into();

        let kind = if previous_content.is_empty() && !content.is_empty() {
            ChangeKind::Addition
        } else if content.is_empty() && !previous_content.is_empty() {
            ChangeKind::Deletion
        } else {
            ChangeKind::Modification
        };

        let lines_changed = count_changed_lines(&previous_content, &content);
        Self::new(file, language, kind, previous_content, content, lines_changed)
    }

    /// Stable hash of the content prefix, for cache-key construction.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The fixed-length content prefix the signature is computed over.
    pub(crate) fn content_prefix(&self) -> &str {
        util::char_prefix(&self.content, SIGNATURE_PREFIX_CHARS)
    }
}

/// Count lines that differ between two snapshots: positionally changed
/// lines plus the surplus of whichever side is longer.
fn count_changed_lines(previous: &str, current: &str) -> usize {
    let old: Vec<&str> = previous.lines().collect();
    let new: Vec<&str> = current.lines().collect();

    let shared = old.len().min(new.len());
    let mut changed = old.len().max(new.len()) - shared;
    for i in 0..shared {
        if old[i] != new[i] {
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(previous: &str, current: &str) -> CodeChange {
        CodeChange::from_contents(PathBuf::from("src/main.ts"), "typescript", previous, current)
    }

    #[test]
    fn test_kind_derivation() {
        assert_eq!(change("", "let x = 1;").kind, ChangeKind::Addition);
        assert_eq!(change("let x = 1;", "").kind, ChangeKind::Deletion);
        assert_eq!(change("let x = 1;", "").kind.label(), "deletion");
        assert_eq!(change("let x = 1;", "let x = 2;").kind, ChangeKind::Modification);
    }

    #[test]
    fn test_count_changed_lines() {
        assert_eq!(count_changed_lines("a\nb\nc", "a\nB\nc"), 1);
        assert_eq!(count_changed_lines("a\nb", "a\nb\nc\nd"), 2);
        assert_eq!(count_changed_lines("a\nb", "a\nB\nc"), 2);
        assert_eq!(count_changed_lines("same", "same"), 0);
    }

    #[test]
    fn test_signature_stable_for_identical_content() {
        let a = change("", "const x = compute();");
        let b = change("old", "const x = compute();");
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_signature_ignores_edits_past_prefix() {
        let prefix = "x".repeat(200);
        let a = change("", &format!("{}tail one", prefix));
        let b = change("", &format!("{}tail two", prefix));
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_signature_differs_within_prefix() {
        let a = change("", "let a = 1;");
        let b = change("", "let b = 1;");
        assert_ne!(a.signature(), b.signature());
    }
}
