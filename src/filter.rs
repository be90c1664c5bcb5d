//! Post-diff suppression of known-benign recurring changes.
//!
//! Some churn is constant and meaningless for drift reporting: antivirus
//! definition packages reinstall themselves several times a day and would
//! otherwise dominate every cycle's change list. The filter holds an
//! ordered rule list of (category, lowercase glob pattern) seeded with
//! built-in defaults plus rules parsed from a comma-separated
//! `category:pattern` configuration string, and is applied once after all
//! per-category diffs are concatenated.

use crate::diff::normalize;
use crate::model::{Category, ChangeRecord};

/// A single suppression rule. The pattern is stored lowercase and matched
/// against the lowercased, trimmed record subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseRule {
    pub category: Category,
    pub pattern: String,
}

/// Ordered suppression rule list.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    rules: Vec<NoiseRule>,
}

impl NoiseFilter {
    /// Built-in defaults: recurring antivirus-definition "software update"
    /// churn.
    pub fn with_defaults() -> Self {
        Self {
            rules: vec![
                NoiseRule {
                    category: Category::Software,
                    pattern: "security intelligence update*".to_string(),
                },
                NoiseRule {
                    category: Category::Software,
                    pattern: "definition update for microsoft defender*".to_string(),
                },
            ],
        }
    }

    /// Defaults plus rules parsed from a `category:pattern` list.
    pub fn with_rules(raw: &str) -> Self {
        let mut filter = Self::with_defaults();
        filter.rules.extend(parse_rules(raw));
        filter
    }

    /// Drops every record matched by a rule; non-matching records pass
    /// through unchanged.
    pub fn apply(&self, changes: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
        if changes.is_empty() || self.rules.is_empty() {
            return changes;
        }
        changes
            .into_iter()
            .filter(|change| !self.suppresses(change))
            .collect()
    }

    fn suppresses(&self, change: &ChangeRecord) -> bool {
        let subject = normalize(&change.subject);
        if subject.is_empty() {
            return false;
        }
        self.rules.iter().any(|rule| {
            rule.category == change.category && pattern_matches(&rule.pattern, &subject)
        })
    }
}

/// Simple glob matching (supports `*` as wildcard); a pattern without `*`
/// must match exactly.
fn pattern_matches(pattern: &str, subject: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == subject;
    }

    let mut remaining = subject;

    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    let last = parts[parts.len() - 1];
    if !last.is_empty() {
        if !remaining.ends_with(last) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last.len()];
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }

    true
}

/// Parses a comma-separated `category:pattern` rule list. Malformed tokens,
/// unknown categories, and empty patterns are skipped silently.
pub fn parse_rules(raw: &str) -> Vec<NoiseRule> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut rules = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let Some((category, pattern)) = token.split_once(':') else {
            continue;
        };
        let Ok(category) = category.trim().parse::<Category>() else {
            continue;
        };
        let pattern = normalize(pattern);
        if pattern.is_empty() {
            continue;
        }
        rules.push(NoiseRule { category, pattern });
    }
    rules
}
