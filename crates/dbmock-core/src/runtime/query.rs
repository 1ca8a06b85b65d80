// crates/dbmock-core/src/runtime/query.rs
// ============================================================================
// Module: dbmock SQL Matchers
// Description: Regular-expression and exact-equality SQL matching strategies.
// Purpose: Decide whether executed SQL satisfies declared SQL.
// Dependencies: crate::core, crate::interfaces, regex
// ============================================================================

//! ## Overview
//! Both matchers normalize their inputs again before comparing, so custom
//! callers may pass raw SQL. The regular-expression matcher searches rather
//! than anchors: `SELECT` matches `SELECT * FROM users`. Compiled patterns
//! are cached per matcher, keyed by the normalized declared SQL.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use regex::Regex;

use crate::core::normalize_sql;
use crate::interfaces::QueryMatcher;
use crate::interfaces::QueryMismatch;

// ============================================================================
// SECTION: Matchers
// ============================================================================

/// Treats declared SQL as a regular expression searched in the actual SQL.
#[derive(Debug, Default)]
pub struct RegexpQueryMatcher {
    /// Compiled patterns by normalized declared SQL.
    compiled: Mutex<HashMap<String, Regex>>,
}

impl RegexpQueryMatcher {
    /// Creates a matcher with an empty pattern cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled pattern for `expected`, compiling it once.
    fn pattern(&self, expected: &str) -> Result<Regex, QueryMismatch> {
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pattern) = compiled.get(expected) {
            return Ok(pattern.clone());
        }
        let pattern = Regex::new(expected).map_err(|err| QueryMismatch::InvalidPattern {
            expected: expected.to_string(),
            reason: err.to_string(),
        })?;
        compiled.insert(expected.to_string(), pattern.clone());
        Ok(pattern)
    }
}

impl QueryMatcher for RegexpQueryMatcher {
    fn matches(&self, expected: &str, actual: &str) -> Result<(), QueryMismatch> {
        let expected = normalize_sql(expected);
        let actual = normalize_sql(actual);
        let pattern = self.pattern(&expected)?;
        if pattern.is_match(&actual) {
            Ok(())
        } else {
            Err(QueryMismatch::Pattern {
                expected,
                actual,
            })
        }
    }
}

/// Requires normalized actual SQL to equal normalized declared SQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualQueryMatcher;

impl QueryMatcher for EqualQueryMatcher {
    fn matches(&self, expected: &str, actual: &str) -> Result<(), QueryMismatch> {
        let expected = normalize_sql(expected);
        let actual = normalize_sql(actual);
        if expected == actual {
            Ok(())
        } else {
            Err(QueryMismatch::NotEqual {
                expected,
                actual,
            })
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test assertions use unwrap for clarity.")]

    use super::EqualQueryMatcher;
    use super::RegexpQueryMatcher;
    use crate::interfaces::QueryMatcher;
    use crate::interfaces::QueryMismatch;

    #[test]
    fn regexp_searches_within_actual_sql() {
        let matcher = RegexpQueryMatcher::new();
        assert!(matcher.matches("SELECT (.+) FROM users", "SELECT id FROM users").is_ok());
        assert!(matcher.matches("users", "SELECT id\n  FROM users").is_ok());
        assert!(matches!(
            matcher.matches("orders", "SELECT id FROM users"),
            Err(QueryMismatch::Pattern { .. })
        ));
    }

    #[test]
    fn regexp_reports_invalid_patterns() {
        assert!(matches!(
            RegexpQueryMatcher::new().matches("SELECT (", "SELECT ("),
            Err(QueryMismatch::InvalidPattern { .. })
        ));
    }

    #[test]
    fn regexp_compiles_each_pattern_once() {
        let matcher = RegexpQueryMatcher::new();
        for id in 0 .. 3 {
            let actual = format!("SELECT name FROM users WHERE id = {id}");
            assert!(matcher.matches("SELECT (.+) FROM users", &actual).is_ok());
            assert!(matcher.matches("FROM\n  orders", &actual).is_err());
        }
        assert!(matcher.matches("SELECT (", "SELECT (").is_err());
        let compiled = matcher.compiled.lock().unwrap();
        assert_eq!(compiled.len(), 2);
        assert!(compiled.contains_key("FROM orders"));
    }

    #[test]
    fn equal_ignores_layout_whitespace_only() {
        assert!(EqualQueryMatcher.matches("SELECT * FROM t", "SELECT *\n   FROM t").is_ok());
        assert!(EqualQueryMatcher.matches("SELECT (.+) FROM t", "SELECT * FROM t").is_err());
    }
}
