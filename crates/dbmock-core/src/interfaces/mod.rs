// crates/dbmock-core/src/interfaces/mod.rs
// ============================================================================
// Module: dbmock Interfaces
// Description: Pluggable seams for argument matching, SQL matching, conversion, and events.
// Purpose: Define the contract surfaces the expectation engine calls into.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The engine never hard-codes how SQL is compared, how values are
//! canonicalized, or where activity is reported. Each of those is a trait here
//! with a default implementation in [`crate::runtime`]. Implementations must
//! be shareable across threads because one mock serves concurrent callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;

use crate::core::MockEvent;
use crate::core::Value;

// ============================================================================
// SECTION: Argument Matcher
// ============================================================================

/// Custom predicate used in place of a literal expected argument.
pub trait ArgumentMatcher: Send + Sync + fmt::Debug {
    /// Returns true when the actual value is acceptable.
    fn matches(&self, value: &Value) -> bool;

    /// Returns a short label used in expectation descriptions.
    fn describe(&self) -> String {
        "custom argument matcher".to_string()
    }
}

// ============================================================================
// SECTION: Query Matcher
// ============================================================================

/// Reason a SQL matcher rejected the actual SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryMismatch {
    /// The actual SQL does not satisfy the expected pattern.
    #[error("could not match actual sql: \"{actual}\" with expected regexp \"{expected}\"")]
    Pattern {
        /// Expected pattern.
        expected: String,
        /// Actual SQL.
        actual: String,
    },
    /// The expected pattern is not a valid regular expression.
    #[error("could not compile expected sql \"{expected}\" as a regexp: {reason}")]
    InvalidPattern {
        /// Expected pattern.
        expected: String,
        /// Compiler diagnostic.
        reason: String,
    },
    /// The actual SQL is not equal to the expected SQL.
    #[error("actual sql: \"{actual}\" does not equal to expected \"{expected}\"")]
    NotEqual {
        /// Expected SQL.
        expected: String,
        /// Actual SQL.
        actual: String,
    },
}

/// Strategy deciding whether actual SQL satisfies the declared SQL.
pub trait QueryMatcher: Send + Sync + fmt::Debug {
    /// Compares normalized expected SQL with normalized actual SQL.
    ///
    /// # Errors
    ///
    /// Returns [`QueryMismatch`] describing why the SQL does not match.
    fn matches(&self, expected: &str, actual: &str) -> Result<(), QueryMismatch>;
}

// ============================================================================
// SECTION: Value Converter
// ============================================================================

/// Conversion failures for values outside the canonical driver kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Unsigned value does not fit the signed integer kind.
    #[error("uint64 values with high bit set are not supported: {0}")]
    UintOverflow(u64),
    /// Value kind or custom type has no driver representation.
    #[error("unsupported type {0}")]
    Unsupported(String),
}

/// Canonicalizes caller values into driver values.
pub trait ValueConverter: Send + Sync + fmt::Debug {
    /// Converts one value.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] when the value has no driver representation.
    fn convert(&self, value: Value) -> Result<Value, ConversionError>;
}

// ============================================================================
// SECTION: Event Sink
// ============================================================================

/// Destination for mock activity events.
pub trait EventSink: Send + Sync {
    /// Records one event; sinks never fail the call being recorded.
    fn record(&self, event: &MockEvent);
}
