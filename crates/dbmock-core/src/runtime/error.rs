// crates/dbmock-core/src/runtime/error.rs
// ============================================================================
// Module: dbmock Driver Errors
// Description: Every failure the mock driver can hand back to code under test.
// Purpose: Separate programmed failures from mock diagnostics in one error type.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! [`DriverError::Programmed`] carries a test-declared error verbatim; every
//! other variant is a diagnostic produced by the mock itself. Diagnostics name
//! the offending call and, where one exists, the expectation it was checked
//! against.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ProgrammedError;
use crate::interfaces::ConversionError;
use crate::interfaces::QueryMismatch;
use crate::runtime::comparator::ArgumentMismatch;
use crate::runtime::registry::RegistryError;

// ============================================================================
// SECTION: Driver Error
// ============================================================================

/// Failure returned by a mock driver operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Error declared by the test.
    #[error(transparent)]
    Programmed(#[from] ProgrammedError),
    /// The caller's context was cancelled during the declared delay.
    #[error("canceling query due to user request")]
    Cancelled,
    /// The caller's context deadline passed during the declared delay.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    /// No pending expectation accepts the call.
    #[error("{}call to {call} was not expected", fulfilled_prefix(.all_fulfilled))]
    UnexpectedCall {
        /// Description of the call.
        call: String,
        /// Whether every expectation had already been consumed.
        all_fulfilled: bool,
    },
    /// In ordered mode, the next pending expectation is for another operation.
    #[error("call to {call}, was not expected, next expectation is: {next}")]
    OutOfOrder {
        /// Description of the call.
        call: String,
        /// Description of the next pending expectation.
        next: String,
    },
    /// In ordered mode, the next pending expectation rejects the SQL.
    #[error("{call}: {reason}")]
    SqlMismatch {
        /// Description of the call.
        call: String,
        /// Matcher diagnostic.
        reason: QueryMismatch,
    },
    /// In ordered mode, the next pending expectation rejects the arguments.
    #[error("{call}, arguments do not match: {reason}")]
    ArgumentMismatch {
        /// Description of the call.
        call: String,
        /// Argument diagnostic.
        reason: ArgumentMismatch,
    },
    /// The matched expectation declared neither a payload nor an error.
    #[error("{call} must return a value, but the expectation declared none: {expectation}")]
    MissingReturn {
        /// Description of the call.
        call: String,
        /// Description of the matched expectation.
        expectation: String,
    },
    /// An actual argument could not be converted.
    #[error("argument {ordinal} could not be converted: {reason}")]
    Conversion {
        /// One-based ordinal of the argument.
        ordinal: usize,
        /// Converter diagnostic.
        reason: ConversionError,
    },
    /// An expectation was never matched.
    #[error("there is a remaining expectation which was not matched: {0}")]
    Unmet(String),
    /// A statement or row set that had to be closed was not.
    #[error("expected {subject} to be closed, but it was not: {expectation}")]
    NotClosed {
        /// What should have been closed.
        subject: &'static str,
        /// Description of the expectation.
        expectation: String,
    },
    /// The row set was used after close.
    #[error("rows are closed")]
    RowsClosed,
    /// The statement was used after close.
    #[error("statement is closed")]
    StatementClosed,
    /// Registry failure while opening or closing a connection.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Returns the prefix used when every expectation was already consumed.
const fn fulfilled_prefix(all_fulfilled: &bool) -> &'static str {
    if *all_fulfilled { "all expectations were already fulfilled, " } else { "" }
}

impl DriverError {
    /// Returns the programmed error when this is one.
    #[must_use]
    pub const fn as_programmed(&self) -> Option<&ProgrammedError> {
        match self {
            Self::Programmed(error) => Some(error),
            _ => None,
        }
    }

    /// Returns true for context cancellation or deadline expiry.
    #[must_use]
    pub const fn is_context_error(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}
