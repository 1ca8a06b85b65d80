// crates/dbmock-core/src/core/error.rs
// ============================================================================
// Module: dbmock Programmed Errors
// Description: Errors declared by tests and returned verbatim by the mock.
// Purpose: Keep test-declared failures distinct from mock diagnostics.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A [`ProgrammedError`] is whatever failure a test tells the mock to produce.
//! The mock hands it back unchanged so callers can compare it by equality.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Programmed Error
// ============================================================================

/// Error declared on an expectation, row set, or result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("{message}")]
pub struct ProgrammedError {
    /// Error message.
    message: String,
}

impl ProgrammedError {
    /// Creates a programmed error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for ProgrammedError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ProgrammedError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
