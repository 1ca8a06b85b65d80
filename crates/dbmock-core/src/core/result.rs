// crates/dbmock-core/src/core/result.rs
// ============================================================================
// Module: dbmock Exec Results
// Description: Fabricated result of a data-modifying statement.
// Purpose: Report last insert id and affected rows, or a programmed failure.
// Dependencies: crate::core::error
// ============================================================================

//! ## Overview
//! [`ExecResult`] mirrors what a driver returns from an exec call. A result
//! built with [`ExecResult::error`] fails both accessors with the same error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::core::error::ProgrammedError;

// ============================================================================
// SECTION: Exec Result
// ============================================================================

/// Outcome of an exec statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Identifier of the last inserted row.
    last_insert_id: i64,
    /// Number of rows affected.
    rows_affected: i64,
    /// Error returned by both accessors when set.
    error: Option<ProgrammedError>,
}

impl ExecResult {
    /// Creates a successful result.
    #[must_use]
    pub const fn new(last_insert_id: i64, rows_affected: i64) -> Self {
        Self {
            last_insert_id,
            rows_affected,
            error: None,
        }
    }

    /// Creates a result whose accessors fail with `error`.
    #[must_use]
    pub fn error(error: impl Into<ProgrammedError>) -> Self {
        Self {
            last_insert_id: 0,
            rows_affected: 0,
            error: Some(error.into()),
        }
    }

    /// Returns the identifier of the last inserted row.
    ///
    /// # Errors
    ///
    /// Returns the programmed error when the result was built with one.
    pub fn last_insert_id(&self) -> Result<i64, ProgrammedError> {
        self.error.clone().map_or(Ok(self.last_insert_id), Err)
    }

    /// Returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns the programmed error when the result was built with one.
    pub fn rows_affected(&self) -> Result<i64, ProgrammedError> {
        self.error.clone().map_or(Ok(self.rows_affected), Err)
    }
}

impl fmt::Display for ExecResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "Result error: {error}"),
            None => write!(
                f,
                "LastInsertId: {}, RowsAffected: {}",
                self.last_insert_id, self.rows_affected
            ),
        }
    }
}
