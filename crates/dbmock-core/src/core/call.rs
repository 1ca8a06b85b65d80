// crates/dbmock-core/src/core/call.rs
// ============================================================================
// Module: dbmock Call Kinds
// Description: The driver operations an expectation can stand for.
// Purpose: Tag expectations and events with the operation they cover.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Each driver operation the mock intercepts has one [`ExpectationKind`].
//! Only `Prepare`, `Query` and `Exec` carry SQL.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

// ============================================================================
// SECTION: Expectation Kind
// ============================================================================

/// Driver operation covered by an expectation.
///
/// # Invariants
/// - Labels returned by [`ExpectationKind::as_str`] are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectationKind {
    /// Transaction start.
    Begin,
    /// Transaction commit.
    Commit,
    /// Transaction rollback.
    Rollback,
    /// Statement preparation.
    Prepare,
    /// Row-returning statement.
    Query,
    /// Data-modifying statement.
    Exec,
    /// Connection close.
    Close,
    /// Connection liveness probe.
    Ping,
}

impl ExpectationKind {
    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
            Self::Prepare => "prepare",
            Self::Query => "query",
            Self::Exec => "exec",
            Self::Close => "close",
            Self::Ping => "ping",
        }
    }

    /// Returns true for kinds that carry SQL text.
    #[must_use]
    pub const fn has_sql(self) -> bool {
        matches!(self, Self::Prepare | Self::Query | Self::Exec)
    }
}

impl fmt::Display for ExpectationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
