// crates/dbmock-core/src/core/event.rs
// ============================================================================
// Module: dbmock Events
// Description: Structured records of intercepted calls and verification.
// Purpose: Give event sinks a serializable view of mock activity.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`MockEvent`] is emitted for every intercepted call and every
//! verification pass. Events carry the normalized SQL but never argument
//! values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::call::ExpectationKind;

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Outcome label of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// A call matched an expectation and succeeded.
    Matched,
    /// A call matched an expectation that returned its programmed error.
    ProgrammedError,
    /// A call matched no expectation.
    Unexpected,
    /// A matched call was interrupted by its context.
    Cancelled,
    /// Verification found every expectation satisfied.
    Verified,
    /// Verification found an unsatisfied expectation.
    Unmet,
    /// Declaration-time notice, such as a ping expectation with monitoring off.
    Warning,
}

impl EventOutcome {
    /// Returns the stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::ProgrammedError => "programmed_error",
            Self::Unexpected => "unexpected",
            Self::Cancelled => "cancelled",
            Self::Verified => "verified",
            Self::Unmet => "unmet",
            Self::Warning => "warning",
        }
    }
}

// ============================================================================
// SECTION: Event
// ============================================================================

/// Mock activity record.
#[derive(Debug, Clone, Serialize)]
pub struct MockEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Identifier of the mock instance.
    pub mock_id: String,
    /// Operation involved, absent for verification events.
    pub call: Option<ExpectationKind>,
    /// Normalized SQL when the operation carries SQL.
    pub sql: Option<String>,
    /// Event outcome.
    pub outcome: EventOutcome,
    /// Declaration index of the expectation involved.
    pub expectation: Option<usize>,
    /// Diagnostic message for failures.
    pub message: Option<String>,
}

/// Inputs required to construct a mock event.
pub struct MockEventParams {
    /// Event identifier.
    pub event: &'static str,
    /// Identifier of the mock instance.
    pub mock_id: String,
    /// Operation involved.
    pub call: Option<ExpectationKind>,
    /// Normalized SQL.
    pub sql: Option<String>,
    /// Event outcome.
    pub outcome: EventOutcome,
    /// Declaration index of the expectation involved.
    pub expectation: Option<usize>,
    /// Diagnostic message.
    pub message: Option<String>,
}

impl MockEvent {
    /// Creates a new event with a consistent timestamp.
    #[must_use]
    pub fn new(params: MockEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: params.event,
            timestamp_ms,
            mock_id: params.mock_id,
            call: params.call,
            sql: params.sql,
            outcome: params.outcome,
            expectation: params.expectation,
            message: params.message,
        }
    }
}
