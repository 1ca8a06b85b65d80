// crates/dbmock-core/src/runtime/engine.rs
// ============================================================================
// Module: dbmock Expectation Engine
// Description: Ordered and unordered selection of expectations for incoming calls.
// Purpose: Match each intercepted call to exactly one declared expectation.
// Dependencies: crate::core, crate::interfaces, crate::runtime::{comparator, expectation}
// ============================================================================

//! ## Overview
//! The queue holds expectations in declaration order. Selection walks a
//! snapshot of that list and locks one expectation at a time, so concurrent
//! callers contend only on the expectation they are inspecting and no
//! expectation can be consumed twice.
//!
//! In ordered mode the first untriggered expectation must accept the call or
//! the call fails. In unordered mode the first untriggered expectation that
//! accepts the call wins. A failed match never consumes anything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::core::ExecResult;
use crate::core::ExpectationKind;
use crate::core::NamedValue;
use crate::core::args::format_params;
use crate::core::normalize_sql;
use crate::interfaces::QueryMatcher;
use crate::interfaces::ValueConverter;
use crate::runtime::comparator::match_arguments;
use crate::runtime::error::DriverError;
use crate::runtime::expectation::Expectation;
use crate::runtime::expectation::ExpectationState;
use crate::runtime::expectation::Payload;
use crate::runtime::rows::Rows;

// ============================================================================
// SECTION: Calls
// ============================================================================

/// One intercepted driver call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Call<'a> {
    /// Operation kind.
    pub(crate) kind: ExpectationKind,
    /// Normalized SQL for SQL-carrying kinds.
    pub(crate) sql: Option<&'a str>,
    /// Converted actual arguments.
    pub(crate) args: &'a [NamedValue],
}

impl Call<'_> {
    /// Renders the call for diagnostics.
    pub(crate) fn describe(&self) -> String {
        let sql = self.sql.unwrap_or_default();
        match self.kind {
            ExpectationKind::Begin => "database transaction Begin".to_string(),
            ExpectationKind::Commit => "Commit transaction".to_string(),
            ExpectationKind::Rollback => "Rollback transaction".to_string(),
            ExpectationKind::Close => "database Close".to_string(),
            ExpectationKind::Ping => "database Ping".to_string(),
            ExpectationKind::Prepare => format!("Prepare statement with query '{sql}'"),
            ExpectationKind::Query => {
                format!("Query '{sql}' with args {}", format_params(self.args))
            }
            ExpectationKind::Exec => {
                format!("ExecQuery '{sql}' with args {}", format_params(self.args))
            }
        }
    }
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Success payload of a matched call.
#[derive(Debug)]
pub(crate) enum Granted {
    /// Operation without a payload.
    Done,
    /// Row batches for a query.
    Rows(Vec<Rows>),
    /// Result for an exec.
    Result(ExecResult),
}

/// A matched and triggered expectation with the response it prescribes.
#[derive(Debug)]
pub(crate) struct Selection {
    /// The triggered expectation.
    pub(crate) expectation: Arc<Expectation>,
    /// Delay to apply before responding.
    pub(crate) delay: Duration,
    /// Payload, programmed error, or missing-return diagnostic.
    pub(crate) outcome: Result<Granted, DriverError>,
}

// ============================================================================
// SECTION: Expectation Queue
// ============================================================================

/// Declared expectations of one mock and the policy used to match them.
pub(crate) struct ExpectationQueue {
    /// Expectations in declaration order; append-only.
    expectations: RwLock<Vec<Arc<Expectation>>>,
    /// Whether calls must follow declaration order.
    ordered: AtomicBool,
    /// SQL matching strategy.
    query_matcher: Arc<dyn QueryMatcher>,
    /// Converter applied to declared literal arguments.
    converter: Arc<dyn ValueConverter>,
}

impl ExpectationQueue {
    /// Creates an empty queue.
    pub(crate) fn new(
        ordered: bool,
        query_matcher: Arc<dyn QueryMatcher>,
        converter: Arc<dyn ValueConverter>,
    ) -> Self {
        Self {
            expectations: RwLock::new(Vec::new()),
            ordered: AtomicBool::new(ordered),
            query_matcher,
            converter,
        }
    }

    /// Switches between ordered and unordered matching.
    pub(crate) fn set_ordered(&self, ordered: bool) {
        self.ordered.store(ordered, Ordering::SeqCst);
    }

    /// Returns true in ordered mode.
    pub(crate) fn is_ordered(&self) -> bool {
        self.ordered.load(Ordering::SeqCst)
    }

    /// Appends an expectation and returns it.
    pub(crate) fn push(&self, sql: Option<&str>, payload: Payload) -> Arc<Expectation> {
        let mut expectations = self.expectations.write().unwrap_or_else(PoisonError::into_inner);
        let expectation =
            Arc::new(Expectation::new(expectations.len(), sql.map(normalize_sql), payload));
        expectations.push(Arc::clone(&expectation));
        expectation
    }

    /// Returns the expectations declared so far.
    fn snapshot(&self) -> Vec<Arc<Expectation>> {
        self.expectations.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the number of declared expectations.
    pub(crate) fn len(&self) -> usize {
        self.expectations.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Selects and triggers the expectation for `call`.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic when no expectation accepts the call; nothing is
    /// triggered in that case.
    pub(crate) fn select(&self, call: &Call<'_>) -> Result<Selection, DriverError> {
        let expectations = self.snapshot();
        let ordered = self.is_ordered();
        let mut fulfilled = 0;
        for expectation in &expectations {
            let mut state = expectation.lock();
            if state.triggered {
                fulfilled += 1;
                continue;
            }
            if ordered {
                if state.payload.kind() != call.kind {
                    return Err(DriverError::OutOfOrder {
                        call: call.describe(),
                        next: state.describe(),
                    });
                }
                self.accepts(&state, call)?;
                return Ok(trigger(expectation, &mut state, call));
            }
            if state.payload.kind() == call.kind && self.accepts(&state, call).is_ok() {
                return Ok(trigger(expectation, &mut state, call));
            }
        }
        Err(DriverError::UnexpectedCall {
            call: call.describe(),
            all_fulfilled: fulfilled == expectations.len(),
        })
    }

    /// Checks SQL and arguments of `call` against one expectation.
    fn accepts(&self, state: &ExpectationState, call: &Call<'_>) -> Result<(), DriverError> {
        if let (Some(expected), Some(actual)) = (state.sql.as_deref(), call.sql) {
            self.query_matcher.matches(expected, actual).map_err(|reason| {
                DriverError::SqlMismatch {
                    call: call.describe(),
                    reason,
                }
            })?;
        }
        match_arguments(&state.args, call.args, self.converter.as_ref()).map_err(|reason| {
            DriverError::ArgumentMismatch {
                call: call.describe(),
                reason,
            }
        })
    }

    /// Checks that every expectation was triggered and closed where required.
    ///
    /// # Errors
    ///
    /// Returns the first unmet or unclosed expectation in declaration order.
    pub(crate) fn verify(&self) -> Result<(), (usize, DriverError)> {
        for expectation in self.snapshot() {
            let state = expectation.lock();
            if !state.triggered {
                return Err((expectation.index(), DriverError::Unmet(state.describe())));
            }
            if let Some(subject) = state.unclosed_subject() {
                return Err((
                    expectation.index(),
                    DriverError::NotClosed {
                        subject,
                        expectation: state.describe(),
                    },
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ExpectationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectationQueue")
            .field("len", &self.len())
            .field("ordered", &self.is_ordered())
            .finish_non_exhaustive()
    }
}

/// Marks the expectation triggered and resolves its response.
fn trigger(
    expectation: &Arc<Expectation>,
    state: &mut ExpectationState,
    call: &Call<'_>,
) -> Selection {
    state.triggered = true;
    let outcome = if let Some(error) = &state.error {
        Err(DriverError::Programmed(error.clone()))
    } else {
        match &state.payload {
            Payload::Query {
                batches,
                ..
            } if !batches.is_empty() => Ok(Granted::Rows(batches.clone())),
            Payload::Exec {
                result: Some(result),
            } => Ok(Granted::Result(result.clone())),
            Payload::Query {
                ..
            }
            | Payload::Exec {
                ..
            } => Err(DriverError::MissingReturn {
                call: call.describe(),
                expectation: state.describe(),
            }),
            _ => Ok(Granted::Done),
        }
    };
    Selection {
        expectation: Arc::clone(expectation),
        delay: state.delay,
        outcome,
    }
}
