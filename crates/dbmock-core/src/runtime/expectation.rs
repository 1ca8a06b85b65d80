// crates/dbmock-core/src/runtime/expectation.rs
// ============================================================================
// Module: dbmock Expectations
// Description: Declared expectations and the chainable handles that configure them.
// Purpose: Hold per-expectation state behind its own lock for concurrent matching.
// Dependencies: crate::core, crate::runtime::{comparator, rows, error}
// ============================================================================

//! ## Overview
//! An [`Expectation`] is one declared driver call. Its kind is fixed by its
//! [`Payload`] variant, and its mutable state (arguments, return values,
//! trigger and close flags) sits behind a per-expectation mutex so a matcher
//! can check and mark it atomically.
//!
//! Handles such as [`ExpectedQuery`] are returned to the test at declaration
//! time. They share the expectation with the queue, so configuration chained
//! after declaration is visible to later matching.
//!
//! # Invariants
//! - An expectation is triggered at most once and never reset.
//! - The payload variant never changes after creation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use crate::core::ExecResult;
use crate::core::ExpectationKind;
use crate::core::NamedValue;
use crate::core::ProgrammedError;
use crate::runtime::comparator;
use crate::runtime::comparator::ArgsSpec;
use crate::runtime::comparator::ExpectedArg;
use crate::runtime::engine::ExpectationQueue;
use crate::runtime::error::DriverError;
use crate::runtime::rows::Rows;
use crate::runtime::rows::describe_batches;

// ============================================================================
// SECTION: Payload
// ============================================================================

/// Kind-specific data of an expectation.
#[derive(Debug, Clone)]
pub(crate) enum Payload {
    /// Transaction start.
    Begin,
    /// Transaction commit.
    Commit,
    /// Transaction rollback.
    Rollback,
    /// Connection close.
    Close,
    /// Liveness probe.
    Ping,
    /// Statement preparation.
    Prepare {
        /// Error returned when the prepared statement is closed.
        close_error: Option<ProgrammedError>,
        /// Whether verification requires the statement to be closed.
        must_be_closed: bool,
    },
    /// Row-returning statement.
    Query {
        /// Batches returned on success.
        batches: Vec<Rows>,
        /// Whether verification requires the row set to be closed.
        rows_must_be_closed: bool,
    },
    /// Data-modifying statement.
    Exec {
        /// Result returned on success.
        result: Option<ExecResult>,
    },
}

impl Payload {
    /// Returns an empty payload for `kind`.
    pub(crate) const fn empty(kind: ExpectationKind) -> Self {
        match kind {
            ExpectationKind::Begin => Self::Begin,
            ExpectationKind::Commit => Self::Commit,
            ExpectationKind::Rollback => Self::Rollback,
            ExpectationKind::Close => Self::Close,
            ExpectationKind::Ping => Self::Ping,
            ExpectationKind::Prepare => Self::Prepare {
                close_error: None,
                must_be_closed: false,
            },
            ExpectationKind::Query => Self::Query {
                batches: Vec::new(),
                rows_must_be_closed: false,
            },
            ExpectationKind::Exec => Self::Exec {
                result: None,
            },
        }
    }

    /// Returns the kind this payload stands for.
    pub(crate) const fn kind(&self) -> ExpectationKind {
        match self {
            Self::Begin => ExpectationKind::Begin,
            Self::Commit => ExpectationKind::Commit,
            Self::Rollback => ExpectationKind::Rollback,
            Self::Close => ExpectationKind::Close,
            Self::Ping => ExpectationKind::Ping,
            Self::Prepare {
                ..
            } => ExpectationKind::Prepare,
            Self::Query {
                ..
            } => ExpectationKind::Query,
            Self::Exec {
                ..
            } => ExpectationKind::Exec,
        }
    }
}

// ============================================================================
// SECTION: Expectation State
// ============================================================================

/// Mutable state of an expectation.
#[derive(Debug)]
pub(crate) struct ExpectationState {
    /// Normalized declared SQL for SQL-carrying kinds.
    pub(crate) sql: Option<String>,
    /// Argument constraint.
    pub(crate) args: ArgsSpec,
    /// Kind-specific data.
    pub(crate) payload: Payload,
    /// Programmed error returned instead of the payload.
    pub(crate) error: Option<ProgrammedError>,
    /// Delay applied after matching.
    pub(crate) delay: Duration,
    /// Whether a call consumed this expectation.
    pub(crate) triggered: bool,
    /// Whether the statement or row set produced by this expectation was closed.
    pub(crate) closed: bool,
}

impl ExpectationState {
    /// Returns what still has to be closed, if anything.
    pub(crate) const fn unclosed_subject(&self) -> Option<&'static str> {
        if self.closed {
            return None;
        }
        match self.payload {
            Payload::Prepare {
                must_be_closed: true,
                ..
            } => Some("prepared statement"),
            Payload::Query {
                rows_must_be_closed: true,
                ..
            } => Some("rows"),
            _ => None,
        }
    }

    /// Renders the human-readable description of the expectation.
    pub(crate) fn describe(&self) -> String {
        let sql = self.sql.as_deref().unwrap_or_default();
        let mut out = match &self.payload {
            Payload::Begin => "ExpectedBegin => expecting database transaction Begin".to_string(),
            Payload::Commit => "ExpectedCommit => expecting transaction Commit".to_string(),
            Payload::Rollback => "ExpectedRollback => expecting transaction Rollback".to_string(),
            Payload::Close => "ExpectedClose => expecting database Close".to_string(),
            Payload::Ping => "ExpectedPing => expecting database Ping".to_string(),
            Payload::Prepare {
                close_error,
                ..
            } => {
                let mut out = format!(
                    "ExpectedPrepare => expecting Prepare statement which:\n  - matches sql: '{sql}'"
                );
                if let Some(error) = close_error {
                    out.push_str(&format!("\n  - should return error on Close: {error}"));
                }
                out
            }
            Payload::Query {
                batches,
                ..
            } => {
                let mut out = format!(
                    "ExpectedQuery => expecting Query or QueryRow which:\n  - matches sql: '{sql}'\n{}",
                    describe_args(&self.args)
                );
                if !batches.is_empty() {
                    out.push_str(&format!("\n  - {}", describe_batches(batches)));
                }
                out
            }
            Payload::Exec {
                result,
            } => {
                let mut out = format!(
                    "ExpectedExec => expecting Exec or ExecContext which:\n  - matches sql: '{sql}'\n{}",
                    describe_args(&self.args)
                );
                if let Some(result) = result {
                    out.push_str(&format!("\n  - should return Result having:\n      {result}"));
                }
                out
            }
        };
        if let Some(error) = &self.error {
            if self.payload.kind().has_sql() {
                out.push_str(&format!("\n  - should return error: {error}"));
            } else {
                out.push_str(&format!(", which should return error: {error}"));
            }
        }
        out
    }
}

/// Describes an argument constraint.
fn describe_args(args: &ArgsSpec) -> String {
    match args {
        ArgsSpec::Any => "  - is with any arguments".to_string(),
        ArgsSpec::Empty => "  - is without arguments".to_string(),
        ArgsSpec::List(list) if list.is_empty() => "  - is without arguments".to_string(),
        ArgsSpec::List(list) => {
            let mut out = String::from("  - is with arguments:");
            for (index, arg) in list.iter().enumerate() {
                out.push_str(&format!("\n    {index} - {arg}"));
            }
            out
        }
        ArgsSpec::Check(_) => "  - is with arguments accepted by a custom check".to_string(),
    }
}

// ============================================================================
// SECTION: Expectation
// ============================================================================

/// One declared driver call.
pub(crate) struct Expectation {
    /// Declaration index within the mock.
    index: usize,
    /// State guarded for atomic check-and-mark.
    state: Mutex<ExpectationState>,
}

impl Expectation {
    /// Creates an untriggered expectation.
    pub(crate) const fn new(index: usize, sql: Option<String>, payload: Payload) -> Self {
        Self {
            index,
            state: Mutex::new(ExpectationState {
                sql,
                args: ArgsSpec::Any,
                payload,
                error: None,
                delay: Duration::ZERO,
                triggered: false,
                closed: false,
            }),
        }
    }

    /// Locks the state; a poisoned lock still yields the state.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ExpectationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the declaration index.
    pub(crate) const fn index(&self) -> usize {
        self.index
    }

    /// Returns the kind.
    pub(crate) fn kind(&self) -> ExpectationKind {
        self.lock().payload.kind()
    }

    /// Returns true once a call consumed the expectation.
    pub(crate) fn is_triggered(&self) -> bool {
        self.lock().triggered
    }

    /// Records that the produced statement or row set was closed.
    pub(crate) fn mark_closed(&self) {
        self.lock().closed = true;
    }

    /// Records a statement close and returns its programmed close error.
    pub(crate) fn close_statement(&self) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.closed = true;
        match &state.payload {
            Payload::Prepare {
                close_error: Some(error),
                ..
            } => Err(DriverError::Programmed(error.clone())),
            _ => Ok(()),
        }
    }

    /// Stores declared returned values in the call's output parameters.
    pub(crate) fn write_outputs(&self, args: &[NamedValue]) {
        comparator::write_outputs(&self.lock().args, args);
    }

    /// Returns the human-readable description.
    pub(crate) fn describe(&self) -> String {
        self.lock().describe()
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("index", &self.index)
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Declaration Handles
// ============================================================================

/// Implements the configuration shared by every declaration handle.
macro_rules! expectation_handle {
    ($($handle:ident),*) => {
        $(
            impl $handle {
                /// Makes the matched call fail with `error` instead of succeeding.
                pub fn will_return_error(self, error: impl Into<ProgrammedError>) -> Self {
                    self.expectation.lock().error = Some(error.into());
                    self
                }

                /// Delays the matched call's response by `delay`.
                pub fn will_delay_for(self, delay: Duration) -> Self {
                    self.expectation.lock().delay = delay;
                    self
                }

                /// Returns true once a call consumed the expectation.
                #[must_use]
                pub fn was_triggered(&self) -> bool {
                    self.expectation.is_triggered()
                }

                /// Returns the operation kind.
                #[must_use]
                pub fn kind(&self) -> ExpectationKind {
                    self.expectation.kind()
                }

                /// Returns the declaration index.
                #[must_use]
                pub fn index(&self) -> usize {
                    self.expectation.index()
                }
            }

            impl fmt::Display for $handle {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.expectation.describe())
                }
            }
        )*
    };
}

/// Implements argument configuration for SQL-carrying handles.
macro_rules! argument_handle {
    ($($handle:ident),*) => {
        $(
            impl $handle {
                /// Requires the actual arguments to match `args` position by position.
                pub fn with_args(self, args: Vec<ExpectedArg>) -> Self {
                    self.expectation.lock().args = ArgsSpec::List(args);
                    self
                }

                /// Requires the call to carry no arguments.
                pub fn without_args(self) -> Self {
                    self.expectation.lock().args = ArgsSpec::Empty;
                    self
                }

                /// Delegates argument matching to `check`.
                pub fn with_args_check<F>(self, check: F) -> Self
                where
                    F: Fn(&[NamedValue]) -> Result<(), String> + Send + Sync + 'static,
                {
                    self.expectation.lock().args = ArgsSpec::Check(Arc::new(check));
                    self
                }
            }
        )*
    };
}

/// Handle for begin, commit, rollback, close and ping expectations.
#[derive(Debug, Clone)]
pub struct ExpectedCall {
    /// Shared expectation.
    expectation: Arc<Expectation>,
}

impl ExpectedCall {
    /// Wraps a declared expectation.
    pub(crate) const fn new(expectation: Arc<Expectation>) -> Self {
        Self {
            expectation,
        }
    }
}

/// Handle for a query expectation.
#[derive(Debug, Clone)]
pub struct ExpectedQuery {
    /// Shared expectation.
    expectation: Arc<Expectation>,
}

impl ExpectedQuery {
    /// Wraps a declared expectation.
    pub(crate) const fn new(expectation: Arc<Expectation>) -> Self {
        Self {
            expectation,
        }
    }

    /// Appends a result batch; call repeatedly for multiple result sets.
    pub fn will_return_rows(self, rows: Rows) -> Self {
        if let Payload::Query {
            batches,
            ..
        } = &mut self.expectation.lock().payload
        {
            batches.push(rows);
        }
        self
    }

    /// Requires the returned row set to be closed before verification.
    pub fn rows_will_be_closed(self) -> Self {
        if let Payload::Query {
            rows_must_be_closed,
            ..
        } = &mut self.expectation.lock().payload
        {
            *rows_must_be_closed = true;
        }
        self
    }
}

/// Handle for an exec expectation.
#[derive(Debug, Clone)]
pub struct ExpectedExec {
    /// Shared expectation.
    expectation: Arc<Expectation>,
}

impl ExpectedExec {
    /// Wraps a declared expectation.
    pub(crate) const fn new(expectation: Arc<Expectation>) -> Self {
        Self {
            expectation,
        }
    }

    /// Sets the result returned on success.
    pub fn will_return_result(self, result: ExecResult) -> Self {
        if let Payload::Exec {
            result: slot,
        } = &mut self.expectation.lock().payload
        {
            *slot = Some(result);
        }
        self
    }
}

/// Handle for a prepare expectation.
#[derive(Debug, Clone)]
pub struct ExpectedPrepare {
    /// Shared expectation.
    expectation: Arc<Expectation>,
    /// Queue receiving follow-up statement expectations.
    queue: Arc<ExpectationQueue>,
}

impl ExpectedPrepare {
    /// Wraps a declared expectation.
    pub(crate) const fn new(expectation: Arc<Expectation>, queue: Arc<ExpectationQueue>) -> Self {
        Self {
            expectation,
            queue,
        }
    }

    /// Makes closing the prepared statement fail with `error`.
    pub fn will_return_close_error(self, error: impl Into<ProgrammedError>) -> Self {
        if let Payload::Prepare {
            close_error,
            ..
        } = &mut self.expectation.lock().payload
        {
            *close_error = Some(error.into());
        }
        self
    }

    /// Requires the prepared statement to be closed before verification.
    pub fn will_be_closed(self) -> Self {
        if let Payload::Prepare {
            must_be_closed,
            ..
        } = &mut self.expectation.lock().payload
        {
            *must_be_closed = true;
        }
        self
    }

    /// Declares a query on the prepared statement, reusing its SQL.
    pub fn expect_query(&self) -> ExpectedQuery {
        let sql = self.expectation.lock().sql.clone();
        ExpectedQuery::new(self.queue.push(sql.as_deref(), Payload::empty(ExpectationKind::Query)))
    }

    /// Declares an exec on the prepared statement, reusing its SQL.
    pub fn expect_exec(&self) -> ExpectedExec {
        let sql = self.expectation.lock().sql.clone();
        ExpectedExec::new(self.queue.push(sql.as_deref(), Payload::empty(ExpectationKind::Exec)))
    }
}

expectation_handle!(ExpectedCall, ExpectedQuery, ExpectedExec, ExpectedPrepare);
argument_handle!(ExpectedQuery, ExpectedExec);
