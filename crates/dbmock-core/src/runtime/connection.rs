// crates/dbmock-core/src/runtime/connection.rs
// ============================================================================
// Module: dbmock Connection Facade
// Description: Driver-shaped async API for code under test and the declaration handle.
// Purpose: Route every driver call through the expectation engine.
// Dependencies: crate::core, crate::interfaces, crate::runtime::*, serde, tokio
// ============================================================================

//! ## Overview
//! A mock has two faces sharing one state. [`Sqlmock`] is held by the test to
//! declare expectations and verify them. [`Connection`] is handed to the code
//! under test and behaves like a database connection: every call is converted,
//! matched against the declared expectations, delayed if requested, and then
//! answered with the declared payload or error.
//!
//! [`Transaction`] and [`Statement`] borrow their connection and forward to
//! it, so their calls are matched against the same queue.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Serialize;

use crate::core::Column;
use crate::core::EventOutcome;
use crate::core::ExecResult;
use crate::core::ExpectationKind;
use crate::core::MockEvent;
use crate::core::MockEventParams;
use crate::core::NamedValue;
use crate::core::Params;
use crate::core::normalize_sql;
use crate::interfaces::EventSink;
use crate::interfaces::ValueConverter;
use crate::runtime::context::Context;
use crate::runtime::engine::Call;
use crate::runtime::engine::ExpectationQueue;
use crate::runtime::engine::Granted;
use crate::runtime::error::DriverError;
use crate::runtime::expectation::ExpectedCall;
use crate::runtime::expectation::ExpectedExec;
use crate::runtime::expectation::ExpectedPrepare;
use crate::runtime::expectation::ExpectedQuery;
use crate::runtime::expectation::Expectation;
use crate::runtime::expectation::Payload;
use crate::runtime::options::MockOptions;
use crate::runtime::registry::Registration;
use crate::runtime::rows::RowSet;
use crate::runtime::rows::Rows;
use crate::runtime::rows::RowsError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Event identifier for intercepted calls.
const CALL_EVENT: &str = "mock_call";
/// Event identifier for verification passes.
const VERIFY_EVENT: &str = "mock_verify";
/// Event identifier for declaration notices.
const DECLARE_EVENT: &str = "mock_declare";

/// Counter for identifiers of mocks created outside a registry.
static STANDALONE_IDS: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// State shared by the declaration handle and every connection of a mock.
pub(crate) struct MockShared {
    /// Mock identifier.
    id: String,
    /// Declared expectations.
    queue: Arc<ExpectationQueue>,
    /// Converter for actual arguments and new rows.
    converter: Arc<dyn ValueConverter>,
    /// Whether ping calls are matched.
    monitor_pings: bool,
    /// Event destination.
    sink: Arc<dyn EventSink>,
}

impl MockShared {
    /// Creates shared state from options.
    pub(crate) fn new(id: String, options: MockOptions) -> Self {
        let queue = ExpectationQueue::new(
            options.ordered,
            options.query_matcher,
            Arc::clone(&options.converter),
        );
        Self {
            id,
            queue: Arc::new(queue),
            converter: options.converter,
            monitor_pings: options.monitor_pings,
            sink: options.sink,
        }
    }

    /// Converts actual arguments.
    fn convert_args(&self, params: Params) -> Result<Vec<NamedValue>, DriverError> {
        params
            .into_inner()
            .into_iter()
            .map(|arg| {
                let ordinal = arg.ordinal;
                let value = self.converter.convert(arg.value).map_err(|reason| {
                    DriverError::Conversion {
                        ordinal,
                        reason,
                    }
                })?;
                Ok(NamedValue {
                    name: arg.name,
                    ordinal,
                    value,
                    out: arg.out,
                })
            })
            .collect()
    }

    /// Records one event.
    fn emit(
        &self,
        event: &'static str,
        call: Option<(ExpectationKind, Option<&str>)>,
        outcome: EventOutcome,
        expectation: Option<usize>,
        message: Option<String>,
    ) {
        let (call, sql) = call.map_or((None, None), |(kind, sql)| (Some(kind), sql));
        self.sink.record(&MockEvent::new(MockEventParams {
            event,
            mock_id: self.id.clone(),
            call,
            sql: sql.map(str::to_string),
            outcome,
            expectation,
            message,
        }));
    }

    /// Verifies the queue and records the outcome.
    fn verify(&self) -> Result<(), DriverError> {
        match self.queue.verify() {
            Ok(()) => {
                self.emit(VERIFY_EVENT, None, EventOutcome::Verified, None, None);
                Ok(())
            }
            Err((index, err)) => {
                let message = Some(err.to_string());
                self.emit(VERIFY_EVENT, None, EventOutcome::Unmet, Some(index), message);
                Err(err)
            }
        }
    }

    /// Matches a call, applies its delay, and resolves its response.
    async fn dispatch(
        &self,
        ctx: &Context,
        kind: ExpectationKind,
        sql: Option<&str>,
        params: Params,
    ) -> Result<(Granted, Arc<Expectation>), DriverError> {
        let sql = sql.map(normalize_sql);
        let record = |outcome: EventOutcome, index: Option<usize>, err: Option<&DriverError>| {
            let message = err.map(ToString::to_string);
            self.emit(CALL_EVENT, Some((kind, sql.as_deref())), outcome, index, message);
        };
        let args = match self.convert_args(params) {
            Ok(args) => args,
            Err(err) => {
                record(EventOutcome::Unexpected, None, Some(&err));
                return Err(err);
            }
        };
        let call = Call {
            kind,
            sql: sql.as_deref(),
            args: &args,
        };
        let selection = match self.queue.select(&call) {
            Ok(selection) => selection,
            Err(err) => {
                record(EventOutcome::Unexpected, None, Some(&err));
                return Err(err);
            }
        };
        let index = Some(selection.expectation.index());
        if let Err(err) = ctx.sleep(selection.delay).await {
            record(EventOutcome::Cancelled, index, Some(&err));
            return Err(err);
        }
        match selection.outcome {
            Ok(granted) => {
                selection.expectation.write_outputs(&args);
                record(EventOutcome::Matched, index, None);
                Ok((granted, selection.expectation))
            }
            Err(err) => {
                let outcome = if err.as_programmed().is_some() {
                    EventOutcome::ProgrammedError
                } else {
                    EventOutcome::Unmet
                };
                record(outcome, index, Some(&err));
                Err(err)
            }
        }
    }
}

// ============================================================================
// SECTION: Declaration Handle
// ============================================================================

/// Test-side handle for declaring and verifying expectations.
#[derive(Clone)]
pub struct Sqlmock {
    /// Shared mock state.
    shared: Arc<MockShared>,
}

impl Sqlmock {
    /// Wraps shared state.
    pub(crate) const fn new(shared: Arc<MockShared>) -> Self {
        Self {
            shared,
        }
    }

    /// Returns the mock identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Declares a kind without SQL.
    fn expect_call(&self, kind: ExpectationKind) -> ExpectedCall {
        ExpectedCall::new(self.shared.queue.push(None, Payload::empty(kind)))
    }

    /// Declares a transaction start.
    pub fn expect_begin(&self) -> ExpectedCall {
        self.expect_call(ExpectationKind::Begin)
    }

    /// Declares a transaction commit.
    pub fn expect_commit(&self) -> ExpectedCall {
        self.expect_call(ExpectationKind::Commit)
    }

    /// Declares a transaction rollback.
    pub fn expect_rollback(&self) -> ExpectedCall {
        self.expect_call(ExpectationKind::Rollback)
    }

    /// Declares a connection close.
    pub fn expect_close(&self) -> ExpectedCall {
        self.expect_call(ExpectationKind::Close)
    }

    /// Declares a ping.
    ///
    /// Without ping monitoring the returned handle is detached from the queue
    /// and a warning event is recorded.
    pub fn expect_ping(&self) -> ExpectedCall {
        if self.shared.monitor_pings {
            return self.expect_call(ExpectationKind::Ping);
        }
        self.shared.emit(
            DECLARE_EVENT,
            Some((ExpectationKind::Ping, None)),
            EventOutcome::Warning,
            None,
            Some("ping expectation has no effect because ping monitoring is disabled".to_string()),
        );
        let detached = Expectation::new(self.shared.queue.len(), None, Payload::Ping);
        ExpectedCall::new(Arc::new(detached))
    }

    /// Declares a query whose SQL must satisfy `sql`.
    pub fn expect_query(&self, sql: &str) -> ExpectedQuery {
        let payload = Payload::empty(ExpectationKind::Query);
        ExpectedQuery::new(self.shared.queue.push(Some(sql), payload))
    }

    /// Declares an exec whose SQL must satisfy `sql`.
    pub fn expect_exec(&self, sql: &str) -> ExpectedExec {
        ExpectedExec::new(self.shared.queue.push(Some(sql), Payload::empty(ExpectationKind::Exec)))
    }

    /// Declares a prepare whose SQL must satisfy `sql`.
    pub fn expect_prepare(&self, sql: &str) -> ExpectedPrepare {
        let expectation =
            self.shared.queue.push(Some(sql), Payload::empty(ExpectationKind::Prepare));
        ExpectedPrepare::new(expectation, Arc::clone(&self.shared.queue))
    }

    /// Switches between ordered and unordered matching.
    pub fn match_expectations_in_order(&self, ordered: bool) {
        self.shared.queue.set_ordered(ordered);
    }

    /// Verifies that every expectation was triggered and every statement or
    /// row set that had to be closed was closed.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Unmet`] or [`DriverError::NotClosed`] for the
    /// first offending expectation in declaration order.
    pub fn expectations_were_met(&self) -> Result<(), DriverError> {
        self.shared.verify()
    }

    /// Creates a row batch using this mock's converter.
    #[must_use]
    pub fn new_rows<I, S>(&self, columns: I) -> Rows
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rows::new(columns).with_converter(Arc::clone(&self.shared.converter))
    }

    /// Creates a row batch with full column definitions using this mock's converter.
    #[must_use]
    pub fn new_rows_with_columns(&self, columns: Vec<Column>) -> Rows {
        Rows::with_columns(columns).with_converter(Arc::clone(&self.shared.converter))
    }

    /// Creates a row batch from serializable records using this mock's converter.
    ///
    /// # Errors
    ///
    /// Returns [`RowsError`] under the same conditions as [`Rows::from_records`].
    pub fn new_rows_from_records<T: Serialize>(&self, records: &[T]) -> Result<Rows, RowsError> {
        Rows::from_records_with_converter(records, Arc::clone(&self.shared.converter))
    }
}

impl fmt::Debug for Sqlmock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sqlmock")
            .field("id", &self.shared.id)
            .field("queue", &self.shared.queue)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Mock database connection handed to code under test.
pub struct Connection {
    /// Shared mock state.
    shared: Arc<MockShared>,
    /// Registry entry released on close.
    registration: Option<Registration>,
    /// Whether close already released the registry entry.
    released: AtomicBool,
}

impl Connection {
    /// Creates a connection over shared state.
    pub(crate) const fn new(shared: Arc<MockShared>, registration: Option<Registration>) -> Self {
        Self {
            shared,
            registration,
            released: AtomicBool::new(false),
        }
    }

    /// Returns the mock identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Starts a transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when no begin expectation matches, the
    /// matched one is programmed to fail, or the context ends during its delay.
    pub async fn begin(&self, ctx: &Context) -> Result<Transaction<'_>, DriverError> {
        self.shared.dispatch(ctx, ExpectationKind::Begin, None, Params::none()).await?;
        Ok(Transaction {
            connection: self,
        })
    }

    /// Commits the current transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when no commit expectation matches or the
    /// matched one fails.
    pub async fn commit(&self, ctx: &Context) -> Result<(), DriverError> {
        self.shared.dispatch(ctx, ExpectationKind::Commit, None, Params::none()).await.map(|_| ())
    }

    /// Rolls back the current transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when no rollback expectation matches or the
    /// matched one fails.
    pub async fn rollback(&self, ctx: &Context) -> Result<(), DriverError> {
        self.shared.dispatch(ctx, ExpectationKind::Rollback, None, Params::none()).await.map(|_| ())
    }

    /// Prepares a statement.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when no prepare expectation matches or the
    /// matched one fails.
    pub async fn prepare(&self, ctx: &Context, sql: &str) -> Result<Statement<'_>, DriverError> {
        let (_, expectation) =
            self.shared.dispatch(ctx, ExpectationKind::Prepare, Some(sql), Params::none()).await?;
        Ok(Statement {
            connection: self,
            sql: sql.to_string(),
            expectation,
            closed: false,
        })
    }

    /// Runs a row-returning statement.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when an argument cannot be converted, no
    /// query expectation matches, the matched one fails or declares no rows,
    /// or the context ends during its delay.
    pub async fn query(
        &self,
        ctx: &Context,
        sql: &str,
        args: impl Into<Params>,
    ) -> Result<RowSet, DriverError> {
        let (granted, expectation) =
            self.shared.dispatch(ctx, ExpectationKind::Query, Some(sql), args.into()).await?;
        let batches = match granted {
            Granted::Rows(batches) => batches,
            Granted::Done | Granted::Result(_) => {
                return Err(missing_return(ExpectationKind::Query, sql, &expectation));
            }
        };
        Ok(RowSet::new(batches, Some(expectation)))
    }

    /// Runs a data-modifying statement.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when an argument cannot be converted, no exec
    /// expectation matches, the matched one fails or declares no result, or
    /// the context ends during its delay.
    pub async fn exec(
        &self,
        ctx: &Context,
        sql: &str,
        args: impl Into<Params>,
    ) -> Result<ExecResult, DriverError> {
        let (granted, expectation) =
            self.shared.dispatch(ctx, ExpectationKind::Exec, Some(sql), args.into()).await?;
        match granted {
            Granted::Result(result) => Ok(result),
            Granted::Done | Granted::Rows(_) => {
                Err(missing_return(ExpectationKind::Exec, sql, &expectation))
            }
        }
    }

    /// Checks connection liveness; always succeeds without ping monitoring.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when monitoring is on and no ping
    /// expectation matches or the matched one fails.
    pub async fn ping(&self, ctx: &Context) -> Result<(), DriverError> {
        if !self.shared.monitor_pings {
            return Ok(());
        }
        self.shared.dispatch(ctx, ExpectationKind::Ping, None, Params::none()).await.map(|_| ())
    }

    /// Closes the connection.
    ///
    /// Releases the registry entry, then verifies the remaining expectations
    /// once the close itself matched.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when no close expectation matches, the
    /// matched one fails, or verification finds an unmet expectation.
    pub async fn close(&self, ctx: &Context) -> Result<(), DriverError> {
        let closed = self.shared.dispatch(ctx, ExpectationKind::Close, None, Params::none()).await;
        if !self.released.swap(true, Ordering::SeqCst)
            && let Some(registration) = &self.registration
        {
            registration.release();
        }
        closed?;
        self.shared.verify()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.shared.id)
            .field("released", &self.released.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Transaction started on a mock connection.
#[derive(Debug)]
pub struct Transaction<'c> {
    /// Owning connection.
    connection: &'c Connection,
}

impl Transaction<'_> {
    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// See [`Connection::commit`].
    pub async fn commit(self, ctx: &Context) -> Result<(), DriverError> {
        self.connection.commit(ctx).await
    }

    /// Rolls back the transaction.
    ///
    /// # Errors
    ///
    /// See [`Connection::rollback`].
    pub async fn rollback(self, ctx: &Context) -> Result<(), DriverError> {
        self.connection.rollback(ctx).await
    }

    /// Runs a row-returning statement inside the transaction.
    ///
    /// # Errors
    ///
    /// See [`Connection::query`].
    pub async fn query(
        &self,
        ctx: &Context,
        sql: &str,
        args: impl Into<Params>,
    ) -> Result<RowSet, DriverError> {
        self.connection.query(ctx, sql, args).await
    }

    /// Runs a data-modifying statement inside the transaction.
    ///
    /// # Errors
    ///
    /// See [`Connection::exec`].
    pub async fn exec(
        &self,
        ctx: &Context,
        sql: &str,
        args: impl Into<Params>,
    ) -> Result<ExecResult, DriverError> {
        self.connection.exec(ctx, sql, args).await
    }

    /// Prepares a statement inside the transaction.
    ///
    /// # Errors
    ///
    /// See [`Connection::prepare`].
    pub async fn prepare(&self, ctx: &Context, sql: &str) -> Result<Statement<'_>, DriverError> {
        self.connection.prepare(ctx, sql).await
    }
}

// ============================================================================
// SECTION: Statement
// ============================================================================

/// Prepared statement on a mock connection.
#[derive(Debug)]
pub struct Statement<'c> {
    /// Owning connection.
    connection: &'c Connection,
    /// SQL the statement was prepared with.
    sql: String,
    /// Prepare expectation that produced the statement.
    expectation: Arc<Expectation>,
    /// Whether close was called.
    closed: bool,
}

impl Statement<'_> {
    /// Returns the SQL the statement was prepared with.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Runs the statement as a query.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::StatementClosed`] after close; otherwise see
    /// [`Connection::query`].
    pub async fn query(
        &self,
        ctx: &Context,
        args: impl Into<Params>,
    ) -> Result<RowSet, DriverError> {
        if self.closed {
            return Err(DriverError::StatementClosed);
        }
        self.connection.query(ctx, &self.sql, args).await
    }

    /// Runs the statement as an exec.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::StatementClosed`] after close; otherwise see
    /// [`Connection::exec`].
    pub async fn exec(
        &self,
        ctx: &Context,
        args: impl Into<Params>,
    ) -> Result<ExecResult, DriverError> {
        if self.closed {
            return Err(DriverError::StatementClosed);
        }
        self.connection.exec(ctx, &self.sql, args).await
    }

    /// Closes the statement. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the close error programmed on the prepare expectation.
    pub fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.expectation.close_statement()
    }
}

/// Builds the error for a matched expectation whose response has the wrong shape.
fn missing_return(kind: ExpectationKind, sql: &str, expectation: &Expectation) -> DriverError {
    DriverError::MissingReturn {
        call: format!("{kind} '{}'", normalize_sql(sql)),
        expectation: expectation.describe(),
    }
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

/// Creates a mock outside any registry.
///
/// The identifier is `options.id` when set, otherwise a generated
/// `dbmock_<n>` name.
#[must_use]
pub fn new(options: MockOptions) -> (Connection, Sqlmock) {
    let id = options.id.clone().unwrap_or_else(|| {
        format!("dbmock_{}", STANDALONE_IDS.fetch_add(1, Ordering::Relaxed) + 1)
    });
    let shared = Arc::new(MockShared::new(id, options));
    (Connection::new(Arc::clone(&shared), None), Sqlmock::new(shared))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
