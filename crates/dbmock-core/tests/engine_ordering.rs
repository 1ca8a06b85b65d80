// crates/dbmock-core/tests/engine_ordering.rs
// ============================================================================
// Module: Expectation Ordering Tests
// Description: Ordered and unordered selection through the connection facade.
// Purpose: Ensure calls consume the right expectation and failures consume none.
// ============================================================================

//! Ordering and selection tests for the expectation engine.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use dbmock_core::Context;
use dbmock_core::DriverError;
use dbmock_core::EqualQueryMatcher;
use dbmock_core::ExecResult;
use dbmock_core::MockOptions;
use dbmock_core::args;
use dbmock_core::values;

// ============================================================================
// SECTION: Ordered Mode
// ============================================================================

/// Verifies a transaction that follows the declared order is fully met.
#[tokio::test]
async fn ordered_transaction_flow_is_met() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_begin();
    mock.expect_exec("UPDATE products")
        .with_args(args![2, 3])
        .will_return_result(ExecResult::new(1, 1));
    mock.expect_exec("INSERT INTO product_viewers")
        .with_args(args![2, 3])
        .will_return_result(ExecResult::new(0, 1));
    mock.expect_commit();

    let ctx = Context::background();
    let tx = conn.begin(&ctx).await.unwrap();
    let updated = tx
        .exec(&ctx, "UPDATE products SET views = views + 1 WHERE id = ?", values![2, 3])
        .await
        .unwrap();
    assert_eq!(updated.rows_affected().unwrap(), 1);
    let inserted = tx
        .exec(&ctx, "INSERT INTO product_viewers (user_id, product_id) VALUES (?, ?)", values![
            2, 3
        ])
        .await
        .unwrap();
    assert_eq!(inserted.last_insert_id().unwrap(), 0);
    tx.commit(&ctx).await.unwrap();

    mock.expectations_were_met().unwrap();
}

/// Verifies an out-of-order call names the next expectation and consumes nothing.
#[tokio::test]
async fn ordered_mode_rejects_out_of_order_call() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_begin();
    mock.expect_exec("DELETE FROM carts").will_return_result(ExecResult::new(0, 2));

    let ctx = Context::background();
    let err = conn.exec(&ctx, "DELETE FROM carts", ()).await.unwrap_err();
    assert!(matches!(err, DriverError::OutOfOrder { .. }));
    let message = err.to_string();
    assert!(message.starts_with("call to ExecQuery 'DELETE FROM carts' with args []"));
    assert!(message.contains("next expectation is: ExpectedBegin"));

    conn.begin(&ctx).await.unwrap();
    conn.exec(&ctx, "DELETE FROM carts", ()).await.unwrap();
    mock.expectations_were_met().unwrap();
}

/// Verifies a SQL mismatch on the next expectation leaves it pending.
#[tokio::test]
async fn ordered_sql_mismatch_does_not_consume() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    let expected = mock
        .expect_query("SELECT name FROM users")
        .will_return_rows(mock.new_rows(["name"]).add_row(values!["ada"]));

    let ctx = Context::background();
    let err = conn.query(&ctx, "SELECT id FROM orders", ()).await.unwrap_err();
    assert!(matches!(err, DriverError::SqlMismatch { .. }));
    assert!(!expected.was_triggered());

    let unmet = mock.expectations_were_met().unwrap_err();
    assert!(matches!(unmet, DriverError::Unmet(_)));
    assert!(unmet.to_string().contains("SELECT name FROM users"));
}

/// Verifies an argument mismatch on the next expectation leaves it pending.
#[tokio::test]
async fn ordered_argument_mismatch_does_not_consume() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    let expected = mock
        .expect_exec("UPDATE accounts")
        .with_args(args![1])
        .will_return_result(ExecResult::new(0, 1));

    let ctx = Context::background();
    let err = conn.exec(&ctx, "UPDATE accounts SET active = 0", values![2]).await.unwrap_err();
    assert!(matches!(err, DriverError::ArgumentMismatch { .. }));
    assert!(!expected.was_triggered());

    conn.exec(&ctx, "UPDATE accounts SET active = 0", values![1]).await.unwrap();
    assert!(expected.was_triggered());
}

/// Verifies a call after every expectation was consumed reports that fact.
#[tokio::test]
async fn extra_call_reports_all_fulfilled() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_begin();

    let ctx = Context::background();
    conn.begin(&ctx).await.unwrap();
    let err = conn.begin(&ctx).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "all expectations were already fulfilled, call to database transaction Begin was not \
         expected"
    );
}

/// Verifies an unexpected call on an empty mock has no fulfilled prefix.
#[tokio::test]
async fn call_without_declarations_is_unexpected() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.match_expectations_in_order(false);

    let ctx = Context::background();
    let err = conn.rollback(&ctx).await.unwrap_err();
    assert!(matches!(err, DriverError::UnexpectedCall { .. }));
    assert!(err.to_string().contains("call to Rollback transaction was not expected"));
}

// ============================================================================
// SECTION: Unordered Mode
// ============================================================================

/// Verifies unordered mode accepts calls in any order.
#[tokio::test]
async fn unordered_mode_accepts_any_order() {
    let (conn, mock) = dbmock_core::new(MockOptions::default().with_ordered(false));
    mock.expect_exec("UPDATE stock").will_return_result(ExecResult::new(0, 1));
    mock.expect_query("SELECT price")
        .will_return_rows(mock.new_rows(["price"]).add_row(values![10.5]));

    let ctx = Context::background();
    let mut rows = conn.query(&ctx, "SELECT price FROM items", ()).await.unwrap();
    assert_eq!(rows.collect_values().unwrap(), vec![values![10.5]]);
    rows.close().unwrap();
    conn.exec(&ctx, "UPDATE stock SET qty = qty - 1", ()).await.unwrap();

    mock.expectations_were_met().unwrap();
}

/// Verifies unordered mode skips expectations that reject the call.
#[tokio::test]
async fn unordered_mode_skips_rejecting_expectations() {
    let (conn, mock) = dbmock_core::new(MockOptions::default().with_ordered(false));
    let first = mock
        .expect_exec("UPDATE users")
        .with_args(args![1])
        .will_return_result(ExecResult::new(0, 1));
    let second = mock
        .expect_exec("UPDATE users")
        .with_args(args![2])
        .will_return_result(ExecResult::new(0, 2));

    let ctx = Context::background();
    let result = conn.exec(&ctx, "UPDATE users SET seen = 1", values![2]).await.unwrap();
    assert_eq!(result.rows_affected().unwrap(), 2);
    assert!(!first.was_triggered());
    assert!(second.was_triggered());

    let err = conn.exec(&ctx, "UPDATE users SET seen = 1", values![3]).await.unwrap_err();
    assert!(matches!(err, DriverError::UnexpectedCall { all_fulfilled: false, .. }));
}

/// Verifies identical expectations are consumed in declaration order.
#[tokio::test]
async fn identical_expectations_are_consumed_in_declaration_order() {
    let (conn, mock) = dbmock_core::new(MockOptions::default().with_ordered(false));
    let first = mock.expect_exec("INSERT").will_return_result(ExecResult::new(1, 1));
    let second = mock.expect_exec("INSERT").will_return_result(ExecResult::new(2, 1));

    let ctx = Context::background();
    let result = conn.exec(&ctx, "INSERT INTO t VALUES (1)", ()).await.unwrap();
    assert_eq!(result.last_insert_id().unwrap(), 1);
    assert!(first.was_triggered());
    assert!(!second.was_triggered());
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Verifies a programmed error is returned and still consumes the expectation.
#[tokio::test]
async fn programmed_error_consumes_expectation() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_begin().will_return_error("connection refused");

    let ctx = Context::background();
    let err = conn.begin(&ctx).await.unwrap_err();
    assert_eq!(err.as_programmed().map(|error| error.message()), Some("connection refused"));
    assert_eq!(err.to_string(), "connection refused");
    mock.expectations_were_met().unwrap();
}

/// Verifies a query or exec without a declared payload fails after matching.
#[tokio::test]
async fn missing_payload_is_reported() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_query("SELECT");
    mock.expect_exec("DELETE");

    let ctx = Context::background();
    let query_err = conn.query(&ctx, "SELECT 1", ()).await.unwrap_err();
    assert!(matches!(query_err, DriverError::MissingReturn { .. }));
    let exec_err = conn.exec(&ctx, "DELETE FROM t", ()).await.unwrap_err();
    assert!(matches!(exec_err, DriverError::MissingReturn { .. }));
    mock.expectations_were_met().unwrap();
}

/// Verifies an exec result can carry its own errors.
#[tokio::test]
async fn exec_result_error_is_returned_from_accessors() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_exec("UPDATE").will_return_result(ExecResult::error("no result available"));

    let ctx = Context::background();
    let result = conn.exec(&ctx, "UPDATE t SET a = 1", ()).await.unwrap();
    assert_eq!(result.rows_affected().unwrap_err().message(), "no result available");
    assert_eq!(result.last_insert_id().unwrap_err().message(), "no result available");
}

/// Verifies whitespace differences between declared and actual SQL are ignored.
#[tokio::test]
async fn equal_matcher_ignores_whitespace_layout() {
    let options = MockOptions::default().with_query_matcher(EqualQueryMatcher);
    let (conn, mock) = dbmock_core::new(options);
    mock.expect_exec("UPDATE  users\n   SET name = ?").will_return_result(ExecResult::new(0, 1));

    let ctx = Context::background();
    conn.exec(&ctx, "UPDATE users SET name = ?", values!["bob"]).await.unwrap();
    mock.expectations_were_met().unwrap();
}

/// Verifies the equal matcher rejects SQL that a pattern search would accept.
#[tokio::test]
async fn equal_matcher_requires_whole_statement() {
    let options = MockOptions::default().with_query_matcher(EqualQueryMatcher);
    let (conn, mock) = dbmock_core::new(options);
    mock.expect_exec("UPDATE users").will_return_result(ExecResult::new(0, 1));

    let ctx = Context::background();
    let err = conn.exec(&ctx, "UPDATE users SET name = ?", values!["bob"]).await.unwrap_err();
    assert!(matches!(err, DriverError::SqlMismatch { .. }));
}

/// Verifies an invalid declared pattern surfaces as a mismatch, not a panic.
#[tokio::test]
async fn invalid_pattern_is_reported_as_mismatch() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_exec("UPDATE (users").will_return_result(ExecResult::new(0, 1));

    let ctx = Context::background();
    let err = conn.exec(&ctx, "UPDATE users", ()).await.unwrap_err();
    assert!(err.to_string().contains("could not compile expected sql"));
}

// ============================================================================
// SECTION: Connection Close
// ============================================================================

/// Verifies closing the connection verifies the remaining expectations.
#[tokio::test]
async fn close_reports_unmet_expectations() {
    let (conn, mock) = dbmock_core::new(MockOptions::default().with_ordered(false));
    mock.expect_exec("UPDATE").will_return_result(ExecResult::new(0, 1));
    mock.expect_close();

    let ctx = Context::background();
    let err = conn.close(&ctx).await.unwrap_err();
    assert!(matches!(err, DriverError::Unmet(_)));
}

/// Verifies a programmed close error is returned as-is.
#[tokio::test]
async fn close_returns_programmed_error() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_close().will_return_error("close failed");

    let ctx = Context::background();
    let err = conn.close(&ctx).await.unwrap_err();
    assert_eq!(err.to_string(), "close failed");
}

/// Verifies pings are ignored unless monitoring is enabled.
#[tokio::test]
async fn ping_requires_monitoring() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    let detached = mock.expect_ping();
    let ctx = Context::background();
    conn.ping(&ctx).await.unwrap();
    assert!(!detached.was_triggered());
    mock.expectations_were_met().unwrap();

    let (conn, mock) = dbmock_core::new(MockOptions::default().with_monitor_pings(true));
    let err = conn.ping(&ctx).await.unwrap_err();
    assert!(matches!(err, DriverError::UnexpectedCall { .. }));
    mock.expect_ping().will_return_error("server gone");
    assert_eq!(conn.ping(&ctx).await.unwrap_err().to_string(), "server gone");
    mock.expectations_were_met().unwrap();
}

// ============================================================================
// SECTION: End-to-End Flows
// ============================================================================

/// Verifies a single-row query is delivered and then verified.
#[tokio::test]
async fn select_one_round_trip() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_query("SELECT 1")
        .without_args()
        .will_return_rows(mock.new_rows(["id"]).add_row(values![1]));

    let ctx = Context::background();
    let mut rows = conn.query(&ctx, "SELECT 1", ()).await.unwrap();
    assert_eq!(rows.collect_values().unwrap(), vec![values![1]]);
    rows.close().unwrap();
    mock.expectations_were_met().unwrap();
}

/// Verifies a wrong argument fails the call and leaves the insert unmet.
#[tokio::test]
async fn wrong_insert_argument_leaves_expectation_unmet() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_exec("INSERT INTO t")
        .with_args(args![42])
        .will_return_result(ExecResult::new(1, 1));

    let ctx = Context::background();
    let err = conn.exec(&ctx, "INSERT INTO t VALUES (?)", values![43]).await.unwrap_err();
    assert!(matches!(err, DriverError::ArgumentMismatch { .. }));
    assert!(matches!(mock.expectations_were_met().unwrap_err(), DriverError::Unmet(_)));
}

/// Verifies committing before beginning is rejected in ordered mode.
#[tokio::test]
async fn commit_before_begin_is_out_of_order() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_begin();
    mock.expect_commit();

    let err = conn.commit(&Context::background()).await.unwrap_err();
    assert!(matches!(err, DriverError::OutOfOrder { .. }));
}
