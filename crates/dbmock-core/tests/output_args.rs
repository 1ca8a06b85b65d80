// crates/dbmock-core/tests/output_args.rs
// ============================================================================
// Module: Output Parameter Tests
// Description: Output and input/output arguments of stored-procedure calls.
// Purpose: Validate output selection and write-back of declared values.
// ============================================================================

//! Output parameter tests.

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

use std::time::Duration;

use dbmock_core::ArgsSpec;
use dbmock_core::ArgumentMismatch;
use dbmock_core::Context;
use dbmock_core::DefaultConverter;
use dbmock_core::DriverError;
use dbmock_core::ExecResult;
use dbmock_core::MockOptions;
use dbmock_core::NamedValue;
use dbmock_core::OutParam;
use dbmock_core::Params;
use dbmock_core::Rows;
use dbmock_core::Value;
use dbmock_core::ValueKind;
use dbmock_core::args;
use dbmock_core::input_output_arg;
use dbmock_core::match_arguments;
use dbmock_core::output_arg;
use dbmock_core::typed_output_arg;
use dbmock_core::values;

// ============================================================================
// SECTION: Write-Back
// ============================================================================

/// Verifies output, input/output, and typed parameters receive declared values.
#[tokio::test]
async fn output_parameters_receive_declared_values() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    let exec = mock
        .expect_exec("CALL fetch_labels")
        .with_args(args![
            output_arg("label", "123Output"),
            input_output_arg("code", "abcInput", "abcOutput"),
        ])
        .will_return_result(ExecResult::new(0, 1));
    let _status = mock
        .expect_query("CALL fetch_status")
        .with_args(args![typed_output_arg(123)])
        .will_return_rows(Rows::new(["ok"]).add_row(values![true]));

    let label = OutParam::output();
    let code = OutParam::input_output("abcInput");
    let params = Params::from(vec![
        NamedValue::named_output("label", 1, &label),
        NamedValue::named_output("code", 2, &code),
    ]);
    conn.exec(&Context::background(), "CALL fetch_labels", params).await.unwrap();
    assert!(exec.was_triggered());
    assert_eq!(label.value(), Value::from("123Output"));
    assert_eq!(code.value(), Value::from("abcOutput"));

    let status = OutParam::typed(ValueKind::Int);
    let params = Params::from(vec![NamedValue::output(1, &status)]);
    let mut rows = conn.query(&Context::background(), "CALL fetch_status", params).await.unwrap();
    assert_eq!(status.value(), Value::Int(123));
    assert_eq!(rows.collect_values().unwrap(), vec![values![true]]);
    rows.close().unwrap();
    mock.expectations_were_met().unwrap();
}

/// Verifies a programmed error leaves output parameters untouched.
#[tokio::test]
async fn failed_calls_do_not_write_outputs() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    let _exec = mock
        .expect_exec("CALL fetch_labels")
        .with_args(args![output_arg("label", "written")])
        .will_return_error("procedure failed");

    let label = OutParam::output();
    let params = Params::from(vec![NamedValue::named_output("label", 1, &label)]);
    let err = conn.exec(&Context::background(), "CALL fetch_labels", params).await.unwrap_err();
    assert_eq!(err.to_string(), "procedure failed");
    assert_eq!(label.value(), Value::Null);
}

/// Verifies a cancelled delay leaves output parameters untouched.
#[tokio::test(start_paused = true)]
async fn cancelled_calls_do_not_write_outputs() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    let _exec = mock
        .expect_exec("CALL fetch_labels")
        .with_args(args![output_arg("label", "written")])
        .will_delay_for(Duration::from_secs(5))
        .will_return_result(ExecResult::new(0, 1));

    let label = OutParam::output();
    let params = Params::from(vec![NamedValue::named_output("label", 1, &label)]);
    let ctx = Context::with_timeout(Duration::from_secs(1));
    let err = conn.exec(&ctx, "CALL fetch_labels", params).await.unwrap_err();
    assert_eq!(err, DriverError::DeadlineExceeded);
    assert_eq!(label.value(), Value::Null);
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Verifies an input/output declaration requires the same input value.
#[test]
fn input_output_requires_matching_input() {
    let declared = ArgsSpec::List(args![input_output_arg("code", "abcInput", "abcOutput")]);
    let accepted = [NamedValue::named_output("code", 1, &OutParam::input_output("abcInput"))];
    assert!(match_arguments(&declared, &accepted, &DefaultConverter).is_ok());

    let other = [NamedValue::named_output("code", 1, &OutParam::input_output("xyz"))];
    let err = match_arguments(&declared, &other, &DefaultConverter).unwrap_err();
    assert!(matches!(err, ArgumentMismatch::Rejected { position: 0, .. }));

    let output_only = [NamedValue::named_output("code", 1, &OutParam::output())];
    assert!(match_arguments(&declared, &output_only, &DefaultConverter).is_err());
}

/// Verifies output declarations reject plain values and input/output parameters.
#[test]
fn output_declarations_require_output_parameters() {
    let declared = ArgsSpec::List(args![output_arg("label", "x")]);
    let plain = [NamedValue::named("label", 1, Value::Null)];
    assert!(matches!(
        match_arguments(&declared, &plain, &DefaultConverter),
        Err(ArgumentMismatch::Rejected { position: 0, .. })
    ));
    let in_out = [NamedValue::named_output("label", 1, &OutParam::input_output("x"))];
    assert!(match_arguments(&declared, &in_out, &DefaultConverter).is_err());
    let renamed = [NamedValue::named_output("title", 1, &OutParam::output())];
    assert!(matches!(
        match_arguments(&declared, &renamed, &DefaultConverter),
        Err(ArgumentMismatch::Name { .. })
    ));
}

/// Verifies typed declarations require a parameter of the returned value's kind.
#[test]
fn typed_output_requires_matching_kind() {
    let declared = ArgsSpec::List(args![typed_output_arg(123)]);
    let int_param = [NamedValue::output(1, &OutParam::typed(ValueKind::Int))];
    assert!(match_arguments(&declared, &int_param, &DefaultConverter).is_ok());

    let text_param = [NamedValue::output(1, &OutParam::typed(ValueKind::Text))];
    let err = match_arguments(&declared, &text_param, &DefaultConverter).unwrap_err();
    assert!(err.to_string().contains("output parameter"));

    let untyped = [NamedValue::output(1, &OutParam::output())];
    assert!(match_arguments(&declared, &untyped, &DefaultConverter).is_err());
}

/// Verifies a rejected output argument leaves the expectation unmet.
#[tokio::test]
async fn mismatched_output_leaves_expectation_unmet() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    let exec = mock
        .expect_exec("CALL fetch_labels")
        .with_args(args![input_output_arg("code", "abcInput", "abcOutput")])
        .will_return_result(ExecResult::new(0, 1));

    let code = OutParam::input_output("other");
    let params = Params::from(vec![NamedValue::named_output("code", 1, &code)]);
    assert!(conn.exec(&Context::background(), "CALL fetch_labels", params).await.is_err());
    assert!(!exec.was_triggered());
    assert_eq!(code.value(), Value::from("other"));
    assert!(mock.expectations_were_met().is_err());
}
