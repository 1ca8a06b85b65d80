// crates/dbmock-core/tests/value_matching.rs
// ============================================================================
// Module: Argument Matching Tests
// Description: Declared argument lists against actual call arguments.
// Purpose: Cover literals, matcher objects, named parameters, and conversion.
// ============================================================================

//! Argument and value matching tests.

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

use dbmock_core::ArgsSpec;
use dbmock_core::ArgumentMismatch;
use dbmock_core::Context;
use dbmock_core::ConversionError;
use dbmock_core::CustomValue;
use dbmock_core::DefaultConverter;
use dbmock_core::DriverError;
use dbmock_core::ExecResult;
use dbmock_core::MockOptions;
use dbmock_core::NamedValue;
use dbmock_core::PassthroughConverter;
use dbmock_core::Value;
use dbmock_core::ValueKind;
use dbmock_core::ValueMismatch;
use dbmock_core::any_arg;
use dbmock_core::args;
use dbmock_core::compare_value;
use dbmock_core::kind_of;
use dbmock_core::match_arguments;
use dbmock_core::match_fn;
use dbmock_core::named;
use dbmock_core::not_empty_arg;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds positional actual arguments.
fn positional(values: Vec<Value>) -> Vec<NamedValue> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| NamedValue::positional(index + 1, value))
        .collect()
}

/// Matches `declared` against positional `actual` values with the default converter.
fn check(declared: ArgsSpec, actual: Vec<Value>) -> Result<(), ArgumentMismatch> {
    match_arguments(&declared, &positional(actual), &DefaultConverter)
}

// ============================================================================
// SECTION: Value Comparison
// ============================================================================

/// Verifies integers match across widths and signedness.
#[test]
fn integers_match_irrespective_of_width() {
    assert!(compare_value(&Value::from(5_i8), &Value::from(5_i64)).is_ok());
    assert!(compare_value(&Value::from(5_u32), &Value::Int(5)).is_ok());
    assert!(compare_value(&Value::Uint(5), &Value::Int(5)).is_ok());
    assert!(matches!(
        compare_value(&Value::from(5_i32), &Value::from(6_i64)),
        Err(ValueMismatch::Differs { .. })
    ));
}

/// Verifies strings compare exactly and kinds must agree.
#[test]
fn strings_compare_exactly() {
    assert!(compare_value(&Value::from("ada"), &Value::from("ada")).is_ok());
    assert!(compare_value(&Value::from("ada"), &Value::from("Ada")).is_err());
    assert_eq!(
        compare_value(&Value::from("1"), &Value::from(1)),
        Err(ValueMismatch::Kind {
            expected: ValueKind::Text,
            actual: ValueKind::Int,
        })
    );
}

/// Verifies timestamps of any value match each other by kind alone.
#[test]
fn timestamps_match_by_kind_only() {
    let now = OffsetDateTime::now_utc();
    assert!(compare_value(&Value::from(now), &Value::from(OffsetDateTime::UNIX_EPOCH)).is_ok());
    assert!(compare_value(&Value::from(now), &Value::from("2020-01-01")).is_err());
}

/// Verifies mismatch diagnostics render both sides.
#[test]
fn mismatch_message_names_both_values() {
    let err = check(ArgsSpec::List(args![3]), vec![Value::from(4)]).unwrap_err();
    assert_eq!(err.to_string(), "argument 0: expected [int - 3] does not match actual [int - 4]");
}

// ============================================================================
// SECTION: Argument Lists
// ============================================================================

/// Verifies arity mismatches fail closed.
#[test]
fn arity_mismatch_fails() {
    let err = check(ArgsSpec::List(args![1, 2]), vec![Value::from(1)]).unwrap_err();
    assert_eq!(err, ArgumentMismatch::Arity {
        expected: 2,
        actual: 1,
    });
    assert!(check(ArgsSpec::Empty, vec![Value::from(1)]).is_err());
    assert!(check(ArgsSpec::Empty, Vec::new()).is_ok());
    assert!(check(ArgsSpec::Any, vec![Value::from(1), Value::Null]).is_ok());
}

/// Verifies matcher objects are consulted instead of literal comparison.
#[test]
fn matcher_objects_decide_acceptance() {
    let declared = args![any_arg(), not_empty_arg(), kind_of(OffsetDateTime::UNIX_EPOCH)];
    let actual = vec![Value::Null, Value::from("x"), Value::from(OffsetDateTime::now_utc())];
    assert!(check(ArgsSpec::List(declared.clone()), actual).is_ok());

    let empty = vec![Value::Null, Value::from(""), Value::from(OffsetDateTime::now_utc())];
    let err = check(ArgsSpec::List(declared), empty).unwrap_err();
    assert_eq!(err, ArgumentMismatch::Rejected {
        position: 1,
        matcher: "any non-empty value".to_string(),
    });
}

/// Verifies closure matchers receive the converted actual value.
#[test]
fn closure_matchers_see_converted_values() {
    let declared = args![match_fn("an even id", |value: &Value| {
        value.as_wide_integer().is_some_and(|id| id % 2 == 0)
    })];
    assert!(check(ArgsSpec::List(declared.clone()), vec![Value::from(4)]).is_ok());
    assert!(check(ArgsSpec::List(declared), vec![Value::from(5)]).is_err());
}

/// Verifies custom-typed kind matchers require the same type name.
#[test]
fn kind_matchers_distinguish_custom_types() {
    let declared = args![kind_of(CustomValue::new("geo.Point", "(0,0)"))];
    let point = Value::from(CustomValue::new("geo.Point", "(3,4)"));
    let money = Value::from(CustomValue::new("money.Amount", "5 EUR"));
    let converter = PassthroughConverter::new(["geo.Point", "money.Amount"]);
    let spec = ArgsSpec::List(declared);
    assert!(match_arguments(&spec, &positional(vec![point]), &converter).is_ok());
    assert!(match_arguments(&spec, &positional(vec![money]), &converter).is_err());
}

/// Verifies named declarations require matching names and ignore ordinals.
#[test]
fn named_arguments_match_by_name() {
    let declared = ArgsSpec::List(args![named("id", 7), named("owner", "ada")]);
    let actual = vec![NamedValue::named("id", 3, 7), NamedValue::named("owner", 9, "ada")];
    assert!(match_arguments(&declared, &actual, &DefaultConverter).is_ok());

    let renamed = vec![NamedValue::named("uid", 1, 7), NamedValue::named("owner", 2, "ada")];
    let err = match_arguments(&declared, &renamed, &DefaultConverter).unwrap_err();
    assert!(matches!(err, ArgumentMismatch::Name { position: 0, .. }));
}

/// Verifies unnamed declarations require the positional ordinal.
#[test]
fn positional_arguments_require_ordinals() {
    let declared = ArgsSpec::List(args![1, 2]);
    let shuffled = vec![NamedValue::positional(2, 1), NamedValue::positional(1, 2)];
    let err = match_arguments(&declared, &shuffled, &DefaultConverter).unwrap_err();
    assert_eq!(err, ArgumentMismatch::Ordinal {
        position: 0,
        expected: 1,
        actual: 2,
    });
}

/// Verifies a custom check replaces per-position comparison.
#[test]
fn custom_check_receives_whole_list() {
    let spec = ArgsSpec::Check(std::sync::Arc::new(|args: &[NamedValue]| {
        if args.len() == 3 {
            Ok(())
        } else {
            Err(format!("wanted 3 arguments, got {}", args.len()))
        }
    }));
    assert!(check(spec.clone(), vec![Value::Null, Value::Null, Value::Null]).is_ok());
    let err = check(spec, Vec::new()).unwrap_err();
    assert_eq!(err.to_string(), "argument check failed: wanted 3 arguments, got 0");
}

/// Verifies a declared literal that cannot be converted is a mismatch.
#[test]
fn unconvertible_declared_literal_is_a_mismatch() {
    let err = check(ArgsSpec::List(args![u64::MAX]), vec![Value::Int(-1)]).unwrap_err();
    assert_eq!(err, ArgumentMismatch::Conversion {
        position: 0,
        source: ConversionError::UintOverflow(u64::MAX),
    });
}

// ============================================================================
// SECTION: Facade Conversion
// ============================================================================

/// Verifies actual arguments are converted before matching.
#[tokio::test]
async fn actual_arguments_are_converted() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_exec("UPDATE counters")
        .with_args(args![42])
        .will_return_result(ExecResult::new(0, 1));

    let ctx = Context::background();
    conn.exec(&ctx, "UPDATE counters SET n = ?", vec![Value::Uint(42)]).await.unwrap();
    mock.expectations_were_met().unwrap();
}

/// Verifies unconvertible actual arguments fail before any expectation is consumed.
#[tokio::test]
async fn unconvertible_actual_argument_fails_call() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    let expected = mock.expect_exec("INSERT").will_return_result(ExecResult::new(1, 1));

    let ctx = Context::background();
    let point = Value::from(CustomValue::new("geo.Point", "(1,2)"));
    let err = conn.exec(&ctx, "INSERT INTO places VALUES (?)", vec![point]).await.unwrap_err();
    assert!(matches!(err, DriverError::Conversion { ordinal: 1, .. }));
    assert!(!expected.was_triggered());
}

/// Verifies a passthrough converter lets custom types reach literal comparison.
#[tokio::test]
async fn passthrough_converter_admits_custom_types() {
    let options = MockOptions::default().with_converter(PassthroughConverter::new(["geo.Point"]));
    let (conn, mock) = dbmock_core::new(options);
    mock.expect_exec("INSERT")
        .with_args(args![CustomValue::new("geo.Point", "(1,2)")])
        .will_return_result(ExecResult::new(1, 1));

    let ctx = Context::background();
    let point = Value::from(CustomValue::new("geo.Point", "(9,9)"));
    conn.exec(&ctx, "INSERT INTO places VALUES (?)", vec![point]).await.unwrap();
    mock.expectations_were_met().unwrap();
}

/// Verifies named call parameters reach named declarations through the facade.
#[tokio::test]
async fn named_parameters_through_connection() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_query("SELECT name FROM users")
        .with_args(args![named("id", 5)])
        .will_return_rows(mock.new_rows(["name"]));

    let ctx = Context::background();
    let params = vec![NamedValue::named("id", 1, 5)];
    let mut rows = conn.query(&ctx, "SELECT name FROM users WHERE id = :id", params).await.unwrap();
    assert!(rows.next_row().unwrap().is_none());
    rows.close().unwrap();
    mock.expectations_were_met().unwrap();
}

/// Verifies a custom argument check is applied through the facade.
#[tokio::test]
async fn argument_check_through_connection() {
    let (conn, mock) = dbmock_core::new(MockOptions::default());
    mock.expect_exec("DELETE")
        .with_args_check(|args| {
            if args.iter().all(|arg| !arg.value.is_null()) {
                Ok(())
            } else {
                Err("null key".to_string())
            }
        })
        .will_return_result(ExecResult::new(0, 1));

    let ctx = Context::background();
    let err = conn.exec(&ctx, "DELETE FROM t WHERE id = ?", vec![Value::Null]).await.unwrap_err();
    assert!(err.to_string().contains("argument check failed: null key"));
    conn.exec(&ctx, "DELETE FROM t WHERE id = ?", vec![Value::from(1)]).await.unwrap();
}
