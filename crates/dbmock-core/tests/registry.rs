// crates/dbmock-core/tests/registry.rs
// ============================================================================
// Module: Mock Registry Tests
// Description: Named mock instances opened and closed through a registry.
// Purpose: Validate identifier handling and open-connection accounting.
// ============================================================================

//! Registry tests.

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
use dbmock_core::ExecResult;
use dbmock_core::MockOptions;
use dbmock_core::MockRegistry;
use dbmock_core::RegistryError;

/// Verifies created mocks get distinct generated identifiers.
#[test]
fn create_generates_distinct_ids() {
    let registry = MockRegistry::new();
    let (first, _first_mock) = registry.create(MockOptions::default()).unwrap();
    let (second, _second_mock) = registry.create(MockOptions::default()).unwrap();

    assert_ne!(first.id(), second.id());
    assert!(first.id().starts_with("dbmock_db_"));
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.open_connections(first.id()), Some(1));
}

/// Verifies a duplicate identifier is rejected.
#[test]
fn duplicate_id_is_rejected() {
    let registry = MockRegistry::new();
    let options = MockOptions::default().with_id("orders");
    let (_conn, _mock) = registry.create(options.clone()).unwrap();

    let err = registry.create(options).unwrap_err();
    assert_eq!(err, RegistryError::Duplicate("orders".to_string()));
    assert_eq!(err.to_string(), "cannot create driver with duplicate dsn: orders");
    assert!(registry.register("orders", MockOptions::default()).is_err());
}

/// Verifies connections opened by identifier share the registered mock.
#[tokio::test]
async fn open_shares_registered_mock() {
    let registry = MockRegistry::new();
    let mock = registry.register("inventory", MockOptions::default()).unwrap();
    mock.expect_exec("UPDATE stock").will_return_result(ExecResult::new(0, 3));
    mock.expect_close();
    assert_eq!(registry.open_connections("inventory"), Some(0));

    let conn = registry.open("inventory").unwrap();
    assert_eq!(registry.open_connections("inventory"), Some(1));
    let ctx = Context::background();
    let result = conn.exec(&ctx, "UPDATE stock SET qty = 0", ()).await.unwrap();
    assert_eq!(result.rows_affected().unwrap(), 3);

    conn.close(&ctx).await.unwrap();
    assert!(!registry.contains("inventory"));
    mock.expectations_were_met().unwrap();
}

/// Verifies the mock stays registered until its last connection closes.
#[tokio::test]
async fn last_close_removes_mock() {
    let registry = MockRegistry::new();
    let (first, mock) = registry.create(MockOptions::default().with_id("users")).unwrap();
    let second = registry.open("users").unwrap();
    mock.match_expectations_in_order(false);
    mock.expect_close();
    mock.expect_close();

    let ctx = Context::background();
    first.close(&ctx).await.unwrap_err();
    assert_eq!(registry.open_connections("users"), Some(1));
    second.close(&ctx).await.unwrap();
    assert!(registry.is_empty());
}

/// Verifies closing twice releases the registry entry only once.
#[tokio::test]
async fn repeated_close_releases_once() {
    let registry = MockRegistry::new();
    let (first, mock) = registry.create(MockOptions::default().with_id("twice")).unwrap();
    let _second = registry.open("twice").unwrap();
    mock.expect_close();

    let ctx = Context::background();
    first.close(&ctx).await.unwrap();
    first.close(&ctx).await.unwrap_err();
    assert_eq!(registry.open_connections("twice"), Some(1));
}

/// Verifies opening an unknown identifier fails.
#[test]
fn open_unknown_id_fails() {
    let registry = MockRegistry::new();
    let err = registry.open("missing").unwrap_err();
    assert_eq!(err, RegistryError::NotFound("missing".to_string()));
    assert!(registry.unregister("missing").is_err());
}

/// Verifies independent registries do not share identifiers.
#[test]
fn registries_are_isolated() {
    let left = MockRegistry::new();
    let right = MockRegistry::new();
    let (_conn, _mock) = left.create(MockOptions::default().with_id("shared")).unwrap();

    assert!(right.open("shared").is_err());
    assert!(right.create(MockOptions::default().with_id("shared")).is_ok());
    left.unregister("shared").unwrap();
    assert!(left.is_empty());
}
