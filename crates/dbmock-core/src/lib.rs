// crates/dbmock-core/src/lib.rs
// ============================================================================
// Module: dbmock Core Library
// Description: Public API surface for the mock database driver.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! `dbmock-core` is a programmable stand-in for a relational database
//! driver. Tests declare the calls they expect (begin, commit, rollback,
//! prepare, query, exec, ping, close) together with the rows, results,
//! errors and delays each call should produce. Code under test then talks to
//! a [`Connection`] as if it were a real database, and the test finally asks
//! the [`Sqlmock`] handle whether every expectation was met.
//!
//! ```no_run
//! use dbmock_core::Context;
//! use dbmock_core::ExecResult;
//! use dbmock_core::MockOptions;
//! use dbmock_core::args;
//! use dbmock_core::values;
//!
//! # async fn demo() -> Result<(), dbmock_core::DriverError> {
//! let (conn, mock) = dbmock_core::new(MockOptions::default());
//! mock.expect_begin();
//! mock.expect_exec("UPDATE products")
//!     .with_args(args![2, 3])
//!     .will_return_result(ExecResult::new(1, 1));
//! mock.expect_commit();
//!
//! let ctx = Context::background();
//! let tx = conn.begin(&ctx).await?;
//! let sql = "UPDATE products SET views = views + 1 WHERE id = ? AND owner = ?";
//! tx.exec(&ctx, sql, values![2, 3]).await?;
//! tx.commit(&ctx).await?;
//! mock.expectations_were_met()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Macros
// ============================================================================

/// Builds a `Vec<Value>` for rows and positional call arguments.
#[macro_export]
macro_rules! values {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

/// Builds a `Vec<ExpectedArg>` from literals and matchers.
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::ExpectedArg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::ExpectedArg::from($arg)),+]
    };
}

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::ArgumentMatcher;
pub use interfaces::ConversionError;
pub use interfaces::EventSink;
pub use interfaces::QueryMatcher;
pub use interfaces::QueryMismatch;
pub use interfaces::ValueConverter;
pub use runtime::AnyArgument;
pub use runtime::ArgPattern;
pub use runtime::ArgsCheck;
pub use runtime::ArgsSpec;
pub use runtime::ArgumentMismatch;
pub use runtime::CancelHandle;
pub use runtime::Cell;
pub use runtime::Connection;
pub use runtime::Context;
pub use runtime::DefaultConverter;
pub use runtime::DriverError;
pub use runtime::EqualQueryMatcher;
pub use runtime::ExpectedArg;
pub use runtime::ExpectedCall;
pub use runtime::ExpectedExec;
pub use runtime::ExpectedPrepare;
pub use runtime::ExpectedQuery;
pub use runtime::FileEventSink;
pub use runtime::FnArgument;
pub use runtime::INVALIDATED_MARKER;
pub use runtime::KindArgument;
pub use runtime::MemoryEventSink;
pub use runtime::MockOptions;
pub use runtime::MockRegistry;
pub use runtime::NoopEventSink;
pub use runtime::NotEmptyArgument;
pub use runtime::OutputArg;
pub use runtime::OutputMode;
pub use runtime::PassthroughConverter;
pub use runtime::RawBytes;
pub use runtime::RegexpQueryMatcher;
pub use runtime::RegistryError;
pub use runtime::Row;
pub use runtime::RowSet;
pub use runtime::Rows;
pub use runtime::RowsError;
pub use runtime::Sqlmock;
pub use runtime::Statement;
pub use runtime::StderrEventSink;
pub use runtime::Transaction;
pub use runtime::ValueMismatch;
pub use runtime::any_arg;
pub use runtime::compare_value;
pub use runtime::input_output_arg;
pub use runtime::kind_of;
pub use runtime::match_arguments;
pub use runtime::match_fn;
pub use runtime::named;
pub use runtime::new;
pub use runtime::not_empty_arg;
pub use runtime::output_arg;
pub use runtime::typed_output_arg;
