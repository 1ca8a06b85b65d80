// crates/dbmock-core/src/runtime/mod.rs
// ============================================================================
// Module: dbmock Runtime
// Description: Expectation engine, row sets, connection facade, and registry.
// Purpose: Execute intercepted driver calls against declared expectations.
// Dependencies: crate::{core, interfaces}, regex, serde_json, tokio
// ============================================================================

//! ## Overview
//! Runtime modules implement matching, fabricated results, and the async
//! driver facade. Every facade call goes through the same engine so ordered,
//! unordered and concurrent use share one set of rules.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod comparator;
pub mod connection;
pub mod context;
pub mod converter;
pub mod engine;
pub mod error;
pub mod events;
pub mod expectation;
pub mod options;
pub mod query;
pub mod registry;
pub mod rows;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use comparator::AnyArgument;
pub use comparator::ArgPattern;
pub use comparator::ArgsCheck;
pub use comparator::ArgsSpec;
pub use comparator::ArgumentMismatch;
pub use comparator::ExpectedArg;
pub use comparator::FnArgument;
pub use comparator::KindArgument;
pub use comparator::NotEmptyArgument;
pub use comparator::OutputArg;
pub use comparator::OutputMode;
pub use comparator::ValueMismatch;
pub use comparator::any_arg;
pub use comparator::compare_value;
pub use comparator::input_output_arg;
pub use comparator::kind_of;
pub use comparator::match_arguments;
pub use comparator::match_fn;
pub use comparator::named;
pub use comparator::not_empty_arg;
pub use comparator::output_arg;
pub use comparator::typed_output_arg;
pub use connection::Connection;
pub use connection::Sqlmock;
pub use connection::Statement;
pub use connection::Transaction;
pub use connection::new;
pub use context::CancelHandle;
pub use context::Context;
pub use converter::DefaultConverter;
pub use converter::PassthroughConverter;
pub use error::DriverError;
pub use events::FileEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use expectation::ExpectedCall;
pub use expectation::ExpectedExec;
pub use expectation::ExpectedPrepare;
pub use expectation::ExpectedQuery;
pub use options::MockOptions;
pub use query::EqualQueryMatcher;
pub use query::RegexpQueryMatcher;
pub use registry::MockRegistry;
pub use registry::RegistryError;
pub use rows::Cell;
pub use rows::INVALIDATED_MARKER;
pub use rows::RawBytes;
pub use rows::Row;
pub use rows::RowSet;
pub use rows::Rows;
pub use rows::RowsError;
