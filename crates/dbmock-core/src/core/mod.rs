// crates/dbmock-core/src/core/mod.rs
// ============================================================================
// Module: dbmock Core Types
// Description: Values, columns, results, arguments, and events shared by every layer.
// Purpose: Provide the data model the engine and facade exchange.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Core types hold data only. Matching, conversion and row iteration live in
//! [`crate::runtime`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod args;
pub mod call;
pub mod column;
pub mod error;
pub mod event;
pub mod result;
pub mod sql;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use args::NamedValue;
pub use args::OutParam;
pub use args::Params;
pub use call::ExpectationKind;
pub use column::Column;
pub use error::ProgrammedError;
pub use event::EventOutcome;
pub use event::MockEvent;
pub use event::MockEventParams;
pub use result::ExecResult;
pub use sql::normalize_sql;
pub use value::CustomValue;
pub use value::Value;
pub use value::ValueKind;
