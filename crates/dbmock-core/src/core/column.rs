// crates/dbmock-core/src/core/column.rs
// ============================================================================
// Module: dbmock Column Definitions
// Description: Column metadata reported by fabricated row sets.
// Purpose: Describe names, database types, and scan kinds of result columns.
// Dependencies: crate::core::value
// ============================================================================

//! ## Overview
//! A [`Column`] carries the metadata a driver reports for a result column.
//! Columns built from a bare name report an empty database type name and a
//! NULL sample, which yields the `null` scan kind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::value::Value;
use crate::core::value::ValueKind;

// ============================================================================
// SECTION: Column
// ============================================================================

/// Result column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    name: String,
    /// Database type name (for example `VARCHAR`).
    db_type: String,
    /// Nullability when known.
    nullable: Option<bool>,
    /// Length when the type is variable-length.
    length: Option<i64>,
    /// Precision and scale when the type is decimal.
    precision_scale: Option<(i64, i64)>,
    /// Sample value whose kind is reported as the scan type.
    sample: Value,
}

impl Column {
    /// Creates a column with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_type: String::new(),
            nullable: None,
            length: None,
            precision_scale: None,
            sample: Value::Null,
        }
    }

    /// Creates a column with a database type name and a sample scan value.
    #[must_use]
    pub fn of_type(name: impl Into<String>, db_type: impl Into<String>, sample: Value) -> Self {
        Self {
            db_type: db_type.into(),
            sample,
            ..Self::new(name)
        }
    }

    /// Sets the nullability flag.
    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Sets the column length.
    #[must_use]
    pub const fn with_length(mut self, length: i64) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets decimal precision and scale.
    #[must_use]
    pub const fn with_precision_and_scale(mut self, precision: i64, scale: i64) -> Self {
        self.precision_scale = Some((precision, scale));
        self
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the database type name.
    #[must_use]
    pub fn db_type_name(&self) -> &str {
        &self.db_type
    }

    /// Returns the nullability when known.
    #[must_use]
    pub const fn is_nullable(&self) -> Option<bool> {
        self.nullable
    }

    /// Returns the length when known.
    #[must_use]
    pub const fn length(&self) -> Option<i64> {
        self.length
    }

    /// Returns precision and scale when known.
    #[must_use]
    pub const fn precision_scale(&self) -> Option<(i64, i64)> {
        self.precision_scale
    }

    /// Returns the kind a consumer should scan this column into.
    #[must_use]
    pub const fn scan_kind(&self) -> ValueKind {
        self.sample.kind()
    }
}
