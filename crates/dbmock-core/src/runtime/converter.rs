// crates/dbmock-core/src/runtime/converter.rs
// ============================================================================
// Module: dbmock Value Converters
// Description: Default and passthrough value canonicalization.
// Purpose: Turn caller values into driver values before matching and storage.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`DefaultConverter`] accepts the canonical driver kinds, narrows unsigned
//! integers that fit into the signed kind, and rejects everything else.
//! [`PassthroughConverter`] lets selected kinds or custom type names through
//! untouched and defers the rest to the default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::Value;
use crate::interfaces::ConversionError;
use crate::interfaces::ValueConverter;

// ============================================================================
// SECTION: Default Converter
// ============================================================================

/// Converter implementing the standard driver value rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl ValueConverter for DefaultConverter {
    fn convert(&self, value: Value) -> Result<Value, ConversionError> {
        match value {
            Value::Uint(raw) => {
                i64::try_from(raw).map(Value::Int).map_err(|_| ConversionError::UintOverflow(raw))
            }
            Value::Custom(custom) => {
                Err(ConversionError::Unsupported(custom.type_name().to_string()))
            }
            canonical => Ok(canonical),
        }
    }
}

// ============================================================================
// SECTION: Passthrough Converter
// ============================================================================

/// Converter passing selected kinds or custom types through unchanged.
///
/// Entries are matched against [`Value::type_label`], so both kind labels such
/// as `uint` and custom type names such as `geo.Point` are accepted.
#[derive(Debug, Clone, Default)]
pub struct PassthroughConverter {
    /// Type labels that bypass conversion.
    passthrough: BTreeSet<String>,
}

impl PassthroughConverter {
    /// Creates a converter passing the given type labels through.
    #[must_use]
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passthrough: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true when values with `label` bypass conversion.
    #[must_use]
    pub fn passes(&self, label: &str) -> bool {
        self.passthrough.contains(label)
    }
}

impl ValueConverter for PassthroughConverter {
    fn convert(&self, value: Value) -> Result<Value, ConversionError> {
        if self.passes(value.type_label()) {
            return Ok(value);
        }
        DefaultConverter.convert(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
