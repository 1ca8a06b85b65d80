// crates/dbmock-core/src/core/args.rs
// ============================================================================
// Module: dbmock Call Arguments
// Description: Actual arguments supplied by code under test.
// Purpose: Carry positional and named arguments with their ordinals.
// Dependencies: crate::core::value
// ============================================================================

//! ## Overview
//! Every actual argument has a one-based ordinal and an optional name.
//! [`Params`] is what the connection facade accepts; positional value lists
//! convert into it directly.
//!
//! An argument built around an [`OutParam`] is an output parameter: the
//! mock writes the value the matched expectation returns into the shared
//! slot, where the caller reads it after the call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::core::value::Value;
use crate::core::value::ValueKind;

// ============================================================================
// SECTION: Output Parameters
// ============================================================================

/// Caller-owned destination of an output parameter.
///
/// Clones share one slot, so the copy passed to a call and the copy kept by
/// the caller observe the same written value.
#[derive(Clone)]
pub struct OutParam {
    /// Current destination value.
    slot: Arc<Mutex<Value>>,
    /// Whether the destination value is also sent as input.
    input: bool,
    /// Declared destination kind for typed parameters.
    kind: Option<ValueKind>,
}

impl OutParam {
    /// Creates an output-only parameter with a NULL destination.
    #[must_use]
    pub fn output() -> Self {
        Self::build(Value::Null, false, None)
    }

    /// Creates a parameter that sends `value` and receives the output.
    #[must_use]
    pub fn input_output(value: impl Into<Value>) -> Self {
        Self::build(value.into(), true, None)
    }

    /// Creates an output-only parameter that receives a value of `kind`.
    #[must_use]
    pub fn typed(kind: ValueKind) -> Self {
        Self::build(Value::Null, false, Some(kind))
    }

    /// Shared constructor.
    fn build(value: Value, input: bool, kind: Option<ValueKind>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(value)),
            input,
            kind,
        }
    }

    /// Returns the current destination value.
    #[must_use]
    pub fn value(&self) -> Value {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the destination value.
    pub fn set(&self, value: Value) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Returns true when the destination value is also an input.
    #[must_use]
    pub const fn is_input(&self) -> bool {
        self.input
    }

    /// Returns the declared destination kind of a typed parameter.
    #[must_use]
    pub const fn kind(&self) -> Option<ValueKind> {
        self.kind
    }
}

impl fmt::Debug for OutParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutParam")
            .field("value", &self.value())
            .field("input", &self.input)
            .field("kind", &self.kind)
            .finish()
    }
}

impl PartialEq for OutParam {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

// ============================================================================
// SECTION: Named Value
// ============================================================================

/// One actual argument of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    /// Argument name for named parameters.
    pub name: Option<String>,
    /// One-based position of the argument.
    pub ordinal: usize,
    /// Argument value; the input value of an output parameter.
    pub value: Value,
    /// Destination of an output parameter.
    pub out: Option<OutParam>,
}

impl NamedValue {
    /// Creates a positional argument.
    #[must_use]
    pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: None,
            ordinal,
            value: value.into(),
            out: None,
        }
    }

    /// Creates a named argument.
    #[must_use]
    pub fn named(name: impl Into<String>, ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            ordinal,
            value: value.into(),
            out: None,
        }
    }

    /// Creates a positional output parameter writing into `out`.
    #[must_use]
    pub fn output(ordinal: usize, out: &OutParam) -> Self {
        Self {
            name: None,
            ordinal,
            value: if out.is_input() { out.value() } else { Value::Null },
            out: Some(out.clone()),
        }
    }

    /// Creates a named output parameter writing into `out`.
    #[must_use]
    pub fn named_output(name: impl Into<String>, ordinal: usize, out: &OutParam) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::output(ordinal, out)
        }
    }
}

impl fmt::Display for NamedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}=")?;
        }
        match &self.out {
            Some(_) => write!(f, "OUT({})", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

// ============================================================================
// SECTION: Params
// ============================================================================

/// Argument list of a single call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<NamedValue>);

impl Params {
    /// Creates an empty argument list.
    #[must_use]
    pub const fn none() -> Self {
        Self(Vec::new())
    }

    /// Returns the arguments.
    #[must_use]
    pub fn as_slice(&self) -> &[NamedValue] {
        &self.0
    }

    /// Consumes the list and returns the arguments.
    #[must_use]
    pub fn into_inner(self) -> Vec<NamedValue> {
        self.0
    }
}

impl From<Vec<NamedValue>> for Params {
    fn from(values: Vec<NamedValue>) -> Self {
        Self(values)
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self(
            values
                .into_iter()
                .enumerate()
                .map(|(index, value)| NamedValue::positional(index + 1, value))
                .collect(),
        )
    }
}

impl<const N: usize> From<[Value; N]> for Params {
    fn from(values: [Value; N]) -> Self {
        Self::from(Vec::from(values))
    }
}

impl From<()> for Params {
    fn from((): ()) -> Self {
        Self::none()
    }
}

/// Formats an argument list the way call descriptions render it.
pub(crate) fn format_params(values: &[NamedValue]) -> String {
    let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}
