// crates/dbmock-core/src/core/value.rs
// ============================================================================
// Module: dbmock Values
// Description: Canonical value model exchanged between callers and the mock.
// Purpose: Represent driver values, including kinds the default converter rejects.
// Dependencies: time
// ============================================================================

//! ## Overview
//! [`Value`] is the single representation for statement arguments and row
//! cells. The canonical driver kinds are null, bool, signed integer, float,
//! text, bytes and timestamp. `Uint` and `Custom` exist so callers can hand the
//! mock values a real driver would have to convert or reject; the configured
//! [`crate::ValueConverter`] decides what happens to them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Value Kinds
// ============================================================================

/// Concrete kind of a [`Value`].
///
/// # Invariants
/// - Labels returned by [`ValueKind::as_str`] are stable and unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Absent value.
    Null,
    /// Boolean.
    Bool,
    /// Signed 64-bit integer.
    Int,
    /// Unsigned 64-bit integer.
    Uint,
    /// 64-bit float.
    Float,
    /// UTF-8 text.
    Text,
    /// Byte string.
    Bytes,
    /// Timestamp with offset.
    Timestamp,
    /// Application-defined type.
    Custom,
}

impl ValueKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Null,
        Self::Bool,
        Self::Int,
        Self::Uint,
        Self::Float,
        Self::Text,
        Self::Bytes,
        Self::Timestamp,
        Self::Custom,
    ];

    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::Timestamp => "timestamp",
            Self::Custom => "custom",
        }
    }

    /// Parses a kind from its stable label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == label)
    }

    /// Returns true for the integer kinds, which compare across widths.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::Uint)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Custom Values
// ============================================================================

/// Value of an application-defined type.
///
/// The mock never interprets `repr`; only converters that pass the type
/// through by name let it reach the expectation engine unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomValue {
    /// Type name used for passthrough decisions and kind checks.
    type_name: String,
    /// Opaque textual representation.
    repr: String,
}

impl CustomValue {
    /// Creates a custom value.
    #[must_use]
    pub fn new(type_name: impl Into<String>, repr: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            repr: repr.into(),
        }
    }

    /// Returns the type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the opaque representation.
    #[must_use]
    pub fn repr(&self) -> &str {
        &self.repr
    }
}

// ============================================================================
// SECTION: Value
// ============================================================================

/// A value passed as a statement argument or stored in a row cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer of any width, widened to 64 bits.
    Int(i64),
    /// Unsigned 64-bit integer; not a canonical driver kind.
    Uint(u64),
    /// Float of any width, widened to 64 bits.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Date-time with offset.
    Timestamp(OffsetDateTime),
    /// Application-defined value; not a canonical driver kind.
    Custom(CustomValue),
}

impl Value {
    /// Returns the kind of the value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Uint(_) => ValueKind::Uint,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Timestamp(_) => ValueKind::Timestamp,
            Self::Custom(_) => ValueKind::Custom,
        }
    }

    /// Returns the label used for passthrough decisions: the custom type name
    /// for custom values, the kind label otherwise.
    #[must_use]
    pub fn type_label(&self) -> &str {
        match self {
            Self::Custom(custom) => custom.type_name(),
            other => other.kind().as_str(),
        }
    }

    /// Returns true when the value is SQL NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true when the value is the zero value of its kind.
    ///
    /// Booleans are never considered empty and NULL always is. Timestamps are
    /// empty at the Unix epoch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(_) => false,
            Self::Int(value) => *value == 0,
            Self::Uint(value) => *value == 0,
            Self::Float(value) => *value == 0.0,
            Self::Text(value) => value.is_empty(),
            Self::Bytes(value) => value.is_empty(),
            Self::Timestamp(value) => *value == OffsetDateTime::UNIX_EPOCH,
            Self::Custom(value) => value.repr().is_empty(),
        }
    }

    /// Returns the integer payload widened to `i128` for integer kinds.
    #[must_use]
    pub fn as_wide_integer(&self) -> Option<i128> {
        match self {
            Self::Int(value) => Some(i128::from(*value)),
            Self::Uint(value) => Some(i128::from(*value)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Uint(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Bytes(value) => match std::str::from_utf8(value) {
                Ok(text) => f.write_str(text),
                Err(_) => {
                    f.write_str("0x")?;
                    for byte in value {
                        write!(f, "{byte:02x}")?;
                    }
                    Ok(())
                }
            },
            Self::Timestamp(value) => write!(f, "{value}"),
            Self::Custom(value) => write!(f, "{}({})", value.type_name(), value.repr()),
        }
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Implements `From<$ty> for Value` for integer widths that fit in `i64`.
macro_rules! value_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

value_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Uint(u64::try_from(value).unwrap_or(u64::MAX))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl From<CustomValue> for Value {
    fn from(value: CustomValue) -> Self {
        Self::Custom(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
