// crates/dbmock-core/src/runtime/comparator.rs
// ============================================================================
// Module: dbmock Argument Comparator
// Description: Value matching and argument-list matching for expectations.
// Purpose: Decide whether actual call arguments satisfy declared arguments.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! Matching never panics: every comparison yields `Ok(())` or a diagnostic.
//! Integers compare numerically across widths and signedness, floats only
//! against floats, and text exactly. Every other kind matches any value of
//! the same kind. Declared literals pass through the mock's converter before
//! comparison so `u8` and `i64` declarations behave alike.
//!
//! Output declarations match only arguments carrying an [`crate::OutParam`].
//! Once the call succeeds, `write_outputs` stores each declared returned
//! value in the matching parameter.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;

use crate::core::CustomValue;
use crate::core::NamedValue;
use crate::core::Value;
use crate::core::ValueKind;
use crate::interfaces::ArgumentMatcher;
use crate::interfaces::ConversionError;
use crate::interfaces::ValueConverter;

// ============================================================================
// SECTION: Value Matching
// ============================================================================

/// Reason a declared value does not match an actual value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueMismatch {
    /// Values are of incomparable kinds.
    #[error("expected a value of kind {expected}, but got {actual}")]
    Kind {
        /// Declared kind.
        expected: ValueKind,
        /// Actual kind.
        actual: ValueKind,
    },
    /// Values are of the same kind but differ.
    #[error("expected [{kind} - {expected}] does not match actual [{kind} - {actual}]")]
    Differs {
        /// Kind of both values.
        kind: ValueKind,
        /// Rendered declared value.
        expected: String,
        /// Rendered actual value.
        actual: String,
    },
}

/// Compares a declared value with an actual value.
///
/// # Errors
///
/// Returns [`ValueMismatch`] when the values do not match.
pub fn compare_value(expected: &Value, actual: &Value) -> Result<(), ValueMismatch> {
    if let (Some(left), Some(right)) = (expected.as_wide_integer(), actual.as_wide_integer()) {
        return if left == right { Ok(()) } else { Err(differs(ValueKind::Int, expected, actual)) };
    }
    if expected.kind() != actual.kind() {
        return Err(ValueMismatch::Kind {
            expected: expected.kind(),
            actual: actual.kind(),
        });
    }
    let equal = match (expected, actual) {
        (Value::Float(left), Value::Float(right)) => left == right,
        (Value::Text(left), Value::Text(right)) => left == right,
        _ => true,
    };
    if equal { Ok(()) } else { Err(differs(expected.kind(), expected, actual)) }
}

/// Builds a [`ValueMismatch::Differs`] diagnostic.
fn differs(kind: ValueKind, expected: &Value, actual: &Value) -> ValueMismatch {
    ValueMismatch::Differs {
        kind,
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

// ============================================================================
// SECTION: Built-In Matchers
// ============================================================================

/// Accepts every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyArgument;

impl ArgumentMatcher for AnyArgument {
    fn matches(&self, _value: &Value) -> bool {
        true
    }

    fn describe(&self) -> String {
        "any value".to_string()
    }
}

/// Accepts values that are not the zero value of their kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotEmptyArgument;

impl ArgumentMatcher for NotEmptyArgument {
    fn matches(&self, value: &Value) -> bool {
        !value.is_empty()
    }

    fn describe(&self) -> String {
        "any non-empty value".to_string()
    }
}

/// Accepts any value of one concrete kind, and one custom type when set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindArgument {
    /// Accepted kind.
    kind: ValueKind,
    /// Accepted custom type name for the custom kind.
    type_name: Option<String>,
}

impl KindArgument {
    /// Creates a matcher accepting values of the same concrete type as `sample`.
    #[must_use]
    pub fn of(sample: &Value) -> Self {
        Self {
            kind: sample.kind(),
            type_name: match sample {
                Value::Custom(custom) => Some(custom.type_name().to_string()),
                _ => None,
            },
        }
    }
}

impl ArgumentMatcher for KindArgument {
    fn matches(&self, value: &Value) -> bool {
        if value.kind() != self.kind {
            return false;
        }
        match (&self.type_name, value) {
            (Some(expected), Value::Custom(custom)) => custom.type_name() == expected,
            _ => true,
        }
    }

    fn describe(&self) -> String {
        match &self.type_name {
            Some(type_name) => format!("any {type_name} value"),
            None => format!("any {} value", self.kind),
        }
    }
}

/// Accepts values approved by a closure.
pub struct FnArgument<F> {
    /// Label shown in expectation descriptions.
    label: String,
    /// Predicate deciding acceptance.
    predicate: F,
}

impl<F> FnArgument<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    /// Creates a closure-backed matcher.
    pub fn new(label: impl Into<String>, predicate: F) -> Self {
        Self {
            label: label.into(),
            predicate,
        }
    }
}

impl<F> fmt::Debug for FnArgument<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnArgument").field("label", &self.label).finish_non_exhaustive()
    }
}

impl<F> ArgumentMatcher for FnArgument<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn matches(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

// ============================================================================
// SECTION: Expected Arguments
// ============================================================================

/// How a declared output parameter selects the actual argument.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMode {
    /// Any output-only parameter.
    Output,
    /// An input/output parameter whose input equals the value.
    InputOutput(Value),
    /// An output-only parameter declared with the returned value's kind.
    Typed,
}

/// Declared output parameter and the value written back on success.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArg {
    /// Selection rule.
    mode: OutputMode,
    /// Value stored in the caller's parameter.
    returned: Value,
}

impl OutputArg {
    /// Returns the selection rule.
    #[must_use]
    pub const fn mode(&self) -> &OutputMode {
        &self.mode
    }

    /// Returns the value written back.
    #[must_use]
    pub const fn returned(&self) -> &Value {
        &self.returned
    }

    /// Checks an actual argument, converting the declared input first.
    fn accepts(
        &self,
        actual: &NamedValue,
        converter: &dyn ValueConverter,
    ) -> Result<bool, ConversionError> {
        let Some(out) = &actual.out else {
            return Ok(false);
        };
        Ok(match &self.mode {
            OutputMode::Output => !out.is_input(),
            OutputMode::Typed => !out.is_input() && out.kind() == Some(self.returned.kind()),
            OutputMode::InputOutput(expected) => {
                out.is_input() && converter.convert(expected.clone())? == actual.value
            }
        })
    }

    /// Returns the label used in diagnostics.
    fn describe(&self) -> String {
        match &self.mode {
            OutputMode::Output => format!("output parameter returning {}", self.returned),
            OutputMode::Typed => format!(
                "{} output parameter returning {}",
                self.returned.kind(),
                self.returned
            ),
            OutputMode::InputOutput(input) => {
                format!("input/output parameter with input {input} returning {}", self.returned)
            }
        }
    }
}

/// What a declared argument compares against.
#[derive(Debug, Clone)]
pub enum ArgPattern {
    /// Literal value compared with [`compare_value`].
    Value(Value),
    /// Matcher object that decides on its own.
    Matcher(Arc<dyn ArgumentMatcher>),
    /// Output parameter receiving a value.
    Output(OutputArg),
}

/// One declared argument of an expectation.
#[derive(Debug, Clone)]
pub struct ExpectedArg {
    /// Name the actual argument must carry, if any.
    name: Option<String>,
    /// Value or matcher the actual argument must satisfy.
    pattern: ArgPattern,
}

impl ExpectedArg {
    /// Declares a literal value.
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            pattern: ArgPattern::Value(value.into()),
        }
    }

    /// Declares a matcher object.
    #[must_use]
    pub fn matcher(matcher: impl ArgumentMatcher + 'static) -> Self {
        Self {
            name: None,
            pattern: ArgPattern::Matcher(Arc::new(matcher)),
        }
    }

    /// Requires the actual argument to carry `name`.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the declared name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the declared pattern.
    #[must_use]
    pub const fn pattern(&self) -> &ArgPattern {
        &self.pattern
    }
}

impl fmt::Display for ExpectedArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}=")?;
        }
        match &self.pattern {
            ArgPattern::Value(value) => write!(f, "{value}"),
            ArgPattern::Matcher(matcher) => write!(f, "<{}>", matcher.describe()),
            ArgPattern::Output(output) => write!(f, "<{}>", output.describe()),
        }
    }
}

/// Implements `From<$ty> for ExpectedArg` as a literal declaration.
macro_rules! expected_arg_from_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ExpectedArg {
                fn from(value: $ty) -> Self {
                    Self::value(value)
                }
            }
        )*
    };
}

expected_arg_from_value!(
    Value,
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    &str,
    String,
    &[u8],
    Vec<u8>,
    OffsetDateTime,
    CustomValue
);

/// Declares an argument that accepts any value.
#[must_use]
pub fn any_arg() -> ExpectedArg {
    ExpectedArg::matcher(AnyArgument)
}

/// Declares an argument that accepts any non-empty value.
#[must_use]
pub fn not_empty_arg() -> ExpectedArg {
    ExpectedArg::matcher(NotEmptyArgument)
}

/// Declares an argument that accepts any value of the same concrete type as `sample`.
#[must_use]
pub fn kind_of(sample: impl Into<Value>) -> ExpectedArg {
    ExpectedArg::matcher(KindArgument::of(&sample.into()))
}

/// Declares an argument accepted by a closure.
#[must_use]
pub fn match_fn<F>(label: impl Into<String>, predicate: F) -> ExpectedArg
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    ExpectedArg::matcher(FnArgument::new(label, predicate))
}

/// Declares a named output-only parameter that receives `returned`.
#[must_use]
pub fn output_arg(name: impl Into<String>, returned: impl Into<Value>) -> ExpectedArg {
    output(OutputMode::Output, returned.into()).with_name(name)
}

/// Declares a named input/output parameter sending `input` and receiving `returned`.
#[must_use]
pub fn input_output_arg(
    name: impl Into<String>,
    input: impl Into<Value>,
    returned: impl Into<Value>,
) -> ExpectedArg {
    output(OutputMode::InputOutput(input.into()), returned.into()).with_name(name)
}

/// Declares a positional output parameter of the same kind as `returned`.
#[must_use]
pub fn typed_output_arg(returned: impl Into<Value>) -> ExpectedArg {
    output(OutputMode::Typed, returned.into())
}

/// Builds an output declaration.
fn output(mode: OutputMode, returned: Value) -> ExpectedArg {
    ExpectedArg {
        name: None,
        pattern: ArgPattern::Output(OutputArg {
            mode,
            returned,
        }),
    }
}

/// Declares a named argument.
#[must_use]
pub fn named(name: impl Into<String>, arg: impl Into<ExpectedArg>) -> ExpectedArg {
    arg.into().with_name(name)
}

// ============================================================================
// SECTION: Argument Specification
// ============================================================================

/// Callback validating a whole argument list.
pub type ArgsCheck = Arc<dyn Fn(&[NamedValue]) -> Result<(), String> + Send + Sync>;

/// Argument constraint of an expectation.
#[derive(Clone, Default)]
pub enum ArgsSpec {
    /// Any argument list matches.
    #[default]
    Any,
    /// Only an empty argument list matches.
    Empty,
    /// Arguments must match the declared list position by position.
    List(Vec<ExpectedArg>),
    /// A callback decides.
    Check(ArgsCheck),
}

impl fmt::Debug for ArgsSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Empty => f.write_str("Empty"),
            Self::List(args) => f.debug_tuple("List").field(args).finish(),
            Self::Check(_) => f.write_str("Check(..)"),
        }
    }
}

/// Reason an actual argument list does not satisfy the declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentMismatch {
    /// Declared and actual argument counts differ.
    #[error("expected {expected} arguments, got {actual}")]
    Arity {
        /// Declared count.
        expected: usize,
        /// Actual count.
        actual: usize,
    },
    /// Arguments were supplied where none were allowed.
    #[error("expected no arguments, got {actual}")]
    Unexpected {
        /// Actual count.
        actual: usize,
    },
    /// The actual argument name differs from the declared name.
    #[error("named argument {position}: expected name \"{expected}\", got \"{actual}\"")]
    Name {
        /// Zero-based declared position.
        position: usize,
        /// Declared name.
        expected: String,
        /// Actual name, empty when unnamed.
        actual: String,
    },
    /// The actual argument ordinal differs from the declared position.
    #[error("argument {position}: expected ordinal {expected}, got {actual}")]
    Ordinal {
        /// Zero-based declared position.
        position: usize,
        /// Expected one-based ordinal.
        expected: usize,
        /// Actual ordinal.
        actual: usize,
    },
    /// A matcher object rejected the actual value.
    #[error("argument {position} does not satisfy {matcher}")]
    Rejected {
        /// Zero-based declared position.
        position: usize,
        /// Matcher label.
        matcher: String,
    },
    /// The declared literal could not be converted.
    #[error("argument {position}: declared value could not be converted: {source}")]
    Conversion {
        /// Zero-based declared position.
        position: usize,
        /// Conversion failure.
        source: ConversionError,
    },
    /// The declared literal does not match the actual value.
    #[error("argument {position}: {source}")]
    Value {
        /// Zero-based declared position.
        position: usize,
        /// Value mismatch detail.
        source: ValueMismatch,
    },
    /// A custom argument check rejected the list.
    #[error("argument check failed: {0}")]
    Check(String),
}

/// Matches an actual argument list against an argument specification.
///
/// # Errors
///
/// Returns [`ArgumentMismatch`] describing the first position that fails.
pub fn match_arguments(
    spec: &ArgsSpec,
    actual: &[NamedValue],
    converter: &dyn ValueConverter,
) -> Result<(), ArgumentMismatch> {
    match spec {
        ArgsSpec::Any => Ok(()),
        ArgsSpec::Empty => {
            if actual.is_empty() {
                Ok(())
            } else {
                Err(ArgumentMismatch::Unexpected {
                    actual: actual.len(),
                })
            }
        }
        ArgsSpec::Check(check) => check(actual).map_err(ArgumentMismatch::Check),
        ArgsSpec::List(declared) => match_list(declared, actual, converter),
    }
}

/// Matches a declared argument list position by position.
fn match_list(
    declared: &[ExpectedArg],
    actual: &[NamedValue],
    converter: &dyn ValueConverter,
) -> Result<(), ArgumentMismatch> {
    if declared.len() != actual.len() {
        return Err(ArgumentMismatch::Arity {
            expected: declared.len(),
            actual: actual.len(),
        });
    }
    for (position, (expected, actual)) in declared.iter().zip(actual).enumerate() {
        match &expected.name {
            Some(name) => {
                if actual.name.as_deref() != Some(name.as_str()) {
                    return Err(ArgumentMismatch::Name {
                        position,
                        expected: name.clone(),
                        actual: actual.name.clone().unwrap_or_default(),
                    });
                }
            }
            None => {
                if actual.ordinal != position + 1 {
                    return Err(ArgumentMismatch::Ordinal {
                        position,
                        expected: position + 1,
                        actual: actual.ordinal,
                    });
                }
            }
        }
        match &expected.pattern {
            ArgPattern::Matcher(matcher) => {
                if !matcher.matches(&actual.value) {
                    return Err(ArgumentMismatch::Rejected {
                        position,
                        matcher: matcher.describe(),
                    });
                }
            }
            ArgPattern::Output(output) => {
                let accepted = output.accepts(actual, converter).map_err(|source| {
                    ArgumentMismatch::Conversion {
                        position,
                        source,
                    }
                })?;
                if !accepted {
                    return Err(ArgumentMismatch::Rejected {
                        position,
                        matcher: output.describe(),
                    });
                }
            }
            ArgPattern::Value(value) => {
                let declared = converter.convert(value.clone()).map_err(|source| {
                    ArgumentMismatch::Conversion {
                        position,
                        source,
                    }
                })?;
                compare_value(&declared, &actual.value).map_err(|source| {
                    ArgumentMismatch::Value {
                        position,
                        source,
                    }
                })?;
            }
        }
    }
    Ok(())
}

/// Stores each declared returned value in its matched output parameter.
///
/// Only list declarations carry outputs; the list is assumed to have matched
/// `actual` position by position.
pub(crate) fn write_outputs(spec: &ArgsSpec, actual: &[NamedValue]) {
    let ArgsSpec::List(declared) = spec else {
        return;
    };
    for (expected, actual) in declared.iter().zip(actual) {
        if let (ArgPattern::Output(output), Some(out)) = (&expected.pattern, &actual.out) {
            out.set(output.returned.clone());
        }
    }
}
