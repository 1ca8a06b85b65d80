// crates/dbmock-core/src/runtime/rows.rs
// ============================================================================
// Module: dbmock Fabricated Rows
// Description: Row set builder and the iterator handed to code under test.
// Purpose: Replay declared rows with real-driver buffer reuse semantics.
// Dependencies: crate::core, crate::interfaces, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`Rows`] is the declaration-side builder: columns, values, per-row errors
//! and a close error. Values are converted when added, so a row reads back
//! exactly as the converter produced it. Rows can also be built from
//! serializable records: each record's fields become the cells of one row.
//!
//! [`RowSet`] is what a query returns. It walks one or more [`Rows`] batches
//! and hands out non-empty byte cells as [`RawBytes`] buffers. Like a real
//! driver's reused read buffer, those buffers are only valid until the next
//! advance, batch switch, or close; after that their content is overwritten
//! with a fixed marker so code that kept them sees garbage instead of data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::core::Column;
use crate::core::ProgrammedError;
use crate::core::Value;
use crate::interfaces::ConversionError;
use crate::interfaces::ValueConverter;
use crate::runtime::converter::DefaultConverter;
use crate::runtime::error::DriverError;
use crate::runtime::expectation::Expectation;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Marker repeated over invalidated raw buffers.
pub const INVALIDATED_MARKER: &str = "☠☠☠ MEMORY OVERWRITTEN ☠☠☠ ";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while building a row batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowsError {
    /// A row has a different number of values than there are columns.
    #[error(
        "expected number of values to match number of columns: row #{row} has {actual} values for {expected} columns"
    )]
    Arity {
        /// Zero-based row index.
        row: usize,
        /// Column count.
        expected: usize,
        /// Value count.
        actual: usize,
    },
    /// A value could not be converted.
    #[error("row #{row}, column #{column} (\"{name}\") type {kind}: {reason}")]
    Conversion {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        column: usize,
        /// Column name.
        name: String,
        /// Type label of the rejected value.
        kind: String,
        /// Converter diagnostic.
        reason: ConversionError,
    },
    /// A CSV line could not be parsed.
    #[error("csv line {line}: {reason}")]
    Csv {
        /// One-based line number.
        line: usize,
        /// Parse diagnostic.
        reason: String,
    },
    /// Columns cannot be derived from an empty record list.
    #[error("at least one record is required to derive columns")]
    NoRecords,
    /// A record could not be serialized.
    #[error("record #{row} could not be serialized: {reason}")]
    Serialize {
        /// Zero-based record index.
        row: usize,
        /// Serializer diagnostic.
        reason: String,
    },
    /// A record did not serialize to a map of fields.
    #[error("record #{row} is not a struct or map")]
    NotARecord {
        /// Zero-based record index.
        row: usize,
    },
    /// A record lacks a field for a column.
    #[error("record #{row} has no field for column \"{column}\"")]
    MissingField {
        /// Zero-based record index.
        row: usize,
        /// Column name.
        column: String,
    },
}

// ============================================================================
// SECTION: Rows Builder
// ============================================================================

/// Declared batch of rows returned by a query expectation.
#[derive(Debug, Clone)]
pub struct Rows {
    /// Column definitions.
    columns: Vec<Column>,
    /// Converted row values.
    values: Vec<Vec<Value>>,
    /// Errors surfaced when the row at the index is reached.
    row_errors: BTreeMap<usize, ProgrammedError>,
    /// Error returned by close before the batch was exhausted.
    close_error: Option<ProgrammedError>,
    /// Converter applied to added values.
    converter: Arc<dyn ValueConverter>,
}

impl Rows {
    /// Creates an empty batch with named columns and the default converter.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_columns(columns.into_iter().map(Column::new).collect())
    }

    /// Creates an empty batch with full column definitions.
    #[must_use]
    pub fn with_columns(columns: Vec<Column>) -> Self {
        Self {
            columns,
            values: Vec::new(),
            row_errors: BTreeMap::new(),
            close_error: None,
            converter: Arc::new(DefaultConverter),
        }
    }

    /// Replaces the converter used for subsequently added rows.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn ValueConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Appends a row.
    ///
    /// # Panics
    ///
    /// Panics when the value count differs from the column count or a value
    /// cannot be converted. Use [`Rows::try_add_row`] to handle these cases.
    #[must_use]
    #[allow(clippy::panic, reason = "Malformed fixture rows are a test authoring error.")]
    pub fn add_row(mut self, values: Vec<Value>) -> Self {
        if let Err(err) = self.try_add_row(values) {
            panic!("{err}");
        }
        self
    }

    /// Appends several rows.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`Rows::add_row`].
    #[must_use]
    pub fn add_rows(self, rows: Vec<Vec<Value>>) -> Self {
        rows.into_iter().fold(self, Self::add_row)
    }

    /// Appends a row, reporting malformed input instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`RowsError`] when the value count differs from the column
    /// count or a value cannot be converted. The batch is left unchanged.
    pub fn try_add_row(&mut self, values: Vec<Value>) -> Result<(), RowsError> {
        let row = self.values.len();
        if values.len() != self.columns.len() {
            return Err(RowsError::Arity {
                row,
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        let mut converted = Vec::with_capacity(values.len());
        for (column, value) in values.into_iter().enumerate() {
            let kind = value.type_label().to_string();
            let value = self.converter.convert(value).map_err(|reason| RowsError::Conversion {
                row,
                column,
                name: self.columns[column].name().to_string(),
                kind,
                reason,
            })?;
            converted.push(value);
        }
        self.values.push(converted);
        Ok(())
    }

    /// Appends rows parsed from comma-separated text.
    ///
    /// Each non-blank line is one row. Cells are trimmed; a cell reading
    /// `null` in any case becomes NULL and every other cell becomes bytes.
    /// Double-quoted cells may contain commas and `""` escapes.
    ///
    /// # Panics
    ///
    /// Panics when a line is malformed or has the wrong number of cells.
    #[must_use]
    #[allow(clippy::panic, reason = "Malformed fixture rows are a test authoring error.")]
    pub fn from_csv_str(mut self, csv: &str) -> Self {
        if let Err(err) = self.try_from_csv_str(csv) {
            panic!("{err}");
        }
        self
    }

    /// Appends rows parsed from comma-separated text without panicking.
    ///
    /// # Errors
    ///
    /// Returns [`RowsError`] for malformed lines or wrong cell counts. Rows
    /// parsed before the failing line remain appended.
    pub fn try_from_csv_str(&mut self, csv: &str) -> Result<(), RowsError> {
        for (index, line) in csv.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let cells = split_csv_line(line).map_err(|reason| RowsError::Csv {
                line: index + 1,
                reason,
            })?;
            let values = cells
                .into_iter()
                .map(|cell| {
                    if cell.eq_ignore_ascii_case("null") {
                        Value::Null
                    } else {
                        Value::Bytes(cell.into_bytes())
                    }
                })
                .collect();
            self.try_add_row(values)?;
        }
        Ok(())
    }

    /// Creates a batch from serializable records with the default converter.
    ///
    /// Column names are the first record's field names in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`RowsError::NoRecords`] for an empty slice, or any error of
    /// [`Rows::try_add_records`].
    pub fn from_records<T: Serialize>(records: &[T]) -> Result<Self, RowsError> {
        Self::from_records_with_converter(records, Arc::new(DefaultConverter))
    }

    /// Creates a batch from serializable records using `converter`.
    pub(crate) fn from_records_with_converter<T: Serialize>(
        records: &[T],
        converter: Arc<dyn ValueConverter>,
    ) -> Result<Self, RowsError> {
        let first = records.first().ok_or(RowsError::NoRecords)?;
        let columns = record_fields(0, first)?.into_iter().map(|(name, _)| name);
        let mut rows = Self::new(columns).with_converter(converter);
        rows.try_add_records(records)?;
        Ok(rows)
    }

    /// Appends one row per record, taking each column from the field of the same name.
    ///
    /// Fields without a column are ignored. Numbers become integers when they
    /// fit, strings become text, and nested arrays or maps become JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`RowsError`] when a record is not a struct or map, lacks a
    /// column's field, or yields a value the converter rejects. Records
    /// before the failing one remain appended.
    pub fn try_add_records<T: Serialize>(&mut self, records: &[T]) -> Result<(), RowsError> {
        for record in records {
            let row = self.values.len();
            let fields = record_fields(row, record)?;
            let values = self
                .columns
                .iter()
                .map(|column| {
                    fields.get(column.name()).cloned().map(json_to_value).ok_or_else(|| {
                        RowsError::MissingField {
                            row,
                            column: column.name().to_string(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            self.try_add_row(values)?;
        }
        Ok(())
    }

    /// Makes reaching row `index` of this batch fail with `error`.
    #[must_use]
    pub fn row_error(mut self, index: usize, error: impl Into<ProgrammedError>) -> Self {
        self.row_errors.insert(index, error.into());
        self
    }

    /// Makes close fail with `error` unless the last row of the last batch was passed.
    #[must_use]
    pub fn close_error(mut self, error: impl Into<ProgrammedError>) -> Self {
        self.close_error = Some(error.into());
        self
    }

    /// Returns the column definitions.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the converted values of row `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.values.get(index).map(Vec::as_slice)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the batch has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Splits one CSV line into trimmed cells.
fn split_csv_line(line: &str) -> Result<Vec<String>, String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut was_quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if current.trim().is_empty() && !was_quoted => {
                current.clear();
                quoted = true;
                was_quoted = true;
            }
            ',' if !quoted => {
                cells.push(finish_cell(&current, was_quoted));
                current.clear();
                was_quoted = false;
            }
            other => current.push(other),
        }
    }
    if quoted {
        return Err("unterminated quoted field".to_string());
    }
    cells.push(finish_cell(&current, was_quoted));
    Ok(cells)
}

/// Trims an unquoted cell; quoted cells keep their inner whitespace.
fn finish_cell(cell: &str, was_quoted: bool) -> String {
    if was_quoted { cell.trim_end().to_string() } else { cell.trim().to_string() }
}

/// Serializes `record` and returns its fields in declaration order.
fn record_fields<T: Serialize>(
    row: usize,
    record: &T,
) -> Result<Map<String, JsonValue>, RowsError> {
    match serde_json::to_value(record) {
        Ok(JsonValue::Object(fields)) => Ok(fields),
        Ok(_) => Err(RowsError::NotARecord {
            row,
        }),
        Err(err) => Err(RowsError::Serialize {
            row,
            reason: err.to_string(),
        }),
    }
}

/// Maps a serialized field onto a driver value.
fn json_to_value(value: JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(flag) => Value::Bool(flag),
        JsonValue::Number(number) => number
            .as_i64()
            .map(Value::Int)
            .or_else(|| number.as_u64().map(Value::Uint))
            .or_else(|| number.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        JsonValue::String(text) => Value::Text(text),
        nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => Value::Text(nested.to_string()),
    }
}

/// Formats a row of values for descriptions.
pub(crate) fn format_values(values: &[Value]) -> String {
    let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(" "))
}

/// Describes a list of batches for expectation descriptions.
pub(crate) fn describe_batches(batches: &[Rows]) -> String {
    if batches.iter().all(Rows::is_empty) {
        return "with empty rows".to_string();
    }
    let mut out = String::from("should return rows:");
    if let [single] = batches {
        for (index, row) in single.values.iter().enumerate() {
            out.push_str(&format!("\n    row {index} - {}", format_values(row)));
        }
        return out;
    }
    for (set, batch) in batches.iter().enumerate() {
        out.push_str(&format!("\n    result set: {set}"));
        for (index, row) in batch.values.iter().enumerate() {
            out.push_str(&format!("\n      row {index} - {}", format_values(row)));
        }
    }
    out
}

// ============================================================================
// SECTION: Raw Buffers
// ============================================================================

/// Byte buffer valid only until the owning row set moves on.
#[derive(Clone)]
pub struct RawBytes {
    /// Shared buffer overwritten on invalidation.
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl RawBytes {
    /// Copies `bytes` into a fresh tracked buffer.
    fn copy_of(bytes: &[u8]) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(bytes.to_vec())),
        }
    }

    /// Returns a copy of the current buffer content.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the buffer length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true when the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrites the buffer with the repeating invalidation marker.
    fn invalidate(&self) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let marker = INVALIDATED_MARKER.as_bytes();
        for (slot, byte) in buffer.iter_mut().zip(marker.iter().cycle()) {
            *slot = *byte;
        }
    }
}

impl fmt::Debug for RawBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawBytes").field(&self.to_vec()).finish()
    }
}

impl PartialEq<[u8]> for RawBytes {
    fn eq(&self, other: &[u8]) -> bool {
        self.to_vec() == other
    }
}

impl PartialEq<&[u8]> for RawBytes {
    fn eq(&self, other: &&[u8]) -> bool {
        self.to_vec() == *other
    }
}

// ============================================================================
// SECTION: Delivered Rows
// ============================================================================

/// One delivered cell.
#[derive(Debug, Clone)]
pub enum Cell {
    /// Owned value.
    Value(Value),
    /// Borrowed-buffer bytes, invalidated when the row set moves on.
    Raw(RawBytes),
}

impl Cell {
    /// Returns an owned value, copying raw bytes as they are now.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Raw(raw) => Value::Bytes(raw.to_vec()),
        }
    }

    /// Returns the raw buffer for byte cells.
    #[must_use]
    pub const fn as_raw(&self) -> Option<&RawBytes> {
        match self {
            Self::Raw(raw) => Some(raw),
            Self::Value(_) => None,
        }
    }
}

/// One delivered row.
#[derive(Debug, Clone)]
pub struct Row {
    /// Cells in column order.
    cells: Vec<Cell>,
}

impl Row {
    /// Returns the cells.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns cell `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Returns owned copies of every cell.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.cells.iter().map(Cell::to_value).collect()
    }

    /// Returns the number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true when the row has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ============================================================================
// SECTION: Row Set
// ============================================================================

/// Iterator over the batches returned by a matched query.
#[derive(Debug)]
pub struct RowSet {
    /// Batches in delivery order; never empty.
    batches: Vec<Rows>,
    /// Index of the current batch.
    batch: usize,
    /// Number of rows consumed from the current batch.
    consumed: usize,
    /// Buffers handed out since the last advance.
    raw: Vec<RawBytes>,
    /// Whether the current batch was read to its end.
    exhausted: bool,
    /// Row error that stopped iteration of the current batch.
    failed: Option<DriverError>,
    /// Whether close was called.
    closed: bool,
    /// Expectation notified on close.
    expectation: Option<Arc<Expectation>>,
}

impl RowSet {
    /// Creates a row set over declared batches.
    pub(crate) fn new(batches: Vec<Rows>, expectation: Option<Arc<Expectation>>) -> Self {
        let batches =
            if batches.is_empty() { vec![Rows::new(Vec::<String>::new())] } else { batches };
        Self {
            batches,
            batch: 0,
            consumed: 0,
            raw: Vec::new(),
            exhausted: false,
            failed: None,
            closed: false,
            expectation,
        }
    }

    /// Returns the current batch.
    fn current(&self) -> &Rows {
        &self.batches[self.batch.min(self.batches.len() - 1)]
    }

    /// Returns the column names of the current batch.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.current().columns.iter().map(Column::name).collect()
    }

    /// Returns the column definitions of the current batch.
    #[must_use]
    pub fn column_types(&self) -> &[Column] {
        &self.current().columns
    }

    /// Advances to the next row of the current batch.
    ///
    /// Returns `Ok(None)` at the end of the batch and after a row error. Raw
    /// buffers from the previous row are invalidated first.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::RowsClosed`] after close, or the programmed row
    /// error when the row carrying it is reached.
    pub fn next_row(&mut self) -> Result<Option<Row>, DriverError> {
        if self.closed {
            return Err(DriverError::RowsClosed);
        }
        self.invalidate_raw();
        if self.failed.is_some() {
            return Ok(None);
        }
        let index = self.consumed;
        let Some(values) = self.current().values.get(index).cloned() else {
            self.exhausted = true;
            return Ok(None);
        };
        self.consumed += 1;
        if let Some(error) = self.current().row_errors.get(&index) {
            let error = DriverError::Programmed(error.clone());
            self.failed = Some(error.clone());
            return Err(error);
        }
        let cells = values
            .into_iter()
            .map(|value| match value {
                Value::Bytes(bytes) if !bytes.is_empty() => {
                    let raw = RawBytes::copy_of(&bytes);
                    self.raw.push(raw.clone());
                    Cell::Raw(raw)
                }
                other => Cell::Value(other),
            })
            .collect();
        Ok(Some(Row {
            cells,
        }))
    }

    /// Returns the error that stopped iteration, if any.
    #[must_use]
    pub const fn err(&self) -> Option<&DriverError> {
        self.failed.as_ref()
    }

    /// Returns true when another batch follows the current one.
    #[must_use]
    pub fn has_next_result_set(&self) -> bool {
        self.batch + 1 < self.batches.len()
    }

    /// Moves to the next batch; returns false when there is none.
    pub fn next_result_set(&mut self) -> bool {
        if self.closed || !self.has_next_result_set() {
            return false;
        }
        self.invalidate_raw();
        self.batch += 1;
        self.consumed = 0;
        self.exhausted = false;
        self.failed = None;
        true
    }

    /// Reads every remaining row of the current batch as owned values.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by [`RowSet::next_row`].
    pub fn collect_values(&mut self) -> Result<Vec<Vec<Value>>, DriverError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row.values());
        }
        Ok(rows)
    }

    /// Closes the row set.
    ///
    /// Invalidates outstanding raw buffers and records the close on the
    /// originating expectation. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the current batch's close error unless the last row of the
    /// last batch was already passed.
    pub fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.invalidate_raw();
        self.closed = true;
        if let Some(expectation) = &self.expectation {
            expectation.mark_closed();
        }
        let natural_end = self.exhausted && !self.has_next_result_set();
        match &self.current().close_error {
            Some(error) if !natural_end => Err(DriverError::Programmed(error.clone())),
            _ => Ok(()),
        }
    }

    /// Returns true after close.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Overwrites and forgets every outstanding raw buffer.
    fn invalidate_raw(&mut self) {
        for raw in self.raw.drain(..) {
            raw.invalidate();
        }
    }
}
