//! Generic, dynamically-typed rows and their JSON encoding.
//!
//! Column types are only known once a query has run, so every cell is held as a
//! [`CellValue`]. The column names of one query are shared by all of its
//! [`Record`]s, which keeps the keys of every record identical and in query order.

use crate::error::{QueryError, Result};
use mysql_async::consts::ColumnType;
use mysql_async::{Column, Value};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// A single scalar cell of a materialized row.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

// Largest magnitude below which every whole f64 is an exact i64 (2^53).
const EXACT_WHOLE_FLOAT: f64 = 9_007_199_254_740_992.0;

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_unit(),
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::UInt(u) => serializer.serialize_u64(*u),
            // Whole numbers print as `1`, not `1.0`.
            CellValue::Float(f) if f.fract() == 0.0 && f.abs() < EXACT_WHOLE_FLOAT => {
                serializer.serialize_i64(*f as i64)
            }
            CellValue::Float(f) => serializer.serialize_f64(*f),
            CellValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Conversion without column metadata. Temporal values fall back to the
/// shortest text form that keeps every non-zero field.
impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::NULL => CellValue::Null,
            // Text and blob columns come back as raw bytes.
            Value::Bytes(bytes) => CellValue::Text(decode_text(bytes)),
            Value::Int(i) => CellValue::Int(i),
            Value::UInt(u) => CellValue::UInt(u),
            Value::Float(f) => CellValue::Float(widen_f32(f)),
            Value::Double(d) => CellValue::Float(d),
            Value::Date(year, month, day, hour, minute, second, micros) => {
                if hour == 0 && minute == 0 && second == 0 && micros == 0 {
                    CellValue::Text(format_date(year, month, day))
                } else {
                    CellValue::Text(format_datetime(
                        (year, month, day),
                        (hour, minute, second),
                        micros,
                        if micros == 0 { 0 } else { 6 },
                    ))
                }
            }
            Value::Time(negative, days, hours, minutes, seconds, micros) => {
                CellValue::Text(format_time(
                    negative,
                    (days, hours, minutes, seconds),
                    micros,
                    if micros == 0 { 0 } else { 6 },
                ))
            }
        }
    }
}

/// How a column's values are rendered, derived from the result metadata.
///
/// The binary protocol sends `DATETIME` values at midnight in the same short
/// form as `DATE`, and never says how many fractional digits a column has, so
/// both are taken from the column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnFormat {
    #[default]
    Plain,
    Date,
    DateTime {
        decimals: u8,
    },
    Time {
        decimals: u8,
    },
}

impl ColumnFormat {
    pub fn for_column(column_type: ColumnType, decimals: u8) -> ColumnFormat {
        let decimals = decimals.min(6);
        match column_type {
            ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => ColumnFormat::Date,
            ColumnType::MYSQL_TYPE_DATETIME
            | ColumnType::MYSQL_TYPE_DATETIME2
            | ColumnType::MYSQL_TYPE_TIMESTAMP
            | ColumnType::MYSQL_TYPE_TIMESTAMP2 => ColumnFormat::DateTime { decimals },
            ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => {
                ColumnFormat::Time { decimals }
            }
            _ => ColumnFormat::Plain,
        }
    }

    pub fn cell(self, value: Value) -> CellValue {
        match (self, value) {
            (ColumnFormat::Date, Value::Date(year, month, day, ..)) => {
                CellValue::Text(format_date(year, month, day))
            }
            (
                ColumnFormat::DateTime { decimals },
                Value::Date(year, month, day, hour, minute, second, micros),
            ) => CellValue::Text(format_datetime(
                (year, month, day),
                (hour, minute, second),
                micros,
                decimals,
            )),
            (
                ColumnFormat::Time { decimals },
                Value::Time(negative, days, hours, minutes, seconds, micros),
            ) => CellValue::Text(format_time(
                negative,
                (days, hours, minutes, seconds),
                micros,
                decimals,
            )),
            (_, value) => CellValue::from(value),
        }
    }
}

/// Name and rendering of one result column, shared by every row of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub format: ColumnFormat,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            format: ColumnFormat::Plain,
        }
    }

    pub fn with_format(mut self, format: ColumnFormat) -> ColumnDescriptor {
        self.format = format;
        self
    }

    pub fn from_column(column: &Column) -> ColumnDescriptor {
        ColumnDescriptor::new(column.name_str().into_owned())
            .with_format(ColumnFormat::for_column(column.column_type(), column.decimals()))
    }
}

fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

// `0.1f32 as f64` prints as 0.10000000149011612; go through the shortest
// decimal form instead.
fn widen_f32(f: f32) -> f64 {
    f.to_string().parse().unwrap_or(f64::from(f))
}

fn format_date(year: u16, month: u8, day: u8) -> String {
    format!("{:04}-{:02}-{:02}", year, month, day)
}

fn format_datetime(
    (year, month, day): (u16, u8, u8),
    (hour, minute, second): (u8, u8, u8),
    micros: u32,
    decimals: u8,
) -> String {
    format!(
        "{} {:02}:{:02}:{:02}{}",
        format_date(year, month, day),
        hour,
        minute,
        second,
        fraction(micros, decimals)
    )
}

fn format_time(
    negative: bool,
    (days, hours, minutes, seconds): (u32, u8, u8, u8),
    micros: u32,
    decimals: u8,
) -> String {
    let total_hours = u64::from(days) * 24 + u64::from(hours);
    format!(
        "{}{:02}:{:02}:{:02}{}",
        if negative { "-" } else { "" },
        total_hours,
        minutes,
        seconds,
        fraction(micros, decimals)
    )
}

/// `.` plus the first `decimals` digits of the zero-padded microseconds.
fn fraction(micros: u32, decimals: u8) -> String {
    if decimals == 0 {
        return String::new();
    }
    let digits = format!("{:06}", micros);
    format!(".{}", &digits[..usize::from(decimals.min(6))])
}

/// One materialized row: column name to value, in result-set column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<CellValue>,
}

impl Record {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Converts raw driver rows into records that all share the names of
/// `descriptors`, rendering each value by its column's format.
///
/// Fails if any row does not carry exactly one value per column.
pub fn materialize_rows<I>(descriptors: &[ColumnDescriptor], rows: I) -> Result<Vec<Record>>
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let columns: Arc<[String]> = descriptors.iter().map(|d| d.name.clone()).collect();

    let mut records = Vec::new();
    for (index, row) in rows.into_iter().enumerate() {
        if row.len() != columns.len() {
            return Err(QueryError::RowShape {
                row: index,
                expected: columns.len(),
                found: row.len(),
            });
        }
        records.push(Record {
            columns: Arc::clone(&columns),
            values: descriptors
                .iter()
                .zip(row)
                .map(|(descriptor, value)| descriptor.format.cell(value))
                .collect(),
        });
    }
    Ok(records)
}

/// Encodes records as a compact JSON array of objects.
pub fn serialize(records: &[Record]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(records)?)
}

pub fn serialize_pretty(records: &[Record]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(records)?)
}
