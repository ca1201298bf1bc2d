//! Storable values and result rows
//!
//! [`SqlValue`] is the bind-parameter representation of a field after
//! normalization: every value knows its PostgreSQL type, including NULLs and
//! empty arrays, so parameters are always sent with a concrete type.

use chrono::{DateTime, Utc};
use core_kernel::{FieldType, ScalarType};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A typed statement parameter or result value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL of the given column type
    Null(FieldType),
    Bool(bool),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
    Array(SqlArray),
}

/// A homogeneous one-dimensional array value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArray {
    Bool(Vec<bool>),
    Integer(Vec<i64>),
    Float(Vec<f64>),
    Decimal(Vec<Decimal>),
    Text(Vec<String>),
    Uuid(Vec<Uuid>),
    Timestamp(Vec<DateTime<Utc>>),
    Json(Vec<serde_json::Value>),
}

impl SqlArray {
    pub fn element_type(&self) -> ScalarType {
        match self {
            SqlArray::Bool(_) => ScalarType::Bool,
            SqlArray::Integer(_) => ScalarType::Integer,
            SqlArray::Float(_) => ScalarType::Float,
            SqlArray::Decimal(_) => ScalarType::Decimal,
            SqlArray::Text(_) => ScalarType::Text,
            SqlArray::Uuid(_) => ScalarType::Uuid,
            SqlArray::Timestamp(_) => ScalarType::Timestamp,
            SqlArray::Json(_) => ScalarType::Json,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SqlArray::Bool(v) => v.len(),
            SqlArray::Integer(v) => v.len(),
            SqlArray::Float(v) => v.len(),
            SqlArray::Decimal(v) => v.len(),
            SqlArray::Text(v) => v.len(),
            SqlArray::Uuid(v) => v.len(),
            SqlArray::Timestamp(v) => v.len(),
            SqlArray::Json(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SqlValue {
    /// The column type this value binds as
    pub fn field_type(&self) -> FieldType {
        match self {
            SqlValue::Null(field_type) => *field_type,
            SqlValue::Bool(_) => FieldType::BOOL,
            SqlValue::Integer(_) => FieldType::INTEGER,
            SqlValue::Float(_) => FieldType::FLOAT,
            SqlValue::Decimal(_) => FieldType::DECIMAL,
            SqlValue::Text(_) => FieldType::TEXT,
            SqlValue::Uuid(_) => FieldType::UUID,
            SqlValue::Timestamp(_) => FieldType::TIMESTAMP,
            SqlValue::Json(_) => FieldType::JSON,
            SqlValue::Array(array) => FieldType::Array(array.element_type()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Float(n) => Some(*n),
            SqlValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            SqlValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            SqlValue::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<Decimal> for SqlValue {
    fn from(value: Decimal) -> Self {
        SqlValue::Decimal(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        SqlValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(value: serde_json::Value) -> Self {
        SqlValue::Json(value)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(value: Vec<String>) -> Self {
        SqlValue::Array(SqlArray::Text(value))
    }
}

/// One result row: column names with their decoded values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column
    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Builder-style variant of [`Row::push`]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value.into());
        self
    }

    /// Looks up a value by column name
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}
