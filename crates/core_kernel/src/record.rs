//! Record model - schema descriptors and field values
//!
//! Every persisted entity declares a static [`RecordSchema`]: its table, the
//! ordered list of fields with their semantic [`FieldType`], and which field is
//! the unique key used for upserts. The schema is built once per type and looked
//! up by type, so nothing in the persistence layer needs reflection.
//!
//! Instances expose their data as an ordered list of [`FieldValue`]s matching the
//! schema's field order.
//!
//! # Example
//!
//! ```rust
//! use core_kernel::define_record;
//! use core_kernel::record::{FieldType, Record, RecordType, ScalarType};
//! use uuid::Uuid;
//!
//! #[derive(Debug, Clone)]
//! struct Clinic {
//!     id: Uuid,
//!     name: String,
//!     services: Vec<String>,
//! }
//!
//! define_record!(Clinic => "clinics", unique = id {
//!     id: FieldType::UUID,
//!     name: FieldType::TEXT,
//!     services: FieldType::array_of(ScalarType::Text),
//! });
//!
//! let schema = Clinic::record_schema();
//! assert_eq!(schema.table(), Some("clinics"));
//! assert_eq!(schema.unique_key().map(|f| f.name), Some("id"));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Scalar column types understood by the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Bool,
    Integer,
    Float,
    Decimal,
    Text,
    Uuid,
    Timestamp,
    /// A structured payload stored as a single JSON document
    Json,
}

impl ScalarType {
    /// PostgreSQL type name used for this scalar
    pub fn sql_name(self) -> &'static str {
        match self {
            ScalarType::Bool => "BOOLEAN",
            ScalarType::Integer => "BIGINT",
            ScalarType::Float => "DOUBLE PRECISION",
            ScalarType::Decimal => "NUMERIC",
            ScalarType::Text => "TEXT",
            ScalarType::Uuid => "UUID",
            ScalarType::Timestamp => "TIMESTAMPTZ",
            ScalarType::Json => "JSONB",
        }
    }
}

/// Declared semantic type of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Scalar(ScalarType),
    /// A one-dimensional array column of the given element type
    Array(ScalarType),
}

impl FieldType {
    pub const BOOL: FieldType = FieldType::Scalar(ScalarType::Bool);
    pub const INTEGER: FieldType = FieldType::Scalar(ScalarType::Integer);
    pub const FLOAT: FieldType = FieldType::Scalar(ScalarType::Float);
    pub const DECIMAL: FieldType = FieldType::Scalar(ScalarType::Decimal);
    pub const TEXT: FieldType = FieldType::Scalar(ScalarType::Text);
    pub const UUID: FieldType = FieldType::Scalar(ScalarType::Uuid);
    pub const TIMESTAMP: FieldType = FieldType::Scalar(ScalarType::Timestamp);
    pub const JSON: FieldType = FieldType::Scalar(ScalarType::Json);

    /// An array column holding elements of `element`
    pub const fn array_of(element: ScalarType) -> Self {
        FieldType::Array(element)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::Array(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(scalar) => write!(f, "{}", scalar.sql_name()),
            FieldType::Array(element) => write!(f, "{}[]", element.sql_name()),
        }
    }
}

/// Metadata for one declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name, identical to the destination column name
    pub name: &'static str,
    pub field_type: FieldType,
    /// Whether this field is the record's unique key
    pub unique: bool,
}

impl FieldDef {
    pub fn new(name: &'static str, field_type: FieldType, unique: bool) -> Self {
        Self {
            name,
            field_type,
            unique,
        }
    }
}

/// Static description of a persisted record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    type_name: &'static str,
    table: Option<&'static str>,
    fields: Vec<FieldDef>,
}

impl RecordSchema {
    /// Creates a schema descriptor
    ///
    /// # Arguments
    ///
    /// * `type_name` - Record type name, used for resource routing
    /// * `table` - Destination table, optionally schema-qualified (`auth.users`)
    /// * `fields` - Fields in column order
    pub fn new(type_name: &'static str, table: Option<&'static str>, fields: Vec<FieldDef>) -> Self {
        Self {
            type_name,
            table,
            fields,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table(&self) -> Option<&'static str> {
        self.table
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Column names in declared order
    pub fn column_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Returns the first field flagged as the unique key, if any
    pub fn unique_key(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.unique)
    }

    /// Number of fields flagged as unique
    pub fn unique_key_count(&self) -> usize {
        self.fields.iter().filter(|f| f.unique).count()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A persisted entity instance
///
/// Implementations return one value per schema field, in schema order. The
/// trait is object safe so heterogeneous slices (`&[&dyn Record]`) can be
/// handed to the batch upsert, which rejects mixed types at runtime.
pub trait Record: Send + Sync {
    /// The static schema of this record's type
    fn schema(&self) -> &'static RecordSchema;

    /// Field values in schema order
    fn field_values(&self) -> Vec<FieldValue>;
}

/// Access to a record type's schema without an instance
pub trait RecordType: Record + Sized {
    fn record_schema() -> &'static RecordSchema;
}

impl<T: Record + ?Sized> Record for &T {
    fn schema(&self) -> &'static RecordSchema {
        (**self).schema()
    }

    fn field_values(&self) -> Vec<FieldValue> {
        (**self).field_values()
    }
}

impl<T: Record + ?Sized> Record for Box<T> {
    fn schema(&self) -> &'static RecordSchema {
        (**self).schema()
    }

    fn field_values(&self) -> Vec<FieldValue> {
        (**self).field_values()
    }
}

impl<T: Record + ?Sized> Record for Arc<T> {
    fn schema(&self) -> &'static RecordSchema {
        (**self).schema()
    }

    fn field_values(&self) -> Vec<FieldValue> {
        (**self).field_values()
    }
}

/// The value of a single record field
///
/// The set of shapes is closed: scalars, sequences and string-keyed maps.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// True for lists and maps
    pub fn is_composite(&self) -> bool {
        matches!(self, FieldValue::List(_) | FieldValue::Map(_))
    }

    /// Short shape name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::Text(_) => "text",
            FieldValue::Uuid(_) => "uuid",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
        }
    }

    /// Encodes this value as a JSON document
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Serialization` for non-finite floats, which JSON
    /// cannot represent.
    pub fn to_json(&self) -> Result<serde_json::Value, CoreError> {
        use serde_json::Value as Json;

        Ok(match self {
            FieldValue::Null => Json::Null,
            FieldValue::Bool(b) => Json::Bool(*b),
            FieldValue::Integer(n) => Json::from(*n),
            FieldValue::Float(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .ok_or_else(|| {
                    CoreError::serialization(format!("float {} has no JSON representation", n))
                })?,
            FieldValue::Decimal(d) => serde_json::Number::from_str(&d.normalize().to_string())
                .map(Json::Number)
                .map_err(|e| CoreError::serialization(format!("decimal {}: {}", d, e)))?,
            FieldValue::Text(s) => Json::String(s.clone()),
            FieldValue::Uuid(u) => Json::String(u.to_string()),
            FieldValue::Timestamp(t) => Json::String(t.to_rfc3339()),
            FieldValue::List(items) => Json::Array(
                items
                    .iter()
                    .map(FieldValue::to_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            FieldValue::Map(entries) => {
                let mut object = serde_json::Map::with_capacity(entries.len());
                for (key, value) in entries {
                    object.insert(key.clone(), value.to_json()?);
                }
                Json::Object(object)
            }
        })
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i16> for FieldValue {
    fn from(value: i16) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(f64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        FieldValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>> From<BTreeMap<String, T>> for FieldValue {
    fn from(value: BTreeMap<String, T>) -> Self {
        FieldValue::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<FieldValue>> From<HashMap<String, T>> for FieldValue {
    fn from(value: HashMap<String, T>) -> Self {
        FieldValue::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => FieldValue::Null,
            Json::Bool(b) => FieldValue::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => FieldValue::Text(s),
            Json::Array(items) => FieldValue::List(items.into_iter().map(Into::into).collect()),
            Json::Object(entries) => {
                FieldValue::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// Declares the schema of a record type and implements [`Record`] and
/// [`RecordType`] for it.
///
/// Fields are listed in column order; each field's value is converted with
/// `FieldValue::from(self.field.clone())`. The field named by `unique` is
/// flagged as the record's unique key.
#[macro_export]
macro_rules! define_record {
    ($ty:ident => $table:literal, unique = $unique:ident { $($field:ident : $kind:expr),+ $(,)? }) => {
        impl $crate::record::RecordType for $ty {
            fn record_schema() -> &'static $crate::record::RecordSchema {
                static SCHEMA: $crate::__private::Lazy<$crate::record::RecordSchema> =
                    $crate::__private::Lazy::new(|| {
                        $crate::record::RecordSchema::new(
                            stringify!($ty),
                            Some($table),
                            vec![$(
                                $crate::record::FieldDef::new(
                                    stringify!($field),
                                    $kind,
                                    stringify!($field) == stringify!($unique),
                                )
                            ),+],
                        )
                    });
                &SCHEMA
            }
        }

        impl $crate::record::Record for $ty {
            fn schema(&self) -> &'static $crate::record::RecordSchema {
                <$ty as $crate::record::RecordType>::record_schema()
            }

            fn field_values(&self) -> Vec<$crate::record::FieldValue> {
                vec![$($crate::record::FieldValue::from(self.$field.clone())),+]
            }
        }
    };
}
