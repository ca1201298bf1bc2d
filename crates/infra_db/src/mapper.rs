//! Record mapping
//!
//! Turns a [`Record`] into ordered column names and bind values. Normalization
//! is driven by each field's declared type:
//!
//! - A map, or any value declared `JSON`, is stored as one JSONB document.
//! - A list declared as an array of scalars is stored as a PostgreSQL array.
//! - A list declared as an array of `JSON` has each element encoded as a
//!   document, which is how nested composite data such as weekly schedules is
//!   kept (`JSONB[]`).
//! - NULL binds as a NULL of the declared column type.
//!
//! Anything else (a map into a text column, a NULL or nested element inside a
//! scalar array, mixed element types) is rejected with
//! `DatabaseError::Serialization`.

use core_kernel::{FieldType, FieldValue, Record, RecordSchema, ScalarType};

use crate::error::DatabaseError;
use crate::value::{SqlArray, SqlValue};

/// Ordered column names and their values for one record
pub type Columns = (Vec<&'static str>, Vec<SqlValue>);

/// Extracts every declared field of `record` in schema order
///
/// # Errors
///
/// - `Configuration` if the record yields a different number of values than
///   its schema declares
/// - `Serialization` if a value cannot be stored in its declared column type
pub fn to_columns<R: Record + ?Sized>(record: &R) -> Result<Columns, DatabaseError> {
    let schema = record.schema();
    let values = record.field_values();

    if values.len() != schema.fields().len() {
        return Err(DatabaseError::configuration(format!(
            "{} declares {} fields but produced {} values",
            schema.type_name(),
            schema.fields().len(),
            values.len()
        )));
    }

    let mut normalized = Vec::with_capacity(values.len());
    for (field, value) in schema.fields().iter().zip(values.iter()) {
        let value = normalize(value, field.field_type).map_err(|e| match e {
            DatabaseError::Serialization(message) => DatabaseError::Serialization(format!(
                "{}.{}: {}",
                schema.type_name(),
                field.name,
                message
            )),
            other => other,
        })?;
        normalized.push(value);
    }

    Ok((schema.column_names(), normalized))
}

/// Returns the name of the schema's unique-key field
///
/// # Errors
///
/// Returns `Configuration` if no field, or more than one field, is flagged as
/// the unique key.
pub fn find_unique_key(schema: &RecordSchema) -> Result<&'static str, DatabaseError> {
    match schema.unique_key_count() {
        1 => schema
            .unique_key()
            .map(|field| field.name)
            .ok_or_else(|| missing_unique_key(schema)),
        0 => Err(missing_unique_key(schema)),
        n => Err(DatabaseError::configuration(format!(
            "{} declares {} unique key fields; exactly one is required",
            schema.type_name(),
            n
        ))),
    }
}

fn missing_unique_key(schema: &RecordSchema) -> DatabaseError {
    DatabaseError::configuration(format!(
        "Cannot sync {} without a unique key defined",
        schema.type_name()
    ))
}

/// Normalizes one field value into a storable representation
pub fn normalize(value: &FieldValue, field_type: FieldType) -> Result<SqlValue, DatabaseError> {
    match (field_type, value) {
        (_, FieldValue::Null) => Ok(SqlValue::Null(field_type)),
        (FieldType::Scalar(ScalarType::Json), value) => Ok(SqlValue::Json(value.to_json()?)),
        (FieldType::Scalar(scalar), value) => normalize_scalar(value, scalar),
        (FieldType::Array(element), FieldValue::List(items)) => normalize_array(items, element),
        (FieldType::Array(_), other) => Err(DatabaseError::serialization(format!(
            "expected a list for {} column, got {}",
            field_type,
            other.kind()
        ))),
    }
}

fn normalize_scalar(value: &FieldValue, scalar: ScalarType) -> Result<SqlValue, DatabaseError> {
    let normalized = match (scalar, value) {
        (ScalarType::Bool, FieldValue::Bool(b)) => SqlValue::Bool(*b),
        (ScalarType::Integer, FieldValue::Integer(n)) => SqlValue::Integer(*n),
        (ScalarType::Float, FieldValue::Float(n)) => SqlValue::Float(*n),
        (ScalarType::Float, FieldValue::Integer(n)) => SqlValue::Float(*n as f64),
        (ScalarType::Decimal, FieldValue::Decimal(d)) => SqlValue::Decimal(*d),
        (ScalarType::Decimal, FieldValue::Integer(n)) => SqlValue::Decimal((*n).into()),
        (ScalarType::Text, FieldValue::Text(s)) => SqlValue::Text(s.clone()),
        (ScalarType::Uuid, FieldValue::Uuid(u)) => SqlValue::Uuid(*u),
        (ScalarType::Timestamp, FieldValue::Timestamp(t)) => SqlValue::Timestamp(*t),
        (ScalarType::Json, value) => SqlValue::Json(value.to_json()?),
        (scalar, value) => {
            return Err(DatabaseError::serialization(format!(
                "cannot store {} in {} column",
                value.kind(),
                scalar.sql_name()
            )))
        }
    };
    Ok(normalized)
}

fn normalize_array(items: &[FieldValue], element: ScalarType) -> Result<SqlValue, DatabaseError> {
    if element == ScalarType::Json {
        let documents = items
            .iter()
            .map(|item| item.to_json().map_err(DatabaseError::from))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(SqlValue::Array(SqlArray::Json(documents)));
    }

    let mut scalars = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        if item.is_null() || item.is_composite() {
            return Err(DatabaseError::serialization(format!(
                "element {} is {}; {}[] columns hold only non-null scalars",
                idx,
                item.kind(),
                element.sql_name()
            )));
        }
        scalars.push(normalize_scalar(item, element)?);
    }

    let array = match element {
        ScalarType::Bool => SqlArray::Bool(collect(scalars, SqlValue::as_bool)?),
        ScalarType::Integer => SqlArray::Integer(collect(scalars, SqlValue::as_i64)?),
        ScalarType::Float => SqlArray::Float(collect(scalars, SqlValue::as_f64)?),
        ScalarType::Decimal => SqlArray::Decimal(collect(scalars, |v| match v {
            SqlValue::Decimal(d) => Some(*d),
            _ => None,
        })?),
        ScalarType::Text => SqlArray::Text(collect(scalars, |v| v.as_str().map(str::to_string))?),
        ScalarType::Uuid => SqlArray::Uuid(collect(scalars, SqlValue::as_uuid)?),
        ScalarType::Timestamp => SqlArray::Timestamp(collect(scalars, |v| match v {
            SqlValue::Timestamp(t) => Some(*t),
            _ => None,
        })?),
        ScalarType::Json => SqlArray::Json(collect(scalars, |v| v.as_json().cloned())?),
    };
    Ok(SqlValue::Array(array))
}

fn collect<T>(
    values: Vec<SqlValue>,
    extract: impl Fn(&SqlValue) -> Option<T>,
) -> Result<Vec<T>, DatabaseError> {
    values
        .iter()
        .map(|v| {
            extract(v).ok_or_else(|| {
                DatabaseError::serialization(format!("mixed element types in array ({})", v.field_type()))
            })
        })
        .collect()
}
