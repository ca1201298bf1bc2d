//! Insert-or-update of records
//!
//! [`RecordStore`] persists records with `INSERT ... ON CONFLICT (<unique
//! key>) DO UPDATE`, so writing the same record twice leaves one row holding
//! the latest values.

use std::sync::Arc;

use core_kernel::{Record, RecordSchema};
use tracing::{debug, error};

use crate::config::StoreConfig;
use crate::error::DatabaseError;
use crate::executor::Executor;
use crate::mapper::{find_unique_key, to_columns};
use crate::registry::PoolRegistry;
use crate::statement::{upsert_sql, Statement, MAX_BIND_PARAMS};

/// Records per statement used by [`RecordStore::sync_many`]
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Upserts records through a retrying [`Executor`]
#[derive(Debug, Clone)]
pub struct RecordStore {
    executor: Executor,
}

impl RecordStore {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    /// Creates a store over a fresh PostgreSQL registry
    pub fn postgres(config: &StoreConfig) -> Self {
        let registry = Arc::new(PoolRegistry::postgres(config));
        Self::new(Executor::from_config(config, registry))
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Inserts `record`, or updates the row with the same unique key
    ///
    /// # Errors
    ///
    /// Returns `Configuration` before touching the database when the record's
    /// type has no table or no unique key.
    pub async fn sync<R: Record>(&self, record: &R) -> Result<(), DatabaseError> {
        self.sync_many_in_batches(std::slice::from_ref(record), 1)
            .await
    }

    /// Upserts `records` in batches of [`DEFAULT_BATCH_SIZE`]
    pub async fn sync_many<R: Record>(&self, records: &[R]) -> Result<(), DatabaseError> {
        self.sync_many_in_batches(records, DEFAULT_BATCH_SIZE).await
    }

    /// Upserts `records` as consecutive multi-row statements of at most
    /// `batch_size` records each
    ///
    /// An empty slice is a no-op. Each batch commits on its own: when a later
    /// batch fails, the earlier ones stay written.
    ///
    /// # Errors
    ///
    /// - `Configuration` when `batch_size` is zero, the record type has no
    ///   table or unique key, a batch would exceed PostgreSQL's bind parameter
    ///   limit, or a batch mixes record types
    /// - `Serialization` when a field value cannot be stored
    /// - the executor's error once its retries are spent
    pub async fn sync_many_in_batches<R: Record>(
        &self,
        records: &[R],
        batch_size: usize,
    ) -> Result<(), DatabaseError> {
        if batch_size == 0 {
            return Err(DatabaseError::configuration("batch_size must be at least 1"));
        }
        let Some(first) = records.first() else {
            return Ok(());
        };

        let schema = first.schema();
        let (table, unique_key) = upsert_target(schema)?;
        let width = schema.fields().len();
        let largest = batch_size.min(records.len());
        if width * largest > MAX_BIND_PARAMS {
            return Err(DatabaseError::configuration(format!(
                "a batch of {} {} records binds {} parameters, above the limit of {}; use a batch size of at most {}",
                largest,
                schema.type_name(),
                width * largest,
                MAX_BIND_PARAMS,
                MAX_BIND_PARAMS / width.max(1)
            )));
        }

        ensure_same_type(records, schema)?;

        let batches = records.len().div_ceil(batch_size);
        for (index, chunk) in records.chunks(batch_size).enumerate() {
            let statement = build_upsert(chunk, schema, table, unique_key)?;
            self.executor
                .execute(schema.type_name(), &statement)
                .await
                .map_err(|e| {
                    error!(
                        record_type = schema.type_name(),
                        batch = index + 1,
                        batches,
                        error = %e,
                        "Batch upsert failed"
                    );
                    e
                })?;
            debug!(
                record_type = schema.type_name(),
                table,
                batch = index + 1,
                batches,
                records = chunk.len(),
                "Batch upserted"
            );
        }
        Ok(())
    }
}

fn upsert_target(schema: &RecordSchema) -> Result<(&'static str, &'static str), DatabaseError> {
    let table = schema.table().ok_or_else(|| {
        DatabaseError::configuration(format!(
            "Cannot sync {} without a table name defined",
            schema.type_name()
        ))
    })?;
    Ok((table, find_unique_key(schema)?))
}

/// Rejects a batch holding any record whose type differs from `schema`
fn ensure_same_type<R: Record>(records: &[R], schema: &RecordSchema) -> Result<(), DatabaseError> {
    match records.iter().find(|r| !std::ptr::eq(r.schema(), schema)) {
        Some(other) => Err(DatabaseError::configuration(format!(
            "Cannot sync a batch mixing {} and {} records",
            schema.type_name(),
            other.schema().type_name()
        ))),
        None => Ok(()),
    }
}

/// Builds one multi-row upsert for a chunk of records of type `schema`
fn build_upsert<R: Record>(
    records: &[R],
    schema: &RecordSchema,
    table: &str,
    unique_key: &str,
) -> Result<Statement, DatabaseError> {
    if records.is_empty() {
        return Err(DatabaseError::configuration("cannot build an upsert for an empty batch"));
    }
    ensure_same_type(records, schema)?;
    let columns = schema.column_names();

    let mut params = Vec::with_capacity(columns.len() * records.len());
    for record in records {
        let (_, values) = to_columns(record)?;
        params.extend(values);
    }

    Ok(Statement::with_params(
        upsert_sql(table, &columns, unique_key, records.len()),
        params,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{define_record, FieldType, FieldValue, RecordType};
    use uuid::Uuid;

    #[derive(Debug, Clone)]
    struct Clinic {
        id: Uuid,
        name: String,
    }

    define_record!(Clinic => "clinics", unique = id {
        id: FieldType::UUID,
        name: FieldType::TEXT,
    });

    #[derive(Debug, Clone)]
    struct Ward {
        code: String,
    }

    define_record!(Ward => "wards", unique = code {
        code: FieldType::TEXT,
    });

    fn clinic(name: &str) -> Clinic {
        Clinic {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_build_upsert_binds_row_major() {
        let clinics = vec![clinic("North"), clinic("South")];
        let statement = build_upsert(&clinics, Clinic::record_schema(), "clinics", "id").unwrap();

        assert_eq!(statement.params().len(), 4);
        assert_eq!(statement.params()[1].as_str(), Some("North"));
        assert_eq!(statement.params()[3].as_str(), Some("South"));
        assert!(statement.sql().contains("VALUES ($1, $2), ($3, $4)"));
    }

    #[test]
    fn test_build_upsert_rejects_mixed_types() {
        let north = clinic("North");
        let ward = Ward { code: "W1".into() };
        let mixed: Vec<&dyn Record> = vec![&north, &ward];

        let err = build_upsert(&mixed, Clinic::record_schema(), "clinics", "id").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Clinic"));
        assert!(err.to_string().contains("Ward"));
    }

    #[test]
    fn test_type_check_uses_batch_schema() {
        let ward = Ward { code: "W1".into() };
        let rest: Vec<&dyn Record> = vec![&ward];

        // A chunk that is uniform on its own still belongs to a Clinic batch
        let err = build_upsert(&rest, Clinic::record_schema(), "clinics", "id").unwrap_err();
        assert!(err.is_configuration());

        let north = clinic("North");
        let mixed: Vec<&dyn Record> = vec![&north, &ward];
        assert!(ensure_same_type(&mixed, Clinic::record_schema()).is_err());
        assert!(ensure_same_type(&mixed[..1], Clinic::record_schema()).is_ok());
    }

    #[test]
    fn test_upsert_target_requires_table() {
        static NO_TABLE: once_cell::sync::Lazy<RecordSchema> = once_cell::sync::Lazy::new(|| {
            RecordSchema::new(
                "Scratch",
                None,
                vec![core_kernel::FieldDef::new("id", FieldType::UUID, true)],
            )
        });
        let err = upsert_target(&NO_TABLE).unwrap_err();
        assert!(err.to_string().contains("without a table name"));
    }

    #[test]
    fn test_upsert_target() {
        assert_eq!(upsert_target(Clinic::record_schema()).unwrap(), ("clinics", "id"));
        assert_eq!(upsert_target(Ward::record_schema()).unwrap(), ("wards", "code"));
    }

    #[test]
    fn test_field_values_follow_schema() {
        let north = clinic("North");
        assert_eq!(north.field_values()[1], FieldValue::Text("North".into()));
    }
}
