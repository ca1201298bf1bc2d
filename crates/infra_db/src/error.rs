//! Database error types
//!
//! This module defines the error types that can occur during persistence
//! operations. Errors fall into two families:
//!
//! - **Fatal** errors (configuration and serialization defects, undecodable
//!   rows) are raised immediately and never retried.
//! - **Backend** errors (connection loss, pool exhaustion, driver-level
//!   execution failures) are retried by the executor and only surface once the
//!   retry budget is spent.

use core_kernel::CoreError;
use thiserror::Error;

/// Errors that can occur during database operations
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    /// Failed to establish or keep a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check or not-null constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Transaction error
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhaustion - no connection became available within the acquire timeout
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Missing table, missing unique key, unknown resource and similar defects
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A field value cannot be stored in its declared column type
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A result column could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl DatabaseError {
    /// Creates a configuration error
    ///
    /// # Example
    ///
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::configuration("Cannot sync without a table name defined");
    /// assert!(error.is_configuration());
    /// assert!(!error.is_retriable());
    /// ```
    pub fn configuration(message: impl Into<String>) -> Self {
        DatabaseError::Configuration(message.into())
    }

    /// Creates a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        DatabaseError::Serialization(message.into())
    }

    /// Checks if this error is a configuration defect
    pub fn is_configuration(&self) -> bool {
        matches!(self, DatabaseError::Configuration(_))
    }

    /// Checks if the executor should retry after this error
    ///
    /// Every backend-originated failure is retried, including driver-level
    /// execution errors. Defects in the caller's records or configuration are
    /// not.
    pub fn is_retriable(&self) -> bool {
        !matches!(
            self,
            DatabaseError::Configuration(_)
                | DatabaseError::Serialization(_)
                | DatabaseError::Decode(_)
        )
    }

    /// Checks if this error is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
        )
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }
}

/// Converts SQLx errors to more specific DatabaseError variants
///
/// The mapping looks at the SQLx error kind first and at the PostgreSQL
/// SQLSTATE for errors reported by the server.
impl From<&sqlx::Error> for DatabaseError {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed => DatabaseError::ConnectionFailed(error.to_string()),
            sqlx::Error::Configuration(e) => DatabaseError::Configuration(e.to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. } => {
                DatabaseError::Decode(error.to_string())
            }
            sqlx::Error::Database(db_err) => {
                // PostgreSQL error codes
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry(message),
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23502") | Some("23514") => DatabaseError::ConstraintViolation(message),
                    Some("25P02") | Some("40001") | Some("40P01") => {
                        DatabaseError::TransactionFailed(message)
                    }
                    Some("57P01") | Some("57P02") | Some("57P03") => {
                        DatabaseError::ConnectionFailed(message)
                    }
                    Some(code) if code.starts_with("08") => DatabaseError::ConnectionFailed(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::from(&error)
    }
}

impl From<CoreError> for DatabaseError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Serialization(message) => DatabaseError::Serialization(message),
            other => DatabaseError::Configuration(other.to_string()),
        }
    }
}

impl From<::config::ConfigError> for DatabaseError {
    fn from(error: ::config::ConfigError) -> Self {
        DatabaseError::Configuration(error.to_string())
    }
}
