//! Infrastructure Database Layer
//!
//! This crate is the persistence core of the care directory: it maps records
//! onto rows spread across one or more PostgreSQL resources, using SQLx.
//!
//! # Architecture
//!
//! - [`ResourceLocator`] resolves a record type to the logical resource that
//!   stores it.
//! - [`PoolRegistry`] keeps one connection pool per resource, sweeps them for
//!   health on an interval and swaps in rebuilt pools atomically.
//! - [`Executor`] runs a [`Statement`] on the right pool, retrying transient
//!   failures with a pool rebuild in between.
//! - [`RecordStore`] turns records into idempotent `INSERT ... ON CONFLICT`
//!   upserts, singly or in batches.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{RecordStore, StoreConfig};
//!
//! let config = StoreConfig::from_env()?;
//! let store = RecordStore::postgres(&config);
//! store.sync(&doctor).await?;
//! store.sync_many(&reviews).await?;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod health;
pub mod locator;
pub mod mapper;
pub mod pool;
pub mod postgres;
pub mod registry;
pub mod retry;
pub mod statement;
pub mod upsert;
pub mod value;

pub use config::StoreConfig;
pub use error::DatabaseError;
pub use executor::Executor;
pub use health::{HealthReport, ResourceHealth};
pub use locator::ResourceLocator;
pub use pool::{ConnectionPool, PoolFactory, PoolSettings, PooledConnection};
pub use postgres::PgPoolFactory;
pub use registry::{PoolRegistry, PoolSnapshot};
pub use retry::{RetryEvent, RetryPolicy, RetryState, DEFAULT_MAX_RETRIES};
pub use statement::Statement;
pub use upsert::{RecordStore, DEFAULT_BATCH_SIZE};
pub use value::{Row, SqlArray, SqlValue};
