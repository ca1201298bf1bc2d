//! Connection pool abstraction
//!
//! This module defines pool configuration and the three seams the persistence
//! core is written against:
//!
//! - [`ConnectionPool`]: a bounded set of live connections to one logical
//!   resource, with a blocking (async) borrow subject to an acquire timeout.
//! - [`PooledConnection`]: a borrowed connection. Returning it to its pool is
//!   explicit through [`PooledConnection::release`], and dropping it returns it
//!   as well, so no exit path can leak a borrow.
//! - [`PoolFactory`]: builds a pool for a resource key and connection string.
//!
//! The PostgreSQL implementation lives in [`crate::postgres`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::statement::Statement;
use crate::value::Row;

/// Configuration options applied to every resource pool
///
/// # Example
///
/// ```rust
/// use infra_db::PoolSettings;
/// use std::time::Duration;
///
/// let settings = PoolSettings::default()
///     .max_connections(20)
///     .min_connections(2)
///     .acquire_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// How long a borrow waits before failing with pool exhaustion
    pub acquire_timeout: Duration,
    /// Maximum lifetime of a connection
    pub max_lifetime: Duration,
    /// Idle timeout before closing a connection
    pub idle_timeout: Duration,
    /// Schema search path set on every new connection
    pub search_path: String,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(30 * 60), // 30 minutes
            idle_timeout: Duration::from_secs(60),
            search_path: "auth, public".to_string(),
        }
    }
}

impl PoolSettings {
    /// Sets the maximum number of connections in the pool
    ///
    /// # Arguments
    ///
    /// * `max` - Maximum connection count (default: 10)
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections to maintain
    ///
    /// # Arguments
    ///
    /// * `min` - Minimum connection count (default: 1)
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets how long a borrow may wait for a free connection
    ///
    /// # Arguments
    ///
    /// * `timeout` - Duration to wait for a connection (default: 30s)
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets the maximum lifetime of a connection
    ///
    /// # Arguments
    ///
    /// * `lifetime` - Maximum duration a connection can live (default: 30 min)
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Sets the idle timeout before closing a connection
    ///
    /// # Arguments
    ///
    /// * `timeout` - Duration of inactivity before closing (default: 60s)
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the search path applied when a connection is opened
    ///
    /// # Arguments
    ///
    /// * `search_path` - Comma separated schema list (default: `auth, public`)
    pub fn search_path(mut self, search_path: impl Into<String>) -> Self {
        self.search_path = search_path.into();
        self
    }
}

/// A connection borrowed from a [`ConnectionPool`]
#[async_trait]
pub trait PooledConnection: Send {
    /// Round-trips a trivial query
    async fn ping(&mut self) -> Result<(), DatabaseError>;

    /// Executes one statement inside its own transaction
    ///
    /// The transaction commits when the statement succeeds and rolls back on
    /// any error. Statements that produce no result set return no rows.
    async fn run(&mut self, statement: &Statement) -> Result<Vec<Row>, DatabaseError>;

    /// Returns the connection to the pool it was borrowed from
    fn release(self: Box<Self>) {}
}

/// A bounded pool of connections to one logical resource
#[async_trait]
pub trait ConnectionPool: Send + Sync + fmt::Debug {
    /// The logical resource this pool connects to
    fn resource_key(&self) -> &str;

    /// Borrows a connection, waiting up to the acquire timeout
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::PoolExhausted` when no connection became free in
    /// time, or `ConnectionFailed` when a new connection could not be opened.
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>, DatabaseError>;

    /// Current number of open connections
    fn size(&self) -> u32;

    /// Number of idle connections
    fn idle(&self) -> usize;
}

/// Builds connection pools for logical resources
#[async_trait]
pub trait PoolFactory: Send + Sync {
    /// Creates a pool for `resource_key` connecting with `connection_string`
    async fn create(
        &self,
        resource_key: &str,
        connection_string: &str,
    ) -> Result<Arc<dyn ConnectionPool>, DatabaseError>;
}
