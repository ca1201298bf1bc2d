//! Retrying statement execution
//!
//! Each attempt borrows exactly one connection from the pool serving the
//! record type, runs the statement in its own transaction and returns the
//! connection before the outcome is inspected. A failed attempt that may be
//! retried forces a full pool rebuild before the next one.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::StoreConfig;
use crate::error::DatabaseError;
use crate::locator::ResourceLocator;
use crate::pool::ConnectionPool;
use crate::registry::{PoolRegistry, PoolSnapshot};
use crate::retry::{RetryEvent, RetryPolicy, RetryState, DEFAULT_MAX_RETRIES};
use crate::statement::Statement;
use crate::value::Row;

/// Runs statements against the resource serving a record type
#[derive(Debug, Clone)]
pub struct Executor {
    locator: ResourceLocator,
    registry: Arc<PoolRegistry>,
}

impl Executor {
    pub fn new(locator: ResourceLocator, registry: Arc<PoolRegistry>) -> Self {
        Self { locator, registry }
    }

    pub fn from_config(config: &StoreConfig, registry: Arc<PoolRegistry>) -> Self {
        Self::new(ResourceLocator::from_config(config), registry)
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    /// Executes `statement` with the default budget of three attempts
    pub async fn execute(
        &self,
        record_type: &str,
        statement: &Statement,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.execute_with_retries(record_type, statement, DEFAULT_MAX_RETRIES)
            .await
    }

    /// Executes `statement` on the resource serving `record_type`
    ///
    /// Returns the statement's rows, or no rows when it produces no result
    /// set.
    ///
    /// # Errors
    ///
    /// - `Configuration` when `max_retries` is zero or the resolved resource
    ///   is not configured; neither is retried
    /// - the last attempt's error once every attempt has failed
    pub async fn execute_with_retries(
        &self,
        record_type: &str,
        statement: &Statement,
        max_retries: u32,
    ) -> Result<Vec<Row>, DatabaseError> {
        let policy = RetryPolicy::new(max_retries)?;
        let resource = self.locator.resolve(record_type);
        let mut snapshot = self.registry.get_pool(false).await?;

        let mut state = policy.initial();
        let mut rows = Vec::new();
        let mut last_error = None;

        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    match self.attempt(&mut snapshot, resource, statement).await {
                        Ok(result) => {
                            debug!(
                                resource,
                                record_type,
                                attempt,
                                rows = result.len(),
                                "Statement executed"
                            );
                            rows = result;
                            policy.transition(state, RetryEvent::Succeeded)
                        }
                        Err(e) => {
                            warn!(
                                resource,
                                record_type,
                                attempt,
                                max_retries,
                                error = %e,
                                "Statement attempt failed"
                            );
                            let event = RetryEvent::failed(&e);
                            last_error = Some(e);
                            policy.transition(state, event)
                        }
                    }
                }
                RetryState::Rebuilding { .. } => {
                    snapshot = self.registry.get_pool(true).await?;
                    policy.transition(state, RetryEvent::Rebuilt)
                }
                RetryState::Succeeded { .. } => return Ok(rows),
                RetryState::Exhausted { attempts } => {
                    let error = last_error.unwrap_or_else(|| {
                        DatabaseError::QueryFailed("statement failed without an error".to_string())
                    });
                    error!(
                        resource,
                        record_type,
                        attempts,
                        error = %error,
                        "Statement failed, giving up"
                    );
                    return Err(error);
                }
            };
        }
    }

    async fn attempt(
        &self,
        snapshot: &mut Arc<PoolSnapshot>,
        resource: &str,
        statement: &Statement,
    ) -> Result<Vec<Row>, DatabaseError> {
        let pool = self.pool_for(snapshot, resource).await?;
        let mut connection = pool.acquire().await?;
        let result = connection.run(statement).await;
        connection.release();
        result
    }

    async fn pool_for(
        &self,
        snapshot: &mut Arc<PoolSnapshot>,
        resource: &str,
    ) -> Result<Arc<dyn ConnectionPool>, DatabaseError> {
        if let Some(pool) = snapshot.get(resource) {
            return Ok(pool.clone());
        }

        warn!(resource, "Resource missing from pool snapshot, forcing rebuild");
        *snapshot = self.registry.get_pool(true).await?;
        snapshot.get(resource).cloned().ok_or_else(|| {
            DatabaseError::configuration(format!(
                "No connection pool configured for resource '{}'",
                resource
            ))
        })
    }
}
