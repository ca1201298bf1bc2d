//! Scripted In-Memory Pools
//!
//! A [`MockBackend`] stands in for PostgreSQL behind the `PoolFactory` seam.
//! Tests script failures (failed borrows, failed statements, pools that fail
//! their health ping) and then inspect what the persistence core did: how
//! many connections it borrowed and returned, which statements reached which
//! resource, and how many pools it built.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use infra_db::{
    ConnectionPool, DatabaseError, Executor, PoolFactory, PoolRegistry, PooledConnection,
    RecordStore, Row, Statement, StoreConfig,
};

/// A statement as received by a mock connection
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub resource: String,
    pub pool_id: u64,
    pub statement: Statement,
}

#[derive(Debug, Default)]
struct BackendState {
    acquire_failures: VecDeque<DatabaseError>,
    run_outcomes: VecDeque<Result<Vec<Row>, DatabaseError>>,
    creation_failures: HashSet<String>,
    unhealthy_pools: HashSet<u64>,
    pools: Vec<(u64, String)>,
    statements: Vec<ExecutedStatement>,
    acquires: usize,
    failed_acquires: usize,
    releases: usize,
    pings: usize,
    latency: Duration,
}

/// Shared, scriptable state behind every mock pool it creates
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A pool factory producing pools bound to this backend
    pub fn factory(&self) -> Arc<dyn PoolFactory> {
        Arc::new(MockPoolFactory {
            backend: self.clone(),
        })
    }

    /// Builds a registry over this backend
    pub fn registry(&self, config: &StoreConfig) -> Arc<PoolRegistry> {
        Arc::new(PoolRegistry::new(config, self.factory()))
    }

    /// Builds a record store over a fresh registry on this backend
    pub fn store(&self, config: &StoreConfig) -> RecordStore {
        RecordStore::new(Executor::from_config(config, self.registry(config)))
    }

    /// The next `count` borrows fail with `error`
    pub fn fail_next_acquires(&self, count: usize, error: DatabaseError) {
        let mut state = self.state();
        for _ in 0..count {
            state.acquire_failures.push_back(error.clone());
        }
    }

    /// The next `count` statements fail with `error`
    pub fn fail_next_runs(&self, count: usize, error: DatabaseError) {
        let mut state = self.state();
        for _ in 0..count {
            state.run_outcomes.push_back(Err(error.clone()));
        }
    }

    /// The next statement returns `rows`
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state().run_outcomes.push_back(Ok(rows));
    }

    /// Every later attempt to build a pool for `resource` fails
    pub fn fail_pool_creation(&self, resource: &str) {
        self.state().creation_failures.insert(resource.to_string());
    }

    pub fn allow_pool_creation(&self, resource: &str) {
        self.state().creation_failures.remove(resource);
    }

    /// The most recently built pool for `resource` fails its health ping
    pub fn mark_unhealthy(&self, resource: &str) {
        let mut state = self.state();
        let latest = state
            .pools
            .iter()
            .rev()
            .find(|(_, key)| key == resource)
            .map(|(id, _)| *id);
        if let Some(id) = latest {
            state.unhealthy_pools.insert(id);
        }
    }

    /// Delays every statement by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Successful borrows
    pub fn acquires(&self) -> usize {
        self.state().acquires
    }

    pub fn failed_acquires(&self) -> usize {
        self.state().failed_acquires
    }

    /// Connections returned to their pool
    pub fn releases(&self) -> usize {
        self.state().releases
    }

    pub fn pings(&self) -> usize {
        self.state().pings
    }

    /// Connections currently borrowed
    pub fn outstanding(&self) -> usize {
        let state = self.state();
        state.acquires - state.releases
    }

    pub fn pools_created(&self) -> usize {
        self.state().pools.len()
    }

    pub fn pools_created_for(&self, resource: &str) -> usize {
        self.state()
            .pools
            .iter()
            .filter(|(_, key)| key == resource)
            .count()
    }

    pub fn statements(&self) -> Vec<ExecutedStatement> {
        self.state().statements.clone()
    }

    /// Total of pool borrows, pings and statements; zero means the core never
    /// touched the backend
    pub fn interactions(&self) -> usize {
        let state = self.state();
        state.acquires + state.failed_acquires + state.pings + state.statements.len()
    }
}

/// Creates [`MockPool`]s for a [`MockBackend`]
#[derive(Debug, Clone)]
pub struct MockPoolFactory {
    backend: MockBackend,
}

#[async_trait]
impl PoolFactory for MockPoolFactory {
    async fn create(
        &self,
        resource_key: &str,
        _connection_string: &str,
    ) -> Result<Arc<dyn ConnectionPool>, DatabaseError> {
        let mut state = self.backend.state();
        if state.creation_failures.contains(resource_key) {
            return Err(DatabaseError::ConnectionFailed(format!(
                "cannot reach resource {}",
                resource_key
            )));
        }
        let id = state.pools.len() as u64 + 1;
        state.pools.push((id, resource_key.to_string()));

        Ok(Arc::new(MockPool {
            id,
            resource_key: resource_key.to_string(),
            borrowed: Arc::new(AtomicU32::new(0)),
            backend: self.backend.clone(),
        }))
    }
}

/// An in-memory pool; ids are unique per backend
#[derive(Debug)]
pub struct MockPool {
    id: u64,
    resource_key: String,
    borrowed: Arc<AtomicU32>,
    backend: MockBackend,
}

impl MockPool {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl ConnectionPool for MockPool {
    fn resource_key(&self) -> &str {
        &self.resource_key
    }

    async fn acquire(&self) -> Result<Box<dyn PooledConnection>, DatabaseError> {
        {
            let mut state = self.backend.state();
            if let Some(error) = state.acquire_failures.pop_front() {
                state.failed_acquires += 1;
                return Err(error);
            }
            state.acquires += 1;
        }
        self.borrowed.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockConnection {
            pool_id: self.id,
            resource_key: self.resource_key.clone(),
            borrowed: self.borrowed.clone(),
            backend: self.backend.clone(),
        }))
    }

    fn size(&self) -> u32 {
        self.borrowed.load(Ordering::SeqCst)
    }

    fn idle(&self) -> usize {
        0
    }
}

/// A borrowed mock connection; dropping it counts as a release
pub struct MockConnection {
    pool_id: u64,
    resource_key: String,
    borrowed: Arc<AtomicU32>,
    backend: MockBackend,
}

#[async_trait]
impl PooledConnection for MockConnection {
    async fn ping(&mut self) -> Result<(), DatabaseError> {
        let mut state = self.backend.state();
        state.pings += 1;
        if state.unhealthy_pools.contains(&self.pool_id) {
            return Err(DatabaseError::ConnectionFailed(
                "server closed the connection unexpectedly".to_string(),
            ));
        }
        Ok(())
    }

    async fn run(&mut self, statement: &Statement) -> Result<Vec<Row>, DatabaseError> {
        let latency = self.backend.state().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.backend.state();
        state.statements.push(ExecutedStatement {
            resource: self.resource_key.clone(),
            pool_id: self.pool_id,
            statement: statement.clone(),
        });
        state.run_outcomes.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.borrowed.fetch_sub(1, Ordering::SeqCst);
        self.backend.state().releases += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drop_counts_release() {
        let backend = MockBackend::new();
        let pool = backend.factory().create("primary", "mock://").await.unwrap();

        let connection = pool.acquire().await.unwrap();
        assert_eq!(backend.outstanding(), 1);
        assert_eq!(pool.size(), 1);
        connection.release();
        assert_eq!(backend.releases(), 1);
        assert_eq!(backend.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_in_order() {
        let backend = MockBackend::new();
        let pool = backend.factory().create("primary", "mock://").await.unwrap();
        backend.fail_next_acquires(1, DatabaseError::PoolExhausted);

        assert!(matches!(pool.acquire().await, Err(DatabaseError::PoolExhausted)));
        assert!(pool.acquire().await.is_ok());
        assert_eq!(backend.failed_acquires(), 1);
    }

    #[tokio::test]
    async fn test_unhealthy_applies_to_latest_pool_only() {
        let backend = MockBackend::new();
        let factory = backend.factory();
        let old = factory.create("primary", "mock://").await.unwrap();
        backend.mark_unhealthy("primary");
        let new = factory.create("primary", "mock://").await.unwrap();

        assert!(old.acquire().await.unwrap().ping().await.is_err());
        assert!(new.acquire().await.unwrap().ping().await.is_ok());
        assert_eq!(backend.pools_created_for("primary"), 2);
    }
}
