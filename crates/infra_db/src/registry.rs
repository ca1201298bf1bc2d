//! Per-resource pool registry
//!
//! The registry owns one pool per configured resource, published as an
//! immutable [`PoolSnapshot`]. Readers clone the `Arc` of the current snapshot
//! and never block on I/O; a rebuild builds the new pools first and then swaps
//! the snapshot in, so callers still holding the old snapshot (or a
//! connection borrowed from one of its pools) finish undisturbed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;
use crate::error::DatabaseError;
use crate::health;
use crate::pool::{ConnectionPool, PoolFactory};
use crate::postgres::PgPoolFactory;

/// An immutable mapping of resource key to pool
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pools: BTreeMap<String, Arc<dyn ConnectionPool>>,
    generation: u64,
}

impl PoolSnapshot {
    pub fn get(&self, resource: &str) -> Option<&Arc<dyn ConnectionPool>> {
        self.pools.get(resource)
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.pools.contains_key(resource)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ConnectionPool>)> {
        self.pools.iter().map(|(key, pool)| (key.as_str(), pool))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Rebuild counter at the time this snapshot was installed
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Process-wide cache of resource pools
///
/// Share it as an `Arc<PoolRegistry>`; every method takes `&self`.
pub struct PoolRegistry {
    resources: BTreeMap<String, String>,
    factory: Arc<dyn PoolFactory>,
    health_check_interval: Duration,
    snapshot: RwLock<Option<Arc<PoolSnapshot>>>,
    last_sweep: Mutex<Option<Instant>>,
    generation: AtomicU64,
}

impl PoolRegistry {
    /// Creates an empty registry; pools are built on first use
    pub fn new(config: &StoreConfig, factory: Arc<dyn PoolFactory>) -> Self {
        Self {
            resources: config.resources().clone(),
            factory,
            health_check_interval: config.health_check_interval(),
            snapshot: RwLock::new(None),
            last_sweep: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Creates a registry of SQLx PostgreSQL pools
    pub fn postgres(config: &StoreConfig) -> Self {
        Self::new(config, Arc::new(PgPoolFactory::new(config.pool().clone())))
    }

    /// Returns the pool snapshot, building or repairing it as needed
    ///
    /// - The first call builds one pool per configured resource. Any failure
    ///   propagates and nothing is installed.
    /// - `force_reset` rebuilds every pool unconditionally.
    /// - Otherwise, once the health check interval has elapsed since the last
    ///   sweep, every pool is pinged and the ones failing the ping are
    ///   replaced in a fresh snapshot. Healthy pools are carried over.
    ///
    /// A concurrent caller that finds a sweep already claimed gets the current
    /// snapshot without probing.
    pub async fn get_pool(&self, force_reset: bool) -> Result<Arc<PoolSnapshot>, DatabaseError> {
        if force_reset {
            return self.rebuild_all().await;
        }

        let Some(current) = self.current() else {
            return self.rebuild_all().await;
        };

        if !self.claim_sweep() {
            return Ok(current);
        }

        let report = health::sweep(&current).await;
        let unhealthy = report.unhealthy();
        if unhealthy.is_empty() {
            return Ok(current);
        }

        warn!(
            resources = ?unhealthy,
            generation = current.generation(),
            "Unhealthy pools detected, rebuilding"
        );
        self.rebuild(&current, &unhealthy).await
    }

    /// The installed snapshot, without any I/O
    pub fn current(&self) -> Option<Arc<PoolSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of snapshots installed so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Configured resource keys
    pub fn resource_keys(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn health_check_interval(&self) -> Duration {
        self.health_check_interval
    }

    fn claim_sweep(&self) -> bool {
        let mut last_sweep = self
            .last_sweep
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *last_sweep {
            Some(at) if at.elapsed() < self.health_check_interval => false,
            _ => {
                *last_sweep = Some(Instant::now());
                true
            }
        }
    }

    async fn rebuild_all(&self) -> Result<Arc<PoolSnapshot>, DatabaseError> {
        let mut pools = BTreeMap::new();
        for (key, url) in &self.resources {
            pools.insert(key.clone(), self.create(key, url).await?);
        }
        Ok(self.install(pools))
    }

    async fn rebuild(
        &self,
        current: &PoolSnapshot,
        unhealthy: &[&str],
    ) -> Result<Arc<PoolSnapshot>, DatabaseError> {
        let mut pools = current.pools.clone();
        for key in unhealthy {
            let Some(url) = self.resources.get(*key) else {
                continue;
            };
            pools.insert(key.to_string(), self.create(key, url).await?);
        }
        Ok(self.install(pools))
    }

    async fn create(&self, key: &str, url: &str) -> Result<Arc<dyn ConnectionPool>, DatabaseError> {
        self.factory.create(key, url).await.map_err(|e| {
            error!(resource = key, error = %e, "Failed to create connection pool");
            e
        })
    }

    fn install(&self, pools: BTreeMap<String, Arc<dyn ConnectionPool>>) -> Arc<PoolSnapshot> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let snapshot = Arc::new(PoolSnapshot { pools, generation });
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());

        info!(
            resources = snapshot.len(),
            generation,
            "Installed connection pool snapshot"
        );
        debug!(keys = ?snapshot.keys().collect::<Vec<_>>(), generation, "Snapshot resources");
        snapshot
    }
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("health_check_interval", &self.health_check_interval)
            .field("generation", &self.generation())
            .finish()
    }
}
