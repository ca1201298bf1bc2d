//! Pool health checks
//!
//! Health checks never raise: every failure is logged and reported as an unhealthy
//! result, which the registry turns into a rebuild.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::pool::{ConnectionPool, PooledConnection};
use crate::registry::PoolSnapshot;

/// Checks that a borrowed connection still answers `SELECT 1`
pub async fn is_alive(connection: &mut dyn PooledConnection) -> bool {
    match connection.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Connection failed liveness ping");
            false
        }
    }
}

/// Borrows one connection from `pool`, pings it and returns it
///
/// A failed borrow counts as an unhealthy pool.
pub async fn validate_pool(pool: &dyn ConnectionPool) -> bool {
    let mut connection = match pool.acquire().await {
        Ok(connection) => connection,
        Err(e) => {
            warn!(resource = pool.resource_key(), error = %e, "Pool validation failed to borrow a connection");
            return false;
        }
    };

    let alive = is_alive(connection.as_mut()).await;
    connection.release();

    if !alive {
        warn!(resource = pool.resource_key(), "Pool failed validation");
    }
    alive
}

/// Status of one resource pool at sweep time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHealth {
    pub healthy: bool,
    /// Open connections after the ping
    pub size: u32,
    /// Idle connections after the ping
    pub idle: usize,
}

/// Per-resource result of a sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    resources: BTreeMap<String, ResourceHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.resources.values().all(|r| r.healthy)
    }

    /// Keys of the pools that failed validation
    pub fn unhealthy(&self) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, r)| !r.healthy)
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn get(&self, resource: &str) -> Option<&ResourceHealth> {
        self.resources.get(resource)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceHealth)> {
        self.resources.iter().map(|(key, health)| (key.as_str(), health))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Validates every pool in `snapshot`
pub async fn sweep(snapshot: &PoolSnapshot) -> HealthReport {
    let mut report = HealthReport::default();
    for (key, pool) in snapshot.iter() {
        let healthy = validate_pool(pool.as_ref()).await;
        report.resources.insert(
            key.to_string(),
            ResourceHealth {
                healthy,
                size: pool.size(),
                idle: pool.idle(),
            },
        );
    }
    debug!(
        resources = report.len(),
        unhealthy = report.unhealthy().len(),
        "Pool health sweep complete"
    );
    report
}
