//! Store configuration
//!
//! Resources, record-type routes and pool tuning are read from the
//! environment with the `config` crate:
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `STORE_DATABASE_URL` | connection string of the default resource | required |
//! | `STORE_DEFAULT_RESOURCE` | key of the default resource | `primary` |
//! | `PG_RESOURCE_<NAME>` | connection string of an additional resource | |
//! | `PG_ROUTE_<RECORD_TYPE>` | resource key serving a record type | |
//! | `STORE_MAX_CONNECTIONS` | pool upper bound | 10 |
//! | `STORE_MIN_CONNECTIONS` | pool lower bound | 1 |
//! | `STORE_ACQUIRE_TIMEOUT_SECS` | borrow timeout | 30 |
//! | `STORE_IDLE_TIMEOUT_SECS` | idle connection timeout | 60 |
//! | `STORE_MAX_LIFETIME_SECS` | connection lifetime | 1800 |
//! | `STORE_HEALTH_CHECK_INTERVAL_SECS` | pool sweep interval | 300 |
//! | `STORE_SEARCH_PATH` | search path set on new connections | `auth, public` |
//! | `STORE_LOG_LEVEL` | fallback log filter | `info` |

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Deserialize;

use crate::error::DatabaseError;
use crate::pool::PoolSettings;

/// Default key of the primary resource
pub const DEFAULT_RESOURCE: &str = "primary";

/// Default interval between pool health sweeps
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(300);

/// Normalizes a resource key or record type name for lookup
///
/// `UserQuery`, `user-query` and `USER_QUERY` all normalize to `user_query`,
/// which is how overrides arrive from `PG_ROUTE_<RECORD_TYPE>` variables.
pub(crate) fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;
    for c in name.trim().chars() {
        let c = if c == '-' { '_' } else { c };
        if c.is_uppercase() && previous.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
            normalized.push('_');
        }
        normalized.extend(c.to_lowercase());
        previous = Some(c);
    }
    normalized
}

#[derive(Debug, Deserialize)]
struct StoreSettings {
    database_url: Option<String>,
    #[serde(default = "default_resource")]
    default_resource: String,
    max_connections: Option<u32>,
    min_connections: Option<u32>,
    acquire_timeout_secs: Option<u64>,
    idle_timeout_secs: Option<u64>,
    max_lifetime_secs: Option<u64>,
    health_check_interval_secs: Option<u64>,
    search_path: Option<String>,
    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_resource() -> String {
    DEFAULT_RESOURCE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resources, routes and pool settings for a [`crate::PoolRegistry`]
///
/// # Example
///
/// ```rust
/// use infra_db::StoreConfig;
///
/// let config = StoreConfig::new("postgres://localhost/care")
///     .with_resource("analytics", "postgres://localhost/analytics")
///     .with_route("user_query", "analytics");
///
/// assert_eq!(config.default_resource(), "primary");
/// assert_eq!(config.resources().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    default_resource: String,
    resources: BTreeMap<String, String>,
    routes: BTreeMap<String, String>,
    pool: PoolSettings,
    health_check_interval: Duration,
    log_level: String,
}

impl StoreConfig {
    /// Creates a configuration with a single default resource
    pub fn new(database_url: impl Into<String>) -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(DEFAULT_RESOURCE.to_string(), database_url.into());
        Self {
            default_resource: DEFAULT_RESOURCE.to_string(),
            resources,
            routes: BTreeMap::new(),
            pool: PoolSettings::default(),
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
            log_level: default_log_level(),
        }
    }

    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, DatabaseError> {
        Self::load(None)
    }

    /// Loads configuration from an explicit variable map instead of the
    /// process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, DatabaseError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self, DatabaseError> {
        let settings: StoreSettings = ::config::Config::builder()
            .add_source(
                ::config::Environment::with_prefix("STORE")
                    .try_parsing(true)
                    .source(vars.clone()),
            )
            .build()?
            .try_deserialize()?;

        let extra_resources = Self::prefixed("PG_RESOURCE", vars.clone())?;
        let routes = Self::prefixed("PG_ROUTE", vars)?;

        let database_url = settings
            .database_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| DatabaseError::configuration("STORE_DATABASE_URL is not set"))?;

        let default_resource = normalize_name(&settings.default_resource);
        let mut resources = BTreeMap::new();
        for (name, url) in extra_resources {
            resources.insert(normalize_name(&name), url);
        }
        // STORE_DATABASE_URL wins over a PG_RESOURCE_ entry for the same key
        resources.insert(default_resource.clone(), database_url);

        let routes = routes
            .into_iter()
            .map(|(record_type, resource)| (normalize_name(&record_type), normalize_name(&resource)))
            .collect();

        let defaults = PoolSettings::default();
        let pool = PoolSettings {
            max_connections: settings.max_connections.unwrap_or(defaults.max_connections),
            min_connections: settings.min_connections.unwrap_or(defaults.min_connections),
            acquire_timeout: settings
                .acquire_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_timeout),
            idle_timeout: settings
                .idle_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            max_lifetime: settings
                .max_lifetime_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_lifetime),
            search_path: settings.search_path.unwrap_or(defaults.search_path),
        };

        if pool.max_connections == 0 {
            return Err(DatabaseError::configuration(
                "STORE_MAX_CONNECTIONS must be at least 1",
            ));
        }
        if pool.min_connections > pool.max_connections {
            return Err(DatabaseError::configuration(format!(
                "STORE_MIN_CONNECTIONS ({}) exceeds STORE_MAX_CONNECTIONS ({})",
                pool.min_connections, pool.max_connections
            )));
        }

        Ok(Self {
            default_resource,
            resources,
            routes,
            pool,
            health_check_interval: settings
                .health_check_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_HEALTH_CHECK_INTERVAL),
            log_level: settings.log_level,
        })
    }

    fn prefixed(
        prefix: &str,
        vars: Option<HashMap<String, String>>,
    ) -> Result<HashMap<String, String>, DatabaseError> {
        let values = ::config::Config::builder()
            .add_source(::config::Environment::with_prefix(prefix).source(vars))
            .build()?
            .try_deserialize::<HashMap<String, String>>()?;
        Ok(values)
    }

    /// Adds (or replaces) a resource
    pub fn with_resource(mut self, key: impl AsRef<str>, url: impl Into<String>) -> Self {
        self.resources.insert(normalize_name(key.as_ref()), url.into());
        self
    }

    /// Routes a record type to a resource key
    pub fn with_route(mut self, record_type: impl AsRef<str>, resource: impl AsRef<str>) -> Self {
        self.routes
            .insert(normalize_name(record_type.as_ref()), normalize_name(resource.as_ref()));
        self
    }

    /// Replaces the pool settings applied to every resource
    pub fn with_pool(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }

    /// Sets the interval between pool health sweeps
    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    pub fn default_resource(&self) -> &str {
        &self.default_resource
    }

    /// Resource key to connection string, one entry per pool
    pub fn resources(&self) -> &BTreeMap<String, String> {
        &self.resources
    }

    /// Record type to resource key overrides
    pub fn routes(&self) -> &BTreeMap<String, String> {
        &self.routes
    }

    pub fn connection_string(&self, resource: &str) -> Option<&str> {
        self.resources.get(resource).map(String::as_str)
    }

    pub fn pool(&self) -> &PoolSettings {
        &self.pool
    }

    pub fn health_check_interval(&self) -> Duration {
        self.health_check_interval
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}
