//! Database Test Utilities
//!
//! Provides a PostgreSQL test container with the care schema applied, plus
//! a [`StoreConfig`] pointing at it, for integration tests that need a real
//! server. Tests using it need Docker and are marked `#[ignore]`.

use std::sync::Arc;
use std::time::Duration;

use infra_db::{PoolSettings, RecordStore, StoreConfig};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

const POSTGRES_USER: &str = "care_user";
const POSTGRES_PASSWORD: &str = "care_password";
const POSTGRES_DB: &str = "care_test";

/// Schema applied to every test database
pub const CARE_SCHEMA: &str = include_str!("../../../migrations/care_schema.sql");

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connection details of the test container
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the connection URL for the default database
    pub fn connection_url(&self) -> String {
        self.connection_url_for(&self.database)
    }

    /// Creates the connection URL for another database on the same server
    pub fn connection_url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, database
        )
    }
}

/// A PostgreSQL container with the care schema applied
pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a new PostgreSQL container for testing
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or the schema fails
    /// to apply
    pub async fn new() -> Result<Self, BoxError> {
        let container = Postgres::default()
            .with_user(POSTGRES_USER)
            .with_password(POSTGRES_PASSWORD)
            .with_db_name(POSTGRES_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();

        let config = TestDatabaseConfig {
            host,
            port,
            ..TestDatabaseConfig::default()
        };

        let pool = connect(&config.connection_url()).await?;
        sqlx::raw_sql(CARE_SCHEMA).execute(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates another database on the same server with the care schema
    ///
    /// Returns its connection URL.
    pub async fn create_database(&self, name: &str) -> Result<String, BoxError> {
        sqlx::query(&format!("CREATE DATABASE \"{}\"", name.replace('"', "\"\"")))
            .execute(&self.pool)
            .await?;
        let url = self.config.connection_url_for(name);
        let pool = connect(&url).await?;
        sqlx::raw_sql(CARE_SCHEMA).execute(&pool).await?;
        pool.close().await;
        Ok(url)
    }

    /// A store configuration whose default resource is this database
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.config.connection_url()).with_pool(
            PoolSettings::default()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10)),
        )
    }

    /// A PostgreSQL-backed record store on this database
    pub fn store(&self) -> RecordStore {
        RecordStore::postgres(&self.store_config())
    }

    /// Clears all data from the database while preserving the schema
    pub async fn clear_data(&self) -> Result<(), BoxError> {
        for table in [
            "doctor_reviews",
            "appointments",
            "user_queries",
            "doctors",
            "medical_specialties",
            "auth.users",
        ] {
            sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", table))
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// Counts the rows of `table`
    pub async fn count(&self, table: &str) -> Result<i64, BoxError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn connect(url: &str) -> Result<PgPool, BoxError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(url)
        .await?;
    Ok(pool)
}

/// Global test database for shared integration tests
static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// Gets or creates a shared test database instance
///
/// # Panics
///
/// Panics if the database fails to initialize
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::new()
                    .await
                    .expect("Failed to create shared test database"),
            )
        })
        .await
        .clone()
}

/// Creates an isolated test database for a single test
pub async fn create_isolated_test_database() -> Result<TestDatabase, BoxError> {
    TestDatabase::new().await
}
