//! Care Directory Store - Admin Binary
//!
//! Loads the store configuration, builds one pool per configured resource,
//! pings each pool once and prints the result. Exits non-zero when any
//! resource is unhealthy.
//!
//! # Usage
//!
//! ```bash
//! STORE_DATABASE_URL=postgres://... cargo run --bin store-admin
//!
//! # With a second resource serving user queries
//! STORE_DATABASE_URL=postgres://... \
//! PG_RESOURCE_ANALYTICS=postgres://... \
//! PG_ROUTE_USER_QUERY=analytics \
//! cargo run --bin store-admin
//! ```
//!
//! See `infra_db::config` for every recognised variable.

use anyhow::Context;
use infra_db::{PoolRegistry, StoreConfig};
use interface_admin::{check, render};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = StoreConfig::from_env().context("Failed to load store configuration")?;

    init_tracing(config.log_level());

    tracing::info!(
        default_resource = config.default_resource(),
        resources = config.resources().len(),
        routes = config.routes().len(),
        "Checking care directory store"
    );

    let registry = PoolRegistry::postgres(&config);
    let outcome = check(&registry).await?;

    print!("{}", render(&config, &outcome));

    if !outcome.is_healthy() {
        anyhow::bail!(
            "unhealthy resources: {}",
            outcome.report.unhealthy().join(", ")
        );
    }
    Ok(())
}

/// Initializes the tracing subscriber, preferring `RUST_LOG` over the
/// configured level
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
