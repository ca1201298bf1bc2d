//! Health check and its plain-text report

use infra_db::{health, HealthReport, PoolRegistry, ResourceLocator, StoreConfig};

/// Result of one `store-admin` run
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub report: HealthReport,
    /// Snapshot generation the sweep ran against
    pub generation: u64,
}

impl CheckOutcome {
    pub fn is_healthy(&self) -> bool {
        self.report.is_healthy()
    }
}

/// Builds the registry's pools and pings each one once
///
/// # Errors
///
/// Fails when a pool cannot be constructed, for instance on a malformed
/// connection string.
pub async fn check(registry: &PoolRegistry) -> anyhow::Result<CheckOutcome> {
    let snapshot = registry.get_pool(false).await?;
    let report = health::sweep(&snapshot).await;
    tracing::info!(
        resources = report.len(),
        healthy = report.is_healthy(),
        generation = snapshot.generation(),
        "Health sweep finished"
    );
    Ok(CheckOutcome {
        report,
        generation: snapshot.generation(),
    })
}

/// Renders the configured routes and per-resource health as text
pub fn render(config: &StoreConfig, outcome: &CheckOutcome) -> String {
    let locator = ResourceLocator::from_config(config);
    let mut lines = vec![format!("default resource: {}", locator.default_resource())];
    if config.routes().is_empty() {
        lines.push("routes: none".to_string());
    } else {
        lines.push("routes:".to_string());
        for (record_type, resource) in config.routes() {
            lines.push(format!("  {:<24} -> {}", record_type, resource));
        }
    }

    lines.push(format!("resources (generation {}):", outcome.generation));
    for (key, status) in outcome.report.iter() {
        lines.push(format!(
            "  {:<16} {:<9} size={} idle={}",
            key,
            if status.healthy { "healthy" } else { "UNHEALTHY" },
            status.size,
            status.idle
        ));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
