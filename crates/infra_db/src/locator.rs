//! Record type to resource resolution

use std::collections::BTreeMap;

use crate::config::{normalize_name, StoreConfig};

/// Record type that always lives on the default resource
pub const IDENTITY_RECORD_TYPE: &str = "user";

/// Maps record type names to logical resource keys
///
/// Resolution is a pure function of configuration and never fails: a type with
/// no dedicated route resolves to the default resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    default_resource: String,
    routes: BTreeMap<String, String>,
}

impl ResourceLocator {
    pub fn new(default_resource: impl AsRef<str>, routes: BTreeMap<String, String>) -> Self {
        Self {
            default_resource: normalize_name(default_resource.as_ref()),
            routes: routes
                .into_iter()
                .map(|(record_type, resource)| (normalize_name(&record_type), normalize_name(&resource)))
                .collect(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.default_resource(), config.routes().clone())
    }

    /// Resolves the resource key serving `record_type`
    ///
    /// # Example
    ///
    /// ```rust
    /// use infra_db::{ResourceLocator, StoreConfig};
    ///
    /// let config = StoreConfig::new("postgres://localhost/care")
    ///     .with_resource("analytics", "postgres://localhost/analytics")
    ///     .with_route("UserQuery", "analytics");
    /// let locator = ResourceLocator::from_config(&config);
    ///
    /// assert_eq!(locator.resolve("UserQuery"), "analytics");
    /// assert_eq!(locator.resolve("Doctor"), "primary");
    /// ```
    pub fn resolve(&self, record_type: &str) -> &str {
        let key = normalize_name(record_type);
        if key == IDENTITY_RECORD_TYPE {
            return &self.default_resource;
        }
        self.routes
            .get(&key)
            .map(String::as_str)
            .unwrap_or(&self.default_resource)
    }

    pub fn default_resource(&self) -> &str {
        &self.default_resource
    }
}
