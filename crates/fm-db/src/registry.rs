//! Scheme to driver lookup

use crate::descriptor::ConnectionDescriptor;
use crate::duckdb::{self, DuckDbDriver};
use crate::error::{DbResult, DriverError};
use crate::sqlite::{self, SqliteDriver};
use crate::traits::Driver;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a fresh, uninitialized driver
pub type DriverFactory = Arc<dyn Fn() -> Box<dyn Driver> + Send + Sync>;

/// Maps descriptor schemes to driver factories
///
/// The registry is an ordinary value owned by whoever builds migrators;
/// there is no process-wide table.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: BTreeMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled DuckDB and SQLite drivers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for scheme in duckdb::SCHEMES {
            registry.register(scheme, || Box::new(DuckDbDriver::new()));
        }
        for scheme in sqlite::SCHEMES {
            registry.register(scheme, || Box::new(SqliteDriver::new()));
        }
        registry
    }

    /// Register `factory` for `scheme`, replacing any previous entry
    pub fn register<F>(&mut self, scheme: &str, factory: F)
    where
        F: Fn() -> Box<dyn Driver> + Send + Sync + 'static,
    {
        let scheme = scheme.to_ascii_lowercase();
        if self
            .factories
            .insert(scheme.clone(), Arc::new(factory))
            .is_some()
        {
            log::debug!("Replaced driver for scheme '{}'", scheme);
        }
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Whether a driver serves `scheme`
    pub fn supports(&self, scheme: &str) -> bool {
        self.factories.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Build an uninitialized driver for the descriptor's scheme
    pub fn create(&self, descriptor: &str) -> DbResult<Box<dyn Driver>> {
        let parsed = ConnectionDescriptor::parse(descriptor)?;
        let factory = self
            .factories
            .get(&parsed.scheme)
            .ok_or_else(|| DriverError::UnsupportedScheme {
                scheme: parsed.scheme.clone(),
            })?;
        Ok(factory())
    }

    /// Build and initialize a driver for `descriptor`
    pub async fn open(&self, descriptor: &str) -> DbResult<Arc<dyn Driver>> {
        let driver: Arc<dyn Driver> = Arc::from(self.create(descriptor)?);
        driver.initialize(descriptor).await?;
        log::debug!("Opened {} driver", driver.name());
        Ok(driver)
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
