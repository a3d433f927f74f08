//! Configuration types and parsing for fm.yml

use crate::error::{CoreError, CoreResult};
use crate::source::DEFAULT_EXTENSION;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "fm.yml";

/// Project configuration from fm.yml
///
/// Every field is optional; a project without a config file behaves like
/// `Config::default()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding migration files, relative to the project root
    #[serde(default = "default_migrations_path")]
    pub migrations_path: String,

    /// Connection descriptor, e.g. `duckdb://warehouse.duckdb`
    #[serde(default)]
    pub database_url: Option<String>,

    /// Migration file extension (without the dot)
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Abort a batch when one step takes longer than this
    #[serde(default)]
    pub step_timeout_secs: Option<u64>,

    /// Named connection targets (e.g. dev, staging, prod)
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Connection descriptor for this target
    pub database_url: String,

    /// Step timeout override
    #[serde(default)]
    pub step_timeout_secs: Option<u64>,
}

fn default_migrations_path() -> String {
    "migrations".to_string()
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            migrations_path: default_migrations_path(),
            database_url: None,
            extension: default_extension(),
            step_timeout_secs: None,
            targets: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `fm.yml` from a project directory, or the defaults when absent
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            log::debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |message: String| Err(CoreError::ConfigInvalid { message });

        if self.migrations_path.trim().is_empty() {
            return invalid("migrations_path must not be empty".to_string());
        }
        if self.extension.is_empty() || self.extension.contains('.') {
            return invalid(format!(
                "extension '{}' must be non-empty and must not contain '.'",
                self.extension
            ));
        }
        if let Some(url) = &self.database_url {
            validate_url("database_url", url)?;
        }
        if self.step_timeout_secs == Some(0) {
            return invalid("step_timeout_secs must be greater than zero".to_string());
        }
        for (name, target) in &self.targets {
            validate_url(&format!("targets.{name}.database_url"), &target.database_url)?;
            if target.step_timeout_secs == Some(0) {
                return invalid(format!(
                    "targets.{name}.step_timeout_secs must be greater than zero"
                ));
            }
        }
        Ok(())
    }

    /// Resolve the connection descriptor for an optional named target.
    ///
    /// A named target must exist; without one, `database_url` is used.
    pub fn database_url(&self, target: Option<&str>) -> CoreResult<Option<String>> {
        match target {
            Some(name) => self
                .targets
                .get(name)
                .map(|t| Some(t.database_url.clone()))
                .ok_or_else(|| CoreError::ConfigInvalid {
                    message: format!(
                        "unknown target '{}' (available: {})",
                        name,
                        self.target_names().join(", ")
                    ),
                }),
            None => Ok(self.database_url.clone()),
        }
    }

    /// Step timeout, with the target's override taking precedence
    pub fn step_timeout(&self, target: Option<&str>) -> Option<Duration> {
        target
            .and_then(|name| self.targets.get(name))
            .and_then(|t| t.step_timeout_secs)
            .or(self.step_timeout_secs)
            .map(Duration::from_secs)
    }

    /// Absolute path of the migrations directory
    pub fn migrations_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_path)
    }

    /// Sorted target names
    pub fn target_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn validate_url(field: &str, url: &str) -> CoreResult<()> {
    match url.split_once("://") {
        Some((scheme, _)) if !scheme.is_empty() => Ok(()),
        _ => Err(CoreError::ConfigInvalid {
            message: format!("{field} '{url}' must look like <scheme>://<address>"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
