//! Error types for fm-core

use crate::direction::Direction;
use crate::version::Version;
use thiserror::Error;

/// Core error type for Feathermigrate
///
/// Everything here is detected before a single step runs, so nothing has been
/// applied to the target store when one of these is returned.
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Two records share a version and a direction
    #[error("[C001] Duplicate {direction} migration for version {version}: '{first}' and '{second}'")]
    DuplicateVersion {
        version: Version,
        direction: Direction,
        first: String,
        second: String,
    },

    /// C002: An applied version has no down migration to roll it back
    #[error("[C002] No down migration for applied version {version}")]
    MissingDownMigration { version: Version },

    /// C003: An applied version has no migration files at all
    #[error("[C003] Applied version {version} has no migration file")]
    MissingMigration { version: Version },

    /// C004: Target version does not exist in the migration set
    #[error("[C004] Unknown target version {version}")]
    UnknownVersion { version: Version },

    /// C005: File name does not follow `<version>_<name>.<up|down>.<ext>`
    #[error("[C005] Invalid migration file name '{file_name}': {reason}")]
    InvalidFileName { file_name: String, reason: String },

    /// C006: Migration directory missing
    #[error("[C006] Migration directory not found: {path}")]
    MigrationDirNotFound { path: String },

    /// C007: Configuration file not found
    #[error("[C007] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C008: Invalid configuration value
    #[error("[C008] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C009: Migration payload is not UTF-8 text
    #[error("[C009] Migration '{file_name}' is not valid UTF-8")]
    ContentEncoding { file_name: String },

    /// C010: Migration file already exists
    #[error("[C010] Migration file already exists: {path}")]
    FileExists { path: String },

    /// C011: IO error with file path context
    #[error("[C011] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C012: YAML parse error
    #[error("[C012] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
