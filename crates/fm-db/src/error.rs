//! Error types for fm-db

use fm_core::Version;
use thiserror::Error;

/// Driver errors
///
/// `ContentExecution`, `LedgerConsistency` and `TaskFailed` are produced while
/// a step runs and travel through the step's pipe. The rest are returned
/// synchronously from lifecycle and query calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    Connection(String),

    /// The migration payload failed against the store (D002)
    #[error("[D002] Migration {version} failed: {message}")]
    ContentExecution { version: Version, message: String },

    /// Ledger and content may disagree, or the ledger write was refused (D003)
    #[error("[D003] Version ledger inconsistent at {version}: {message}")]
    LedgerConsistency { version: Version, message: String },

    /// Version ledger query failed (D004)
    #[error("[D004] Version ledger query failed: {0}")]
    Query(String),

    /// Operation after close (D005)
    #[error("[D005] Driver '{driver}' is closed")]
    Closed { driver: &'static str },

    /// Operation before initialize (D006)
    #[error("[D006] Driver '{driver}' has not been initialized")]
    NotInitialized { driver: &'static str },

    /// No driver for the descriptor scheme (D007)
    #[error("[D007] No driver registered for scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    /// Malformed connection descriptor (D008)
    #[error("[D008] Invalid connection descriptor '{descriptor}': {reason}")]
    InvalidDescriptor { descriptor: String, reason: String },

    /// Mutex poisoned (D009)
    #[error("[D009] Driver mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// The step task ended without reporting, e.g. it panicked (D010)
    #[error("[D010] Migration task for version {version} failed: {message}")]
    TaskFailed { version: Version, message: String },

    /// A blocking database call did not return, e.g. it panicked (D011)
    #[error("[D011] Driver worker failed: {0}")]
    Worker(String),
}

/// How bad a step signal is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The step failed cleanly; the ledger matches the store
    Error,
    /// The atomicity contract may have been violated
    Critical,
}

impl DriverError {
    /// Severity of the error
    pub fn severity(&self) -> Severity {
        match self {
            DriverError::LedgerConsistency { .. } | DriverError::TaskFailed { .. } => {
                Severity::Critical
            }
            _ => Severity::Error,
        }
    }

    /// Version the error is about, for step-level errors
    pub fn version(&self) -> Option<Version> {
        match self {
            DriverError::ContentExecution { version, .. }
            | DriverError::LedgerConsistency { version, .. }
            | DriverError::TaskFailed { version, .. } => Some(*version),
            _ => None,
        }
    }
}

/// Result type alias for DriverError
pub type DbResult<T> = Result<T, DriverError>;

impl<T> From<std::sync::PoisonError<T>> for DriverError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        DriverError::MutexPoisoned(err.to_string())
    }
}
