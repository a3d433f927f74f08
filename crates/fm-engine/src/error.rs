//! Error types for fm-engine

use fm_core::CoreError;
use fm_db::DriverError;
use thiserror::Error;

/// Engine errors
///
/// Step failures are not errors at this level: they end up in the
/// [`BatchReport`](crate::BatchReport) of an aborted batch. These variants
/// cover what stops a batch before its first step runs.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Planning failed; nothing was applied (G001)
    #[error("[G001] Cannot plan migrations: {0}")]
    Planning(#[from] CoreError),

    /// Driver lifecycle or ledger query failed (G002)
    #[error("[G002] {0}")]
    Driver(#[from] DriverError),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;
