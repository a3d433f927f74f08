//! Driver trait definition

use crate::error::{DbResult, DriverError};
use crate::pipe::PipeSender;
use async_trait::async_trait;
use fm_core::{MigrationFile, Version};

/// Storage backend abstraction for Feathermigrate
///
/// One implementation per backend technology. The driver owns its
/// connection and its version ledger; nothing else writes the ledger.
///
/// Implementations must be Send + Sync: the orchestrator shares one driver
/// with the task running each step.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Connect using a descriptor such as `duckdb://:memory:` and make sure
    /// the ledger table exists.
    ///
    /// Calling it again with the same descriptor keeps the open connection.
    /// A different descriptor replaces it; for `:memory:` targets that means
    /// a new, empty database and ledger.
    async fn initialize(&self, descriptor: &str) -> DbResult<()>;

    /// Apply one migration step, reporting through `pipe`.
    ///
    /// Content and ledger update commit together or not at all. On success
    /// the pipe is closed without signals; on failure exactly one error is
    /// sent before closing. Never panics on store errors.
    async fn execute(&self, migration: &MigrationFile, pipe: PipeSender<DriverError>);

    /// Greatest applied version, or `None` when nothing is applied
    async fn current_version(&self) -> DbResult<Option<Version>> {
        Ok(self.applied_versions().await?.last().copied())
    }

    /// Every applied version, ascending
    async fn applied_versions(&self) -> DbResult<Vec<Version>>;

    /// Release the connection. Later calls fail with [`DriverError::Closed`].
    async fn close(&self) -> DbResult<()>;

    /// Backend identifier for logging
    fn name(&self) -> &'static str;
}
