//! fm-engine - Migration orchestrator for Feathermigrate
//!
//! The [`Migrator`] turns a [`fm_core::MigrationSet`] and the applied
//! versions reported by a [`fm_db::Driver`] into batches, runs each step on
//! its own task, and drains the step's pipe before moving on. The first
//! failing step aborts the batch.

pub mod error;
pub mod migrator;
pub mod report;

pub use error::{EngineError, EngineResult};
pub use migrator::{InterruptHandle, MigrationStatus, Migrator, MigratorConfig};
pub use report::{Abort, AbortReason, BatchReport, BatchState, StepOutcome, StepReport};
