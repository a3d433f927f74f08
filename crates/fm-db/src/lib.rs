//! fm-db - Driver layer for Feathermigrate
//!
//! This crate provides the result [`pipe`] used to stream step outcomes, the
//! [`Driver`] trait every storage backend implements, the shared
//! [`SqlDriver`] with its DuckDB and SQLite backends, and the
//! [`DriverRegistry`] that maps connection descriptor schemes to drivers.

pub mod descriptor;
pub mod duckdb;
pub mod error;
pub(crate) mod ledger;
pub mod pipe;
pub mod registry;
pub mod sql;
pub mod sqlite;
pub(crate) mod statements;
pub mod traits;

pub use descriptor::ConnectionDescriptor;
pub use duckdb::DuckDbDriver;
pub use error::{DbResult, DriverError, Severity};
pub use pipe::{Pipe, PipeSender, PipeState};
pub use registry::DriverRegistry;
pub use sql::{Backend, SqlDriver};
pub use sqlite::SqliteDriver;
pub use traits::Driver;
