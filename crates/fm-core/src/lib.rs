//! fm-core - Core library for Feathermigrate
//!
//! This crate provides the migration record types, version ordering and
//! batch planning, migration file discovery, and project configuration used
//! by the driver, engine, and CLI crates.

pub mod batch;
pub mod config;
pub mod direction;
pub mod error;
pub mod migration;
pub mod set;
pub mod source;
pub mod version;

pub use batch::Batch;
pub use config::{Config, TargetConfig};
pub use direction::Direction;
pub use error::{CoreError, CoreResult};
pub use migration::MigrationFile;
pub use set::{sort_ascending, sort_descending, MigrationPair, MigrationSet};
pub use source::{create_migration, discover_migrations, load_migration_set, parse_file_name};
pub use version::Version;
