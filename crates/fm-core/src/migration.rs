//! Migration record

use crate::direction::Direction;
use crate::error::{CoreError, CoreResult};
use crate::version::Version;
use std::fmt;
use std::sync::Arc;

/// One versioned, directional migration step.
///
/// Built once by discovery (or directly by callers) and treated as read-only
/// afterwards. `content` is handed to the driver verbatim; the core never
/// looks inside it. The payload is shared, so cloning a record to move it into
/// a step task does not copy the statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Path of the file the record was read from (display only)
    pub path: String,

    /// File name the record was read from (display only)
    pub file_name: String,

    /// Ordering and ledger key
    pub version: Version,

    /// Human-readable label
    pub name: String,

    /// Declared direction of the step
    pub direction: Direction,

    /// Raw instructions for the driver
    pub content: Arc<[u8]>,
}

impl MigrationFile {
    /// Create a record that did not come from disk.
    ///
    /// The file name is synthesised as `<version>_<name>.<direction>.sql` and
    /// the path is left empty.
    pub fn new(
        version: impl Into<Version>,
        name: impl Into<String>,
        direction: Direction,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        let version = version.into();
        let name = name.into();
        let file_name = format!("{}_{}.{}.sql", version, name, direction);
        Self {
            path: String::new(),
            file_name,
            version,
            name,
            direction,
            content: Arc::from(content.into()),
        }
    }

    /// Attach provenance information.
    pub fn with_source(mut self, path: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.path = path.into();
        self.file_name = file_name.into();
        self
    }

    /// The payload as text, for drivers that execute SQL.
    pub fn content_str(&self) -> CoreResult<&str> {
        std::str::from_utf8(&self.content).map_err(|_| CoreError::ContentEncoding {
            file_name: self.file_name.clone(),
        })
    }

    /// Whether the payload is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.content.iter().all(u8::is_ascii_whitespace)
    }
}

impl fmt::Display for MigrationFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.file_name, self.direction, self.version)
    }
}
