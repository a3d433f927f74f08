//! Migration file discovery and file name parsing
//!
//! Migrations live in a single directory as pairs of files named
//! `<version>_<name>.up.<ext>` and `<version>_<name>.down.<ext>`.

use crate::direction::Direction;
use crate::error::{CoreError, CoreResult};
use crate::migration::MigrationFile;
use crate::set::MigrationSet;
use crate::version::Version;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Default migration file extension
pub const DEFAULT_EXTENSION: &str = "sql";

fn file_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)_(.+)\.(up|down)\.([A-Za-z0-9]+)$")
            .unwrap_or_else(|e| unreachable!("static migration file pattern is valid: {e}"))
    })
}

/// Components of a migration file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileName {
    pub version: Version,
    pub name: String,
    pub direction: Direction,
    pub extension: String,
}

/// Parse `<version>_<name>.<up|down>.<ext>`.
///
/// # Example
/// - `20060102150405_foobar.up.sql` → version 20060102150405, name "foobar", Up
pub fn parse_file_name(file_name: &str) -> CoreResult<ParsedFileName> {
    let invalid = |reason: &str| CoreError::InvalidFileName {
        file_name: file_name.to_string(),
        reason: reason.to_string(),
    };

    let caps = file_name_pattern()
        .captures(file_name)
        .ok_or_else(|| invalid("expected <version>_<name>.<up|down>.<ext>"))?;

    let version = caps[1]
        .parse::<Version>()
        .map_err(|e| invalid(&format!("version out of range: {e}")))?;
    let direction =
        Direction::parse(&caps[3]).ok_or_else(|| invalid("direction must be 'up' or 'down'"))?;

    Ok(ParsedFileName {
        version,
        name: caps[2].to_string(),
        direction,
        extension: caps[4].to_string(),
    })
}

/// Read every migration with the given extension from `dir`.
///
/// Files with other extensions and hidden files are skipped. A file with the
/// right extension but an unparsable name is an error rather than being
/// silently ignored. The result is sorted by version, Up before Down.
pub fn discover_migrations(dir: &Path, extension: &str) -> CoreResult<Vec<MigrationFile>> {
    if !dir.is_dir() {
        return Err(CoreError::MigrationDirNotFound {
            path: dir.display().to_string(),
        });
    }

    let io_err = |path: &Path, source: std::io::Error| CoreError::IoWithPath {
        path: path.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            log::warn!("Skipping non UTF-8 file name in {}", dir.display());
            continue;
        };
        if file_name.starts_with('.') {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            log::debug!("Skipping {file_name}: extension is not .{extension}");
            continue;
        }

        let parsed = parse_file_name(file_name)?;
        let content = fs::read(&path).map_err(|e| io_err(&path, e))?;
        files.push(
            MigrationFile::new(parsed.version, parsed.name, parsed.direction, content)
                .with_source(path.display().to_string(), file_name),
        );
    }

    files.sort_by_key(|f| (f.version, f.direction));
    log::debug!("Discovered {} migration files in {}", files.len(), dir.display());
    Ok(files)
}

/// Discover migrations in `dir` and pair them into a [`MigrationSet`].
pub fn load_migration_set(dir: &Path, extension: &str) -> CoreResult<MigrationSet> {
    MigrationSet::new(discover_migrations(dir, extension)?)
}

/// Write an empty Up/Down pair for `name` at `version`.
///
/// Spaces in the name become underscores. Returns the Up and Down paths.
pub fn create_migration(
    dir: &Path,
    name: &str,
    extension: &str,
    version: Version,
) -> CoreResult<(PathBuf, PathBuf)> {
    let name = name.trim().replace(' ', "_");
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(CoreError::InvalidFileName {
            file_name: name,
            reason: "migration name must be non-empty and contain no path separators".to_string(),
        });
    }

    fs::create_dir_all(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })?;

    let path_for = |direction: Direction| {
        dir.join(format!("{}_{}.{}.{}", version, name, direction, extension))
    };
    let up = path_for(Direction::Up);
    let down = path_for(Direction::Down);

    for path in [&up, &down] {
        if path.exists() {
            return Err(CoreError::FileExists {
                path: path.display().to_string(),
            });
        }
    }
    for path in [&up, &down] {
        fs::write(path, "").map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
    }

    Ok((up, down))
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
