//! Version ledger statements shared by the SQL drivers.
//!
//! The ledger is one table with one column, `version`, holding the applied
//! versions. Storage order is not relied on; reads are sorted here.

use crate::error::{DbResult, DriverError};
use fm_core::Version;

/// SQL text for one ledger table
#[derive(Debug, Clone)]
pub(crate) struct LedgerSql {
    table: String,
}

impl LedgerSql {
    pub(crate) fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub(crate) fn table(&self) -> &str {
        &self.table
    }

    pub(crate) fn create_table(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (version BIGINT PRIMARY KEY)",
            self.table
        )
    }

    pub(crate) fn insert(&self) -> String {
        format!("INSERT INTO {} (version) VALUES (?)", self.table)
    }

    pub(crate) fn delete(&self) -> String {
        format!("DELETE FROM {} WHERE version = ?", self.table)
    }

    pub(crate) fn select_all(&self) -> String {
        format!("SELECT version FROM {}", self.table)
    }

    pub(crate) fn select_max(&self) -> String {
        format!("SELECT MAX(version) FROM {}", self.table)
    }
}

/// Ledger column value for a version.
///
/// Checked before a step touches the store, so an unstorable version never
/// leaves content applied without a ledger row.
pub(crate) fn ledger_key(version: Version) -> DbResult<i64> {
    version
        .to_i64()
        .ok_or_else(|| DriverError::LedgerConsistency {
            version,
            message: "version does not fit the ledger's BIGINT column".to_string(),
        })
}

/// Convert raw ledger rows into sorted versions
pub(crate) fn versions_from_rows(rows: Vec<i64>) -> DbResult<Vec<Version>> {
    let mut versions = rows
        .into_iter()
        .map(|raw| {
            Version::from_i64(raw)
                .ok_or_else(|| DriverError::Query(format!("negative version {raw} in ledger")))
        })
        .collect::<DbResult<Vec<_>>>()?;
    versions.sort_unstable();
    versions.dedup();
    Ok(versions)
}

/// Convert the result of `SELECT MAX(version)`
pub(crate) fn version_from_max(max: Option<i64>) -> DbResult<Option<Version>> {
    max.map(|raw| {
        Version::from_i64(raw)
            .ok_or_else(|| DriverError::Query(format!("negative version {raw} in ledger")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_use_table_name() {
        let sql = LedgerSql::new("ledger");
        assert_eq!(
            sql.create_table(),
            "CREATE TABLE IF NOT EXISTS ledger (version BIGINT PRIMARY KEY)"
        );
        assert_eq!(sql.insert(), "INSERT INTO ledger (version) VALUES (?)");
        assert_eq!(sql.delete(), "DELETE FROM ledger WHERE version = ?");
    }

    #[test]
    fn test_versions_from_rows_sorts() {
        let versions = versions_from_rows(vec![3, 1, 2]).unwrap();
        assert_eq!(
            versions,
            vec![Version::new(1), Version::new(2), Version::new(3)]
        );
        assert!(versions_from_rows(vec![-5]).is_err());
    }

    #[test]
    fn test_ledger_key_range() {
        assert_eq!(ledger_key(Version::new(42)).unwrap(), 42);
        assert!(matches!(
            ledger_key(Version::new(u64::MAX)),
            Err(DriverError::LedgerConsistency { .. })
        ));
    }

    #[test]
    fn test_version_from_max() {
        assert_eq!(version_from_max(None).unwrap(), None);
        assert_eq!(version_from_max(Some(7)).unwrap(), Some(Version::new(7)));
    }
}
