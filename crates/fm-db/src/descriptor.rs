//! Connection descriptor parsing
//!
//! Descriptors look like `scheme://address?key=value&key2=value2`. The scheme
//! selects the driver; the address and parameters are the driver's business.

use crate::error::{DbResult, DriverError};
use std::fmt;

/// Name of the version ledger table unless overridden
pub const DEFAULT_MIGRATIONS_TABLE: &str = "schema_migrations";

/// Query parameter overriding the ledger table name
pub const MIGRATIONS_TABLE_PARAM: &str = "x-migrations-table";

/// A parsed connection descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Scheme, lowercased (e.g. `duckdb`, `sqlite3`)
    pub scheme: String,

    /// Backend address (e.g. a file path or `:memory:`)
    pub address: String,

    /// Query parameters in the order given
    pub params: Vec<(String, String)>,
}

impl ConnectionDescriptor {
    /// Parse `scheme://address[?params]`
    pub fn parse(descriptor: &str) -> DbResult<Self> {
        let invalid = |reason: &str| DriverError::InvalidDescriptor {
            descriptor: descriptor.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = descriptor
            .split_once("://")
            .ok_or_else(|| invalid("missing '://' separator"))?;
        if scheme.is_empty() {
            return Err(invalid("missing scheme"));
        }

        let (address, query) = match rest.split_once('?') {
            Some((address, query)) => (address, Some(query)),
            None => (rest, None),
        };
        if address.is_empty() {
            return Err(invalid("missing address"));
        }

        let mut params = Vec::new();
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.push((key.to_string(), value.to_string()));
        }

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            address: address.to_string(),
            params,
        })
    }

    /// Value of a query parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the address asks for an in-memory database
    pub fn is_memory(&self) -> bool {
        self.address == ":memory:"
    }

    /// Ledger table name, validated as a plain SQL identifier
    pub fn migrations_table(&self) -> DbResult<String> {
        let table = self
            .param(MIGRATIONS_TABLE_PARAM)
            .unwrap_or(DEFAULT_MIGRATIONS_TABLE);

        let mut chars = table.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(DriverError::InvalidDescriptor {
                descriptor: self.to_string(),
                reason: format!("'{table}' is not a valid table name"),
            });
        }
        Ok(table.to_string())
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.address)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory() {
        let d = ConnectionDescriptor::parse("duckdb://:memory:").unwrap();
        assert_eq!(d.scheme, "duckdb");
        assert!(d.is_memory());
        assert_eq!(d.migrations_table().unwrap(), DEFAULT_MIGRATIONS_TABLE);
    }

    #[test]
    fn test_parse_path_and_params() {
        let d = ConnectionDescriptor::parse("SQLite3:///var/lib/app.db?x-migrations-table=ledger&mode=rw")
            .unwrap();
        assert_eq!(d.scheme, "sqlite3");
        assert_eq!(d.address, "/var/lib/app.db");
        assert_eq!(d.param("mode"), Some("rw"));
        assert_eq!(d.migrations_table().unwrap(), "ledger");
        assert_eq!(
            d.to_string(),
            "sqlite3:///var/lib/app.db?x-migrations-table=ledger&mode=rw"
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["duckdb", "://foo", "duckdb://", "duckdb://?x=1"] {
            assert!(
                matches!(
                    ConnectionDescriptor::parse(bad),
                    Err(DriverError::InvalidDescriptor { .. })
                ),
                "expected {bad} to be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let d = ConnectionDescriptor::parse("duckdb://:memory:?x-migrations-table=a;drop").unwrap();
        assert!(d.migrations_table().is_err());
    }
}
