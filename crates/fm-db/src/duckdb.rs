//! DuckDB driver
//!
//! DuckDB reports no transaction state through its Rust API, so content
//! that would end the step's transaction is caught only by the statement
//! scan that runs before every step.

use crate::descriptor::ConnectionDescriptor;
use crate::sql::{Backend, SqlDriver};
use duckdb::{params, Connection};
use std::path::Path;

/// Descriptor schemes served by [`DuckDbDriver`]
pub const SCHEMES: &[&str] = &["duckdb"];

/// DuckDB backend
pub struct DuckDb;

/// DuckDB migration driver
pub type DuckDbDriver = SqlDriver<DuckDb>;

impl Backend for DuckDb {
    type Conn = Connection;

    const NAME: &'static str = "duckdb";
    const SCHEMES: &'static [&'static str] = SCHEMES;

    fn open(descriptor: &ConnectionDescriptor) -> Result<Connection, String> {
        let conn = if descriptor.is_memory() {
            Connection::open_in_memory()
        } else {
            Connection::open(Path::new(&descriptor.address))
        };
        conn.map_err(|e| e.to_string())
    }

    fn execute_batch(conn: &Connection, sql: &str) -> Result<(), String> {
        conn.execute_batch(sql).map_err(|e| e.to_string())
    }

    fn execute_with_key(conn: &Connection, sql: &str, key: i64) -> Result<usize, String> {
        conn.execute(sql, params![key]).map_err(|e| e.to_string())
    }

    fn query_keys(conn: &Connection, sql: &str) -> Result<Vec<i64>, String> {
        let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(|e| e.to_string())?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())
    }

    fn query_max(conn: &Connection, sql: &str) -> Result<Option<i64>, String> {
        conn.query_row(sql, [], |row| row.get::<_, Option<i64>>(0))
            .map_err(|e| e.to_string())
    }

    fn close(conn: Connection) -> Result<(), String> {
        conn.close().map_err(|(_, e)| e.to_string())
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
