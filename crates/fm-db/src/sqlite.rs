//! SQLite driver
//!
//! SQLite rolls some failed transactions back on its own and exposes that
//! through autocommit mode, so the shared driver skips the explicit
//! `ROLLBACK` once the transaction is gone and notices content that ended
//! it early.

use crate::descriptor::ConnectionDescriptor;
use crate::sql::{Backend, SqlDriver};
use rusqlite::{params, Connection};

/// Descriptor schemes served by [`SqliteDriver`]
pub const SCHEMES: &[&str] = &["sqlite3", "sqlite"];

/// SQLite backend
pub struct Sqlite;

/// SQLite migration driver
pub type SqliteDriver = SqlDriver<Sqlite>;

impl Backend for Sqlite {
    type Conn = Connection;

    const NAME: &'static str = "sqlite3";
    const SCHEMES: &'static [&'static str] = SCHEMES;

    fn open(descriptor: &ConnectionDescriptor) -> Result<Connection, String> {
        let conn = if descriptor.is_memory() {
            Connection::open_in_memory()
        } else {
            Connection::open(&descriptor.address)
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

    fn in_transaction(conn: &Connection) -> Option<bool> {
        Some(!conn.is_autocommit())
    }

    fn close(conn: Connection) -> Result<(), String> {
        conn.close().map_err(|(_, e)| e.to_string())
    }
}

#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;
