//! Shared driver for SQL backends
//!
//! [`SqlDriver`] owns one connection of a [`Backend`] and implements the
//! [`Driver`] contract on top of it. Each step runs inside one transaction:
//! `BEGIN`, the migration payload, the ledger insert or delete, `COMMIT`.
//! Any failure rolls the whole transaction back, so the ledger and the
//! schema never disagree.
//!
//! Backend calls are synchronous. They run on tokio's blocking pool, so a
//! long statement never stalls the runtime and a step deadline can fire
//! while the statement is still running.

use crate::descriptor::ConnectionDescriptor;
use crate::error::{DbResult, DriverError};
use crate::ledger::{self, LedgerSql};
use crate::pipe::PipeSender;
use crate::statements;
use crate::traits::Driver;
use async_trait::async_trait;
use fm_core::{Direction, MigrationFile, Version};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

/// Connection-level operations a SQL backend provides
///
/// Errors are the store's own diagnostics; [`SqlDriver`] decides which
/// [`DriverError`] they become.
pub trait Backend: Send + Sync + 'static {
    type Conn: Send + 'static;

    /// Driver name used in logs and errors
    const NAME: &'static str;

    /// Descriptor schemes served by this backend
    const SCHEMES: &'static [&'static str];

    fn open(descriptor: &ConnectionDescriptor) -> Result<Self::Conn, String>;

    fn execute_batch(conn: &Self::Conn, sql: &str) -> Result<(), String>;

    /// Run a one-parameter statement, returning the affected row count
    fn execute_with_key(conn: &Self::Conn, sql: &str, key: i64) -> Result<usize, String>;

    fn query_keys(conn: &Self::Conn, sql: &str) -> Result<Vec<i64>, String>;

    fn query_max(conn: &Self::Conn, sql: &str) -> Result<Option<i64>, String>;

    /// Whether an explicit transaction is open, when the backend can tell
    fn in_transaction(_conn: &Self::Conn) -> Option<bool> {
        None
    }

    fn close(conn: Self::Conn) -> Result<(), String>;
}

pub(crate) enum Session<C> {
    Uninitialized,
    Open {
        conn: C,
        ledger: LedgerSql,
        descriptor: ConnectionDescriptor,
    },
    Closed,
}

/// Migration driver over one connection of backend `B`
pub struct SqlDriver<B: Backend> {
    session: Arc<Mutex<Session<B::Conn>>>,
    backend: PhantomData<fn() -> B>,
}

impl<B: Backend> Default for SqlDriver<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> SqlDriver<B> {
    /// Driver name used in logs and errors
    pub const NAME: &'static str = B::NAME;

    /// Descriptor schemes served by this driver
    pub const SCHEMES: &'static [&'static str] = B::SCHEMES;

    /// Create an uninitialized driver
    pub fn new() -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::Uninitialized)),
            backend: PhantomData,
        }
    }

    /// Run `body` against the open connection on the calling thread
    #[cfg(test)]
    pub(crate) fn with_session<T>(
        &self,
        body: impl FnOnce(&B::Conn, &LedgerSql) -> DbResult<T>,
    ) -> DbResult<T> {
        with_session::<B, T>(&self.session, body)
    }

    /// Run `work` on the blocking pool with access to the session
    async fn blocking<T, F>(&self, work: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Mutex<Session<B::Conn>>) -> DbResult<T> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || work(&*session))
            .await
            .map_err(|e| DriverError::Worker(e.to_string()))?
    }
}

fn with_session<B: Backend, T>(
    session: &Mutex<Session<B::Conn>>,
    body: impl FnOnce(&B::Conn, &LedgerSql) -> DbResult<T>,
) -> DbResult<T> {
    let session = session.lock()?;
    match &*session {
        Session::Open { conn, ledger, .. } => body(conn, ledger),
        Session::Uninitialized => Err(DriverError::NotInitialized { driver: B::NAME }),
        Session::Closed => Err(DriverError::Closed { driver: B::NAME }),
    }
}

fn connect<B: Backend>(
    session: &Mutex<Session<B::Conn>>,
    descriptor: ConnectionDescriptor,
) -> DbResult<()> {
    let ledger = LedgerSql::new(descriptor.migrations_table()?);
    let mut session = session.lock()?;

    match &*session {
        Session::Closed => return Err(DriverError::Closed { driver: B::NAME }),
        Session::Open {
            conn,
            descriptor: current,
            ..
        } if *current == descriptor => {
            // Same target: keep the connection, it may be the only handle
            // on an in-memory database.
            create_ledger::<B>(conn, &ledger)?;
            log::debug!("{}: already connected to {}", B::NAME, descriptor.address);
            return Ok(());
        }
        _ => {}
    }

    let conn = B::open(&descriptor)
        .map_err(|e| DriverError::Connection(format!("{}: {}", e, descriptor.address)))?;
    create_ledger::<B>(&conn, &ledger)?;
    log::debug!("{}: connected to {}", B::NAME, descriptor.address);

    let previous = std::mem::replace(
        &mut *session,
        Session::Open {
            conn,
            ledger,
            descriptor,
        },
    );
    if let Session::Open { conn, descriptor, .. } = previous {
        log::debug!("{}: closing previous connection to {}", B::NAME, descriptor.address);
        if let Err(e) = B::close(conn) {
            log::warn!("{}: failed to close previous connection: {}", B::NAME, e);
        }
    }
    Ok(())
}

fn create_ledger<B: Backend>(conn: &B::Conn, ledger: &LedgerSql) -> DbResult<()> {
    B::execute_batch(conn, &ledger.create_table()).map_err(|e| {
        DriverError::Connection(format!("failed to create {} table: {e}", ledger.table()))
    })
}

/// Apply content and ledger update in one transaction
fn apply<B: Backend>(session: &Mutex<Session<B::Conn>>, migration: &MigrationFile) -> DbResult<()> {
    let sql = migration
        .content_str()
        .map_err(|e| DriverError::ContentExecution {
            version: migration.version,
            message: e.to_string(),
        })?;
    if let Some(keyword) = statements::transaction_control(sql) {
        return Err(DriverError::ContentExecution {
            version: migration.version,
            message: format!(
                "{keyword} is not allowed in migration content; \
                 each step already runs in its own transaction"
            ),
        });
    }
    apply_content::<B>(session, migration, sql)
}

/// Run `sql` for `migration` and update the ledger, in one transaction
fn apply_content<B: Backend>(
    session: &Mutex<Session<B::Conn>>,
    migration: &MigrationFile,
    sql: &str,
) -> DbResult<()> {
    let version = migration.version;
    let key = ledger::ledger_key(version)?;

    with_session::<B, _>(session, |conn, ledger| {
        transaction::<B, _>(conn, version, |conn| {
            if !sql.trim().is_empty() {
                B::execute_batch(conn, sql)
                    .map_err(|message| DriverError::ContentExecution { version, message })?;
            }
            if B::in_transaction(conn) == Some(false) {
                return Err(DriverError::LedgerConsistency {
                    version,
                    message: "migration content ended the step's transaction; \
                              its changes were committed without a ledger update"
                        .to_string(),
                });
            }
            record_version::<B>(conn, ledger, migration.direction, version, key)
        })
    })
}

/// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
/// error.
fn transaction<B: Backend, T>(
    conn: &B::Conn,
    version: Version,
    body: impl FnOnce(&B::Conn) -> DbResult<T>,
) -> DbResult<T> {
    B::execute_batch(conn, "BEGIN TRANSACTION").map_err(|e| DriverError::ContentExecution {
        version,
        message: format!("BEGIN failed: {e}"),
    })?;

    let value = match body(conn) {
        Ok(value) => value,
        Err(err) => return Err(rollback::<B>(conn, version, err)),
    };

    if let Err(commit_err) = B::execute_batch(conn, "COMMIT") {
        // A failed COMMIT normally ends the transaction already.
        if B::in_transaction(conn) != Some(false) {
            if let Err(e) = B::execute_batch(conn, "ROLLBACK") {
                log::debug!("{}: ROLLBACK after failed COMMIT: {}", B::NAME, e);
            }
        }
        return Err(DriverError::ContentExecution {
            version,
            message: format!("COMMIT failed: {commit_err}"),
        });
    }
    Ok(value)
}

fn rollback<B: Backend>(conn: &B::Conn, version: Version, err: DriverError) -> DriverError {
    if B::in_transaction(conn) == Some(false) {
        log::debug!("{}: transaction already ended by the store", B::NAME);
        return err;
    }
    match B::execute_batch(conn, "ROLLBACK") {
        Ok(()) => err,
        Err(rollback_err) => DriverError::LedgerConsistency {
            version,
            message: format!("{err}; ROLLBACK failed: {rollback_err}"),
        },
    }
}

fn record_version<B: Backend>(
    conn: &B::Conn,
    ledger: &LedgerSql,
    direction: Direction,
    version: Version,
    key: i64,
) -> DbResult<()> {
    let refused = |message: String| DriverError::LedgerConsistency { version, message };
    match direction {
        Direction::Up => {
            B::execute_with_key(conn, &ledger.insert(), key)
                .map_err(|e| refused(format!("failed to record version: {e}")))?;
        }
        Direction::Down => {
            let removed = B::execute_with_key(conn, &ledger.delete(), key)
                .map_err(|e| refused(format!("failed to remove version: {e}")))?;
            if removed == 0 {
                return Err(refused("version is not recorded as applied".to_string()));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl<B: Backend> Driver for SqlDriver<B> {
    async fn initialize(&self, descriptor: &str) -> DbResult<()> {
        let descriptor = ConnectionDescriptor::parse(descriptor)?;
        if !B::SCHEMES.contains(&descriptor.scheme.as_str()) {
            return Err(DriverError::InvalidDescriptor {
                descriptor: descriptor.to_string(),
                reason: format!("scheme must be one of {}", B::SCHEMES.join(", ")),
            });
        }
        self.blocking(move |session| connect::<B>(session, descriptor))
            .await
    }

    async fn execute(&self, migration: &MigrationFile, pipe: PipeSender<DriverError>) {
        log::debug!("{}: applying {}", B::NAME, migration);
        let version = migration.version;
        let step = migration.clone();
        let session = Arc::clone(&self.session);

        let result = tokio::task::spawn_blocking(move || apply::<B>(&session, &step))
            .await
            .unwrap_or_else(|e| {
                Err(DriverError::TaskFailed {
                    version,
                    message: e.to_string(),
                })
            });

        if let Err(err) = result {
            log::debug!("{}: {} failed: {}", B::NAME, migration.file_name, err);
            pipe.send(err).await;
        }
        pipe.close();
    }

    async fn current_version(&self) -> DbResult<Option<Version>> {
        let max = self
            .blocking(|session| {
                with_session::<B, _>(session, |conn, ledger| {
                    B::query_max(conn, &ledger.select_max()).map_err(DriverError::Query)
                })
            })
            .await?;
        ledger::version_from_max(max)
    }

    async fn applied_versions(&self) -> DbResult<Vec<Version>> {
        let rows = self
            .blocking(|session| {
                with_session::<B, _>(session, |conn, ledger| {
                    B::query_keys(conn, &ledger.select_all()).map_err(DriverError::Query)
                })
            })
            .await?;
        ledger::versions_from_rows(rows)
    }

    async fn close(&self) -> DbResult<()> {
        self.blocking(|session| {
            let mut session = session.lock()?;
            match std::mem::replace(&mut *session, Session::Closed) {
                Session::Open { conn, .. } => {
                    B::close(conn)
                        .map_err(|e| DriverError::Connection(format!("close failed: {e}")))?;
                    log::debug!("{}: connection closed", B::NAME);
                    Ok(())
                }
                Session::Uninitialized => {
                    *session = Session::Uninitialized;
                    Err(DriverError::NotInitialized { driver: B::NAME })
                }
                Session::Closed => Err(DriverError::Closed { driver: B::NAME }),
            }
        })
        .await
    }

    fn name(&self) -> &'static str {
        B::NAME
    }
}

#[cfg(test)]
#[path = "sql_test.rs"]
pub(crate) mod tests;
