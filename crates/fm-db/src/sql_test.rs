//! Driver contract tests, run against every bundled backend.

use super::*;
use crate::duckdb::DuckDb;
use crate::pipe;
use crate::sqlite::Sqlite;
use crate::Severity;

pub(crate) const V1: u64 = 20060102150405;
pub(crate) const V2: u64 = 20060102150406;

fn memory_url<B: Backend>() -> String {
    format!("{}://:memory:", B::SCHEMES[0])
}

async fn memory_driver<B: Backend>() -> SqlDriver<B> {
    let driver = SqlDriver::<B>::new();
    driver.initialize(&memory_url::<B>()).await.unwrap();
    driver
}

/// Run one step and drain its pipe.
pub(crate) async fn run<B: Backend>(
    driver: &SqlDriver<B>,
    migration: &MigrationFile,
) -> Vec<DriverError> {
    let (tx, mut pipe) = pipe::create();
    driver.execute(migration, tx).await;
    pipe.drain().await.to_vec()
}

/// Whether `name` can be selected from, on any backend
pub(crate) fn relation_exists<B: Backend>(driver: &SqlDriver<B>, name: &str) -> bool {
    driver
        .with_session(|conn, _| {
            Ok(B::execute_batch(conn, &format!("SELECT * FROM {name} LIMIT 0")).is_ok())
        })
        .unwrap()
}

pub(crate) fn versions(values: &[u64]) -> Vec<Version> {
    values.iter().copied().map(Version::new).collect()
}

/// Expand each generic check into one `#[tokio::test]` per backend.
macro_rules! on_every_backend {
    ($($check:ident),* $(,)?) => {
        mod duckdb_backend {
            $(
                #[tokio::test]
                async fn $check() {
                    super::$check::<crate::duckdb::DuckDb>().await;
                }
            )*
        }

        mod sqlite_backend {
            $(
                #[tokio::test]
                async fn $check() {
                    super::$check::<crate::sqlite::Sqlite>().await;
                }
            )*
        }
    };
}

on_every_backend!(
    test_initialize_creates_empty_ledger,
    test_migrate_scenario,
    test_malformed_content_leaves_ledger_untouched,
    test_partial_content_is_rolled_back,
    test_duplicate_up_is_ledger_error_and_rolls_back_content,
    test_down_of_unapplied_version_is_refused,
    test_blank_content_only_touches_ledger,
    test_content_that_commits_is_refused,
    test_content_that_rolls_back_is_refused,
    test_execute_from_spawned_task,
    test_uninitialized_driver_fails_fast,
    test_close_is_single_use,
    test_custom_ledger_table,
    test_reinitialize_same_memory_target_keeps_ledger,
    test_reinitialize_other_target_replaces_connection,
);

async fn test_initialize_creates_empty_ledger<B: Backend>() {
    let driver = memory_driver::<B>().await;
    assert_eq!(driver.name(), B::NAME);
    assert!(relation_exists(&driver, "schema_migrations"));
    assert_eq!(driver.current_version().await.unwrap(), None);
    assert!(driver.applied_versions().await.unwrap().is_empty());
}

async fn test_migrate_scenario<B: Backend>() {
    let driver = memory_driver::<B>().await;

    let up = MigrationFile::new(V1, "foobar", Direction::Up, "CREATE TABLE yolo (id INTEGER PRIMARY KEY);")
        .with_source("/foobar", "20060102150405_foobar.up.sql");
    assert!(run(&driver, &up).await.is_empty());
    assert!(relation_exists(&driver, "yolo"));
    assert_eq!(driver.current_version().await.unwrap(), Some(Version::new(V1)));
    assert_eq!(driver.applied_versions().await.unwrap(), versions(&[V1]));

    let down = MigrationFile::new(V1, "foobar", Direction::Down, "DROP TABLE yolo;")
        .with_source("/foobar", "20060102150405_foobar.down.sql");
    assert!(run(&driver, &down).await.is_empty());
    assert!(!relation_exists(&driver, "yolo"));
    assert!(driver.applied_versions().await.unwrap().is_empty());

    // Named like an up file but declared Down: the declared direction wins.
    let broken = MigrationFile::new(
        V2,
        "foobar",
        Direction::Down,
        "CREATE TABLE error (
            THIS; WILL CAUSE; AN ERROR;
        )",
    )
    .with_source("/foobar", "20060102150406_foobar.up.sql");
    let errors = run(&driver, &broken).await;
    assert!(!errors.is_empty(), "expected the malformed step to fail");
    assert!(driver.applied_versions().await.unwrap().is_empty());
    assert_eq!(driver.current_version().await.unwrap(), None);

    driver.close().await.unwrap();
}

async fn test_malformed_content_leaves_ledger_untouched<B: Backend>() {
    let driver = memory_driver::<B>().await;
    let up = MigrationFile::new(V1, "foobar", Direction::Up, "CREATE TABLE yolo (id INTEGER);");
    assert!(run(&driver, &up).await.is_empty());

    let before = driver.applied_versions().await.unwrap();
    let broken = MigrationFile::new(
        V2,
        "foobar",
        Direction::Down,
        "CREATE TABLE error ( THIS; WILL CAUSE; AN ERROR; )",
    );
    let errors = run(&driver, &broken).await;

    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        DriverError::ContentExecution { version, .. } if *version == Version::new(V2)
    ));
    assert_eq!(driver.applied_versions().await.unwrap(), before);
}

async fn test_partial_content_is_rolled_back<B: Backend>() {
    let driver = memory_driver::<B>().await;
    let up = MigrationFile::new(
        V1,
        "partial",
        Direction::Up,
        "CREATE TABLE first_half (id INTEGER); INSERT INTO missing_table VALUES (1);",
    );
    let errors = run(&driver, &up).await;

    assert_eq!(errors.len(), 1);
    assert!(!relation_exists(&driver, "first_half"));
    assert!(driver.applied_versions().await.unwrap().is_empty());
}

async fn test_duplicate_up_is_ledger_error_and_rolls_back_content<B: Backend>() {
    let driver = memory_driver::<B>().await;
    let first = MigrationFile::new(V1, "a", Direction::Up, "CREATE TABLE a (id INTEGER);");
    assert!(run(&driver, &first).await.is_empty());

    let again = MigrationFile::new(V1, "b", Direction::Up, "CREATE TABLE b (id INTEGER);");
    let errors = run(&driver, &again).await;

    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], DriverError::LedgerConsistency { .. }));
    assert_eq!(errors[0].severity(), Severity::Critical);
    assert!(!relation_exists(&driver, "b"));
    assert_eq!(driver.applied_versions().await.unwrap(), versions(&[V1]));
}

async fn test_down_of_unapplied_version_is_refused<B: Backend>() {
    let driver = memory_driver::<B>().await;
    let setup = MigrationFile::new(V1, "keep", Direction::Up, "CREATE TABLE keep_me (id INTEGER);");
    assert!(run(&driver, &setup).await.is_empty());

    let down = MigrationFile::new(V2, "drop", Direction::Down, "DROP TABLE keep_me;");
    let errors = run(&driver, &down).await;

    assert!(matches!(
        errors.as_slice(),
        [DriverError::LedgerConsistency { .. }]
    ));
    assert!(relation_exists(&driver, "keep_me"));
    assert_eq!(driver.applied_versions().await.unwrap(), versions(&[V1]));
}

async fn test_blank_content_only_touches_ledger<B: Backend>() {
    let driver = memory_driver::<B>().await;
    let up = MigrationFile::new(V1, "empty", Direction::Up, "  \n");
    assert!(run(&driver, &up).await.is_empty());
    assert_eq!(driver.current_version().await.unwrap(), Some(Version::new(V1)));
}

async fn test_content_that_commits_is_refused<B: Backend>() {
    let driver = memory_driver::<B>().await;
    let setup = MigrationFile::new(V1, "base", Direction::Up, "CREATE TABLE base_table (id INTEGER);");
    assert!(run(&driver, &setup).await.is_empty());
    let before = driver.applied_versions().await.unwrap();

    let committing = MigrationFile::new(V2, "a", Direction::Up, "CREATE TABLE a (x INTEGER); COMMIT;");
    let errors = run(&driver, &committing).await;

    assert!(matches!(
        errors.as_slice(),
        [DriverError::ContentExecution { version, message }]
            if *version == Version::new(V2) && message.contains("COMMIT")
    ));
    assert_eq!(driver.applied_versions().await.unwrap(), before);
    assert!(!relation_exists(&driver, "a"));

    // The connection is still usable afterwards
    let next = MigrationFile::new(V2, "a", Direction::Up, "CREATE TABLE a (x INTEGER);");
    assert!(run(&driver, &next).await.is_empty());
    assert_eq!(driver.applied_versions().await.unwrap(), versions(&[V1, V2]));
}

async fn test_content_that_rolls_back_is_refused<B: Backend>() {
    let driver = memory_driver::<B>().await;
    let migration = MigrationFile::new(
        V1,
        "a",
        Direction::Up,
        "CREATE TABLE a (x INTEGER);\n-- undo\nROLLBACK;\nCREATE TABLE b (x INTEGER);",
    );
    let errors = run(&driver, &migration).await;

    assert!(matches!(
        errors.as_slice(),
        [DriverError::ContentExecution { .. }]
    ));
    assert!(driver.applied_versions().await.unwrap().is_empty());
    assert!(!relation_exists(&driver, "a"));
    assert!(!relation_exists(&driver, "b"));
}

async fn test_execute_from_spawned_task<B: Backend>() {
    let driver = Arc::new(memory_driver::<B>().await);
    let (tx, mut pipe) = pipe::create();
    let task_driver = Arc::clone(&driver);
    let migration = MigrationFile::new(V1, "spawned", Direction::Up, "CREATE TABLE spawned (id INTEGER);");

    let handle = tokio::spawn(async move { task_driver.execute(&migration, tx).await });
    assert!(pipe.drain().await.is_empty());
    handle.await.unwrap();
    assert_eq!(driver.applied_versions().await.unwrap(), versions(&[V1]));
}

async fn test_uninitialized_driver_fails_fast<B: Backend>() {
    let driver = SqlDriver::<B>::new();
    assert!(matches!(
        driver.applied_versions().await,
        Err(DriverError::NotInitialized { .. })
    ));
    assert!(matches!(
        driver.close().await,
        Err(DriverError::NotInitialized { .. })
    ));

    let m = MigrationFile::new(V1, "x", Direction::Up, "SELECT 1");
    let errors = run(&driver, &m).await;
    assert!(matches!(errors.as_slice(), [DriverError::NotInitialized { .. }]));
}

async fn test_close_is_single_use<B: Backend>() {
    let driver = memory_driver::<B>().await;
    driver.close().await.unwrap();

    assert!(matches!(driver.close().await, Err(DriverError::Closed { .. })));
    assert!(matches!(
        driver.current_version().await,
        Err(DriverError::Closed { .. })
    ));
    assert!(matches!(
        driver.initialize(&memory_url::<B>()).await,
        Err(DriverError::Closed { .. })
    ));
    let late = MigrationFile::new(V1, "late", Direction::Up, "SELECT 1;");
    assert!(matches!(
        run(&driver, &late).await.as_slice(),
        [DriverError::Closed { .. }]
    ));
}

async fn test_custom_ledger_table<B: Backend>() {
    let driver = SqlDriver::<B>::new();
    driver
        .initialize(&format!("{}?x-migrations-table=ledger", memory_url::<B>()))
        .await
        .unwrap();
    assert!(relation_exists(&driver, "ledger"));
    assert!(!relation_exists(&driver, "schema_migrations"));
}

async fn test_reinitialize_same_memory_target_keeps_ledger<B: Backend>() {
    let driver = memory_driver::<B>().await;
    let up = MigrationFile::new(V1, "kept", Direction::Up, "CREATE TABLE kept (id INTEGER);");
    assert!(run(&driver, &up).await.is_empty());

    driver.initialize(&memory_url::<B>()).await.unwrap();

    assert_eq!(driver.applied_versions().await.unwrap(), versions(&[V1]));
    assert!(relation_exists(&driver, "kept"));
}

async fn test_reinitialize_other_target_replaces_connection<B: Backend>() {
    let driver = memory_driver::<B>().await;
    let up = MigrationFile::new(V1, "first", Direction::Up, "CREATE TABLE first_db (id INTEGER);");
    assert!(run(&driver, &up).await.is_empty());

    // A different descriptor opens a new, empty in-memory database
    let other = format!("{}?x-migrations-table=other_ledger", memory_url::<B>());
    driver.initialize(&other).await.unwrap();

    assert!(driver.applied_versions().await.unwrap().is_empty());
    assert!(relation_exists(&driver, "other_ledger"));
    assert!(!relation_exists(&driver, "first_db"));
}

#[tokio::test]
async fn test_sqlite_reports_content_that_ended_the_transaction() {
    let driver = memory_driver::<Sqlite>().await;
    let migration = MigrationFile::new(V1, "early", Direction::Up, "");

    // Bypasses the statement scan to reach the store-side check
    let err = apply_content::<Sqlite>(
        &driver.session,
        &migration,
        "CREATE TABLE early (id INTEGER); COMMIT;",
    )
    .unwrap_err();

    assert!(matches!(
        err,
        DriverError::LedgerConsistency { version, .. } if version == Version::new(V1)
    ));
    assert_eq!(err.severity(), Severity::Critical);
    assert!(driver.applied_versions().await.unwrap().is_empty());
    // The payload itself did commit; the critical severity says so
    assert!(relation_exists(&driver, "early"));

    // No transaction is left open behind the failed step
    let next = MigrationFile::new(V2, "next", Direction::Up, "CREATE TABLE next_step (id INTEGER);");
    assert!(run(&driver, &next).await.is_empty());
    assert_eq!(driver.applied_versions().await.unwrap(), versions(&[V2]));
}

#[tokio::test]
async fn test_duckdb_failed_body_rolls_back_without_transaction_state() {
    let driver = memory_driver::<DuckDb>().await;
    let migration = MigrationFile::new(V1, "x", Direction::Up, "");

    let err = apply_content::<DuckDb>(
        &driver.session,
        &migration,
        "CREATE TABLE gone (id INTEGER); SELECT * FROM no_such_table;",
    )
    .unwrap_err();

    assert!(matches!(err, DriverError::ContentExecution { .. }));
    assert!(!relation_exists(&driver, "gone"));
    assert!(driver.applied_versions().await.unwrap().is_empty());
}
