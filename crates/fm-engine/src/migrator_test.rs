use super::*;
use fm_core::Direction;

fn pair(version: u64, name: &str) -> [MigrationFile; 2] {
    [
        MigrationFile::new(
            version,
            name,
            Direction::Up,
            format!("CREATE TABLE {name} (id INTEGER);"),
        ),
        MigrationFile::new(version, name, Direction::Down, format!("DROP TABLE {name};")),
    ]
}

async fn duckdb_migrator(set: MigrationSet) -> Migrator {
    let registry = DriverRegistry::with_defaults();
    Migrator::connect(&registry, "duckdb://:memory:", set, MigratorConfig::default())
        .await
        .unwrap()
}

#[test]
fn test_interrupt_handle_is_shared_and_consumed_once() {
    let handle = InterruptHandle::new();
    let clone = handle.clone();
    assert!(!handle.is_interrupted());

    clone.interrupt();
    assert!(handle.is_interrupted());
    assert!(handle.take());
    assert!(!clone.is_interrupted());
    assert!(!handle.take());

    handle.interrupt();
    handle.reset();
    assert!(!clone.is_interrupted());
}

#[test]
fn test_default_config() {
    let config = MigratorConfig::default();
    assert_eq!(config.step_timeout, None);
    assert_eq!(config.pipe_capacity, pipe::DEFAULT_CAPACITY);
}

#[tokio::test]
async fn test_empty_batch_completes_without_steps() {
    let mut migrator = duckdb_migrator(MigrationSet::default()).await;
    assert_eq!(migrator.state(), BatchState::Idle);

    let report = migrator.up().await.unwrap();
    assert!(report.is_completed());
    assert!(report.applied.is_empty());
    assert_eq!(migrator.state(), BatchState::Completed);
}

#[tokio::test]
async fn test_status_lists_known_and_orphaned_versions() {
    let set = MigrationSet::new(pair(1, "alpha").into_iter().chain(pair(2, "beta"))).unwrap();
    let mut migrator = duckdb_migrator(set).await;
    assert!(migrator.migrate(1).await.unwrap().is_completed());

    // A version applied by someone else, with no file in this set
    let stray = MigrationFile::new(9u64, "stray", Direction::Up, "");
    assert!(migrator.run_step(&stray).await.is_clean());

    let status = migrator.status().await.unwrap();
    assert_eq!(
        status,
        vec![
            MigrationStatus {
                version: Version::new(1),
                name: Some("alpha".to_string()),
                applied: true,
            },
            MigrationStatus {
                version: Version::new(2),
                name: Some("beta".to_string()),
                applied: false,
            },
            MigrationStatus {
                version: Version::new(9),
                name: None,
                applied: true,
            },
        ]
    );
}

#[tokio::test]
async fn test_planning_error_runs_nothing() {
    let set = MigrationSet::new(pair(1, "alpha")).unwrap();
    let mut migrator = duckdb_migrator(set).await;

    let err = migrator.goto(Version::new(42)).await.unwrap_err();
    assert!(matches!(
        err,
        crate::EngineError::Planning(fm_core::CoreError::UnknownVersion { .. })
    ));
    assert_eq!(migrator.state(), BatchState::Idle);
    assert!(migrator.versions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_closed_driver_surfaces_driver_error() {
    let mut migrator = duckdb_migrator(MigrationSet::default()).await;
    migrator.close().await.unwrap();
    assert!(matches!(
        migrator.up().await,
        Err(crate::EngineError::Driver(DriverError::Closed { .. }))
    ));
}
