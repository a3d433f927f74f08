use super::*;

fn step(version: u64, direction: Direction) -> MigrationFile {
    MigrationFile::new(version, "t", direction, "SELECT 1;")
}

#[test]
fn test_empty_report_is_completed() {
    let report = BatchReport::empty();
    assert!(report.is_completed());
    assert!(report.errors().is_empty());
    assert_eq!(report.total_duration(), Duration::ZERO);
}

#[test]
fn test_merge_keeps_applied_and_takes_last_state() {
    let first = BatchReport {
        state: BatchState::Completed,
        applied: vec![StepReport::new(&step(2, Direction::Down), Duration::from_millis(5))],
        aborted: None,
    };
    let failed_step = step(3, Direction::Up);
    let second = BatchReport {
        state: BatchState::Aborted,
        applied: vec![StepReport::new(&step(1, Direction::Up), Duration::from_millis(7))],
        aborted: Some(Abort::new(
            AbortReason::StepFailed,
            &failed_step,
            vec![DriverError::ContentExecution {
                version: Version::new(3),
                message: "syntax error".to_string(),
            }],
        )),
    };

    let merged = first.merge(second);
    assert!(merged.is_aborted());
    assert_eq!(merged.applied.len(), 2);
    assert_eq!(merged.total_duration(), Duration::from_millis(12));
    assert_eq!(merged.errors().len(), 1);
    assert_eq!(merged.aborted.as_ref().unwrap().file_name, "3_t.up.sql");
}

#[test]
fn test_abort_severity_is_highest_signal() {
    let s = step(4, Direction::Down);
    let abort = Abort::new(
        AbortReason::StepFailed,
        &s,
        vec![
            DriverError::ContentExecution {
                version: Version::new(4),
                message: "boom".to_string(),
            },
            DriverError::LedgerConsistency {
                version: Version::new(4),
                message: "rollback failed".to_string(),
            },
        ],
    );
    assert_eq!(abort.severity(), Some(Severity::Critical));

    let interrupted = Abort::new(AbortReason::Interrupted, &s, Vec::new());
    assert_eq!(interrupted.severity(), None);
}

#[test]
fn test_display() {
    assert_eq!(BatchState::Aborted.to_string(), "aborted");
    assert_eq!(
        AbortReason::StepTimedOut(Duration::from_millis(1500)).to_string(),
        "step timed out after 1.5s"
    );
}
