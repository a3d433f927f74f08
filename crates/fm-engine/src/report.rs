//! Batch outcome reporting

use fm_core::{Direction, MigrationFile, Version};
use fm_db::{DriverError, Severity};
use std::fmt;
use std::time::Duration;

/// Lifecycle of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// No batch started
    Idle,
    /// Steps are being executed
    Running,
    /// Every step drained clean
    Completed,
    /// A step failed, timed out, or the batch was interrupted
    Aborted,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchState::Idle => "idle",
            BatchState::Running => "running",
            BatchState::Completed => "completed",
            BatchState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Result of running one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step closed its pipe; empty means it succeeded
    Drained(Vec<DriverError>),
    /// The step did not close its pipe in time
    TimedOut {
        limit: Duration,
        /// Signals received before the deadline
        received: Vec<DriverError>,
    },
}

impl StepOutcome {
    /// Whether the step succeeded
    pub fn is_clean(&self) -> bool {
        matches!(self, StepOutcome::Drained(signals) if signals.is_empty())
    }

    /// Signals received from the step
    pub fn signals(&self) -> &[DriverError] {
        match self {
            StepOutcome::Drained(signals) => signals,
            StepOutcome::TimedOut { received, .. } => received,
        }
    }
}

/// A step that was applied successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub version: Version,
    pub name: String,
    pub file_name: String,
    pub direction: Direction,
    pub duration: Duration,
}

impl StepReport {
    pub(crate) fn new(step: &MigrationFile, duration: Duration) -> Self {
        Self {
            version: step.version,
            name: step.name.clone(),
            file_name: step.file_name.clone(),
            direction: step.direction,
            duration,
        }
    }
}

/// Why a batch stopped early
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The step drained one or more error signals
    StepFailed,
    /// The step did not close its pipe within the configured timeout
    StepTimedOut(Duration),
    /// An interrupt was requested before the step started
    Interrupted,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::StepFailed => f.write_str("step failed"),
            AbortReason::StepTimedOut(limit) => {
                write!(f, "step timed out after {}s", limit.as_secs_f64())
            }
            AbortReason::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// The step a batch stopped at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    pub reason: AbortReason,
    pub version: Version,
    pub file_name: String,
    pub direction: Direction,
    /// Every signal drained from the step's pipe, in send order
    pub errors: Vec<DriverError>,
}

impl Abort {
    pub(crate) fn new(reason: AbortReason, step: &MigrationFile, errors: Vec<DriverError>) -> Self {
        Self {
            reason,
            version: step.version,
            file_name: step.file_name.clone(),
            direction: step.direction,
            errors,
        }
    }

    /// Highest severity among the drained signals
    pub fn severity(&self) -> Option<Severity> {
        self.errors.iter().map(DriverError::severity).max()
    }
}

/// Outcome of one batch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub state: BatchState,
    /// Steps applied before the batch ended, in execution order
    pub applied: Vec<StepReport>,
    /// Set when `state` is [`BatchState::Aborted`]
    pub aborted: Option<Abort>,
}

impl Default for BatchReport {
    fn default() -> Self {
        Self {
            state: BatchState::Idle,
            applied: Vec::new(),
            aborted: None,
        }
    }
}

impl BatchReport {
    /// Report for a batch that had nothing to do
    pub fn empty() -> Self {
        Self {
            state: BatchState::Completed,
            ..Self::default()
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == BatchState::Completed
    }

    pub fn is_aborted(&self) -> bool {
        self.state == BatchState::Aborted
    }

    /// Signals of the failed step, empty for a completed batch
    pub fn errors(&self) -> &[DriverError] {
        match &self.aborted {
            Some(abort) => &abort.errors,
            None => &[],
        }
    }

    /// Append a follow-up batch run as part of the same operation
    pub fn merge(mut self, next: BatchReport) -> Self {
        self.applied.extend(next.applied);
        self.state = next.state;
        self.aborted = next.aborted;
        self
    }

    /// Total time spent in applied steps
    pub fn total_duration(&self) -> Duration {
        self.applied.iter().map(|s| s.duration).sum()
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
