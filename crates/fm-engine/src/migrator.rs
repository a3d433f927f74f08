//! Batch orchestration
//!
//! Every batch operation follows the same path: read the ledger, plan the
//! steps with [`MigrationSet`], order them with [`Batch`], then run the
//! steps one at a time. Each step's `execute` runs on its own task; the
//! orchestrator waits on the step's pipe and aborts the batch at the first
//! step that reports anything.

use crate::error::EngineResult;
use crate::report::{Abort, AbortReason, BatchReport, BatchState, StepOutcome, StepReport};
use fm_core::{Batch, MigrationFile, MigrationSet, Version};
use fm_db::{pipe, Driver, DriverError, DriverRegistry};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Abort the batch when a step has not closed its pipe after this long
    pub step_timeout: Option<Duration>,

    /// Signal buffer size of each step's pipe
    pub pipe_capacity: usize,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            step_timeout: None,
            pipe_capacity: pipe::DEFAULT_CAPACITY,
        }
    }
}

/// Requests a graceful stop of the running batch
///
/// The step in flight always finishes; the batch aborts before the next one
/// starts. A request is consumed by the batch it stops.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running (or next) batch to stop
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Withdraw a pending request
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// One row of [`Migrator::status`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: Version,
    /// `None` for a version recorded in the ledger with no known migration
    pub name: Option<String>,
    pub applied: bool,
}

/// Runs migration batches against one driver
pub struct Migrator {
    driver: Arc<dyn Driver>,
    migrations: MigrationSet,
    config: MigratorConfig,
    interrupt: InterruptHandle,
    state: BatchState,
}

impl Migrator {
    /// Create a migrator over an initialized driver
    pub fn new(driver: Arc<dyn Driver>, migrations: MigrationSet) -> Self {
        Self {
            driver,
            migrations,
            config: MigratorConfig::default(),
            interrupt: InterruptHandle::new(),
            state: BatchState::Idle,
        }
    }

    /// Open a driver for `descriptor` from `registry` and wrap it
    pub async fn connect(
        registry: &DriverRegistry,
        descriptor: &str,
        migrations: MigrationSet,
        config: MigratorConfig,
    ) -> EngineResult<Self> {
        let driver = registry.open(descriptor).await?;
        log::info!(
            "Connected {} driver ({} migrations known)",
            driver.name(),
            migrations.len()
        );
        Ok(Self::new(driver, migrations).with_config(config))
    }

    /// Replace the orchestrator settings
    pub fn with_config(mut self, config: MigratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing interrupt handle, e.g. one wired to a signal handler
    pub fn with_interrupt(mut self, interrupt: InterruptHandle) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn migrations(&self) -> &MigrationSet {
        &self.migrations
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// Handle that stops the running batch before its next step
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// State of the most recent batch
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Apply every pending migration
    pub async fn up(&mut self) -> EngineResult<BatchReport> {
        let applied = self.driver.applied_versions().await?;
        let steps = self.migrations.plan_up(&applied);
        self.run_planned("up", steps).await
    }

    /// Roll back every applied migration
    pub async fn down(&mut self) -> EngineResult<BatchReport> {
        let applied = self.driver.applied_versions().await?;
        let steps = self.migrations.plan_down(&applied)?;
        self.run_planned("down", steps).await
    }

    /// Apply the next `n` pending migrations, or roll back `|n|` applied ones
    /// when `n` is negative
    pub async fn migrate(&mut self, n: i64) -> EngineResult<BatchReport> {
        let applied = self.driver.applied_versions().await?;
        let steps = self.migrations.plan_relative(n, &applied)?;
        self.run_planned("migrate", steps).await
    }

    /// Move the ledger to exactly `target`; version 0 rolls everything back
    pub async fn goto(&mut self, target: Version) -> EngineResult<BatchReport> {
        let applied = self.driver.applied_versions().await?;
        let steps = self.migrations.plan_to(target, &applied)?;
        self.run_planned("goto", steps).await
    }

    /// Roll back and re-apply the latest applied migration
    pub async fn redo(&mut self) -> EngineResult<BatchReport> {
        let applied = self.driver.applied_versions().await?;
        let steps = self.migrations.plan_redo(&applied)?;
        // Mixed-direction batches keep the planned Down-then-Up order
        self.run_planned("redo", steps).await
    }

    /// Roll back everything, then apply everything
    ///
    /// Stops after the rollback if it aborts.
    pub async fn reset(&mut self) -> EngineResult<BatchReport> {
        let down = self.down().await?;
        if !down.is_completed() {
            return Ok(down);
        }
        let up = self.up().await?;
        Ok(down.merge(up))
    }

    async fn run_planned(
        &mut self,
        operation: &str,
        steps: Vec<MigrationFile>,
    ) -> EngineResult<BatchReport> {
        let batch = Batch::new(steps)?;
        log::debug!("Planned {}: {} step(s)", operation, batch.len());
        Ok(self.run_batch(batch).await)
    }

    /// Run the steps of `batch` in order, stopping at the first failure
    pub async fn run_batch(&mut self, batch: Batch) -> BatchReport {
        let mut report = BatchReport::default();
        if batch.is_empty() {
            log::info!("No migrations to run");
            self.transition(BatchState::Completed);
            return BatchReport::empty();
        }

        self.transition(BatchState::Running);
        report.state = BatchState::Running;

        for step in batch.steps() {
            if self.interrupt.take() {
                log::warn!("Interrupted before {}", step.file_name);
                report.aborted = Some(Abort::new(AbortReason::Interrupted, step, Vec::new()));
                return self.finish(report, BatchState::Aborted);
            }

            let started = Instant::now();
            match self.run_step(step).await {
                StepOutcome::Drained(signals) if signals.is_empty() => {
                    let elapsed = started.elapsed();
                    log::info!("Applied {} in {}ms", step.file_name, elapsed.as_millis());
                    report.applied.push(StepReport::new(step, elapsed));
                }
                StepOutcome::Drained(signals) => {
                    for signal in &signals {
                        log::error!("{}: {}", step.file_name, signal);
                    }
                    report.aborted = Some(Abort::new(AbortReason::StepFailed, step, signals));
                    return self.finish(report, BatchState::Aborted);
                }
                StepOutcome::TimedOut { limit, received } => {
                    log::error!(
                        "{} did not finish within {}s",
                        step.file_name,
                        limit.as_secs_f64()
                    );
                    report.aborted = Some(Abort::new(
                        AbortReason::StepTimedOut(limit),
                        step,
                        received,
                    ));
                    return self.finish(report, BatchState::Aborted);
                }
            }
        }

        self.finish(report, BatchState::Completed)
    }

    /// Run a single step and collect what it reported
    ///
    /// The step's task is awaited after its pipe closes; a task that ended
    /// abnormally adds a [`DriverError::TaskFailed`] signal. On timeout the
    /// task is left running in the background.
    pub async fn run_step(&self, step: &MigrationFile) -> StepOutcome {
        log::debug!("Executing {} ({})", step.file_name, step.direction);
        let (tx, mut results) = pipe::with_capacity(self.config.pipe_capacity);
        let driver = Arc::clone(&self.driver);
        let task_step = step.clone();
        let handle = tokio::spawn(async move { driver.execute(&task_step, tx).await });

        let drained = match self.config.step_timeout {
            Some(limit) => tokio::time::timeout(limit, results.drain())
                .await
                .map(<[DriverError]>::to_vec)
                .map_err(|_| limit),
            None => Ok(results.drain().await.to_vec()),
        };

        let mut signals = match drained {
            Ok(signals) => signals,
            Err(limit) => {
                return StepOutcome::TimedOut {
                    limit,
                    received: results.received().to_vec(),
                }
            }
        };

        if let Err(join_err) = handle.await {
            signals.push(DriverError::TaskFailed {
                version: step.version,
                message: join_err.to_string(),
            });
        }
        StepOutcome::Drained(signals)
    }

    /// Greatest applied version
    pub async fn version(&self) -> EngineResult<Option<Version>> {
        Ok(self.driver.current_version().await?)
    }

    /// Applied versions, ascending
    pub async fn versions(&self) -> EngineResult<Vec<Version>> {
        Ok(self.driver.applied_versions().await?)
    }

    /// Every known or applied version with its applied flag, ascending
    pub async fn status(&self) -> EngineResult<Vec<MigrationStatus>> {
        let applied = self.driver.applied_versions().await?;
        let mut rows: BTreeMap<Version, MigrationStatus> = self
            .migrations
            .iter()
            .map(|pair| {
                (
                    pair.version,
                    MigrationStatus {
                        version: pair.version,
                        name: Some(pair.name.clone()),
                        applied: false,
                    },
                )
            })
            .collect();

        for version in applied {
            rows.entry(version)
                .or_insert_with(|| {
                    log::warn!("Applied version {} has no migration file", version);
                    MigrationStatus {
                        version,
                        name: None,
                        applied: true,
                    }
                })
                .applied = true;
        }
        Ok(rows.into_values().collect())
    }

    /// Close the underlying driver
    pub async fn close(&self) -> EngineResult<()> {
        Ok(self.driver.close().await?)
    }

    fn transition(&mut self, next: BatchState) {
        log::debug!("Batch state {} -> {}", self.state, next);
        self.state = next;
    }

    fn finish(&mut self, mut report: BatchReport, state: BatchState) -> BatchReport {
        self.transition(state);
        report.state = state;
        match &report.aborted {
            Some(abort) => log::info!(
                "Batch aborted at {} ({}) after {} step(s)",
                abort.file_name,
                abort.reason,
                report.applied.len()
            ),
            None => log::info!("Batch completed: {} step(s)", report.applied.len()),
        }
        report
    }
}

impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("driver", &self.driver.name())
            .field("migrations", &self.migrations.len())
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
