//! Scriptable in-memory driver for orchestrator tests.

#![allow(dead_code)]

use async_trait::async_trait;
use fm_core::{Direction, MigrationFile, Version};
use fm_db::{DbResult, Driver, DriverError, PipeSender};
use fm_engine::InterruptHandle;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

/// What the driver does when it reaches a version
#[derive(Clone)]
pub enum Script {
    Fail,
    Panic,
    Delay(Duration),
    Interrupt(InterruptHandle),
}

/// Applies steps to an in-memory ledger and records the execution order
#[derive(Default)]
pub struct RecordingDriver {
    ledger: Mutex<BTreeSet<Version>>,
    log: Mutex<Vec<(Version, Direction)>>,
    scripts: Mutex<HashMap<Version, Script>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, version: u64, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(Version::new(version), script);
    }

    pub fn executed(&self) -> Vec<(u64, Direction)> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|(v, d)| (v.get(), *d))
            .collect()
    }

    fn record(&self, migration: &MigrationFile) -> DbResult<()> {
        let mut ledger = self.ledger.lock()?;
        let changed = match migration.direction {
            Direction::Up => ledger.insert(migration.version),
            Direction::Down => ledger.remove(&migration.version),
        };
        if !changed {
            return Err(DriverError::LedgerConsistency {
                version: migration.version,
                message: "ledger refused the change".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    async fn initialize(&self, _descriptor: &str) -> DbResult<()> {
        Ok(())
    }

    async fn execute(&self, migration: &MigrationFile, pipe: PipeSender<DriverError>) {
        self.log
            .lock()
            .unwrap()
            .push((migration.version, migration.direction));
        let script = self.scripts.lock().unwrap().get(&migration.version).cloned();

        match script {
            Some(Script::Fail) => {
                pipe.send(DriverError::ContentExecution {
                    version: migration.version,
                    message: "scripted failure".to_string(),
                })
                .await;
                pipe.close();
                return;
            }
            Some(Script::Panic) => panic!("scripted panic at {}", migration.version),
            Some(Script::Delay(delay)) => tokio::time::sleep(delay).await,
            Some(Script::Interrupt(handle)) => handle.interrupt(),
            None => {}
        }

        if let Err(err) = self.record(migration) {
            pipe.send(err).await;
        }
        pipe.close();
    }

    async fn applied_versions(&self) -> DbResult<Vec<Version>> {
        Ok(self.ledger.lock()?.iter().copied().collect())
    }

    async fn close(&self) -> DbResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Up/Down pair whose payload is irrelevant to the recording driver
pub fn pair(version: u64) -> [MigrationFile; 2] {
    let name = format!("step_{version}");
    [
        MigrationFile::new(version, name.clone(), Direction::Up, "-- up"),
        MigrationFile::new(version, name, Direction::Down, "-- down"),
    ]
}

pub fn versions(values: &[u64]) -> Vec<Version> {
    values.iter().copied().map(Version::new).collect()
}
