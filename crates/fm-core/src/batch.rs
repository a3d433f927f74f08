//! Batch construction
//!
//! A [`Batch`] is the ordered list of steps one engine run executes. Building
//! one rejects duplicate steps and fixes the order: a single-direction batch
//! is sorted by version (ascending for Up, descending for Down), while a
//! batch mixing directions keeps the order it was given, since only the
//! caller knows how the rollbacks and applications interleave.

use crate::direction::Direction;
use crate::error::{CoreError, CoreResult};
use crate::migration::MigrationFile;
use crate::version::Version;
use std::cmp::Reverse;
use std::collections::HashMap;

/// Ordered, validated migration steps for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    steps: Vec<MigrationFile>,
}

impl Batch {
    /// Validate and order `steps`.
    ///
    /// Fails fast with [`CoreError::DuplicateVersion`] when a version appears
    /// twice in the same direction.
    pub fn new(steps: impl IntoIterator<Item = MigrationFile>) -> CoreResult<Self> {
        let mut seen: HashMap<(Version, Direction), String> = HashMap::new();
        let mut steps: Vec<MigrationFile> = steps.into_iter().collect();

        for step in &steps {
            if let Some(first) = seen.insert((step.version, step.direction), step.file_name.clone())
            {
                return Err(CoreError::DuplicateVersion {
                    version: step.version,
                    direction: step.direction,
                    first,
                    second: step.file_name.clone(),
                });
            }
        }

        match single_direction(&steps) {
            Some(Direction::Up) => steps.sort_by_key(|s| s.version),
            Some(Direction::Down) => steps.sort_by_key(|s| Reverse(s.version)),
            None if !steps.is_empty() => {
                log::debug!("Mixed-direction batch of {} steps kept in given order", steps.len())
            }
            None => {}
        }

        Ok(Self { steps })
    }

    /// Steps in execution order
    pub fn steps(&self) -> &[MigrationFile] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether there is nothing to run
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Consume the batch, returning its steps in execution order
    pub fn into_steps(self) -> Vec<MigrationFile> {
        self.steps
    }
}

/// The one direction all `steps` share, if any
fn single_direction(steps: &[MigrationFile]) -> Option<Direction> {
    let first = steps.first()?.direction;
    steps
        .iter()
        .all(|s| s.direction == first)
        .then_some(first)
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;
