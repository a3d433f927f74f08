//! Migration set: Up/Down pairing, ordering, and batch planning
//!
//! A [`MigrationSet`] holds every known migration, paired by version. The
//! `plan_*` methods turn the set plus the ledger's applied versions into the
//! ordered steps of one batch operation. Planning never touches a store.

use crate::direction::Direction;
use crate::error::{CoreError, CoreResult};
use crate::migration::MigrationFile;
use crate::version::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// The Up and Down records sharing one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPair {
    /// Shared version
    pub version: Version,

    /// Name of the first record seen for this version
    pub name: String,

    /// Forward step, if present
    pub up: Option<MigrationFile>,

    /// Reverse step, if present
    pub down: Option<MigrationFile>,
}

impl MigrationPair {
    fn slot(&mut self, direction: Direction) -> &mut Option<MigrationFile> {
        match direction {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
        }
    }
}

/// Every known migration, keyed and ordered by version
#[derive(Debug, Clone, Default)]
pub struct MigrationSet {
    pairs: BTreeMap<Version, MigrationPair>,
}

impl MigrationSet {
    /// Pair records by version.
    ///
    /// Two records with the same version and the same direction are a
    /// configuration error; nothing is built in that case.
    pub fn new(files: impl IntoIterator<Item = MigrationFile>) -> CoreResult<Self> {
        let mut pairs: BTreeMap<Version, MigrationPair> = BTreeMap::new();

        for file in files {
            let pair = pairs.entry(file.version).or_insert_with(|| MigrationPair {
                version: file.version,
                name: file.name.clone(),
                up: None,
                down: None,
            });
            let slot = pair.slot(file.direction);
            if let Some(existing) = slot.as_ref() {
                return Err(CoreError::DuplicateVersion {
                    version: file.version,
                    direction: file.direction,
                    first: existing.file_name.clone(),
                    second: file.file_name,
                });
            }
            *slot = Some(file);
        }

        Ok(Self { pairs })
    }

    /// Number of distinct versions
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the set has no migrations
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Look up the pair for a version
    pub fn get(&self, version: Version) -> Option<&MigrationPair> {
        self.pairs.get(&version)
    }

    /// Pairs in ascending version order
    pub fn iter(&self) -> impl Iterator<Item = &MigrationPair> {
        self.pairs.values()
    }

    /// Known versions, ascending
    pub fn versions(&self) -> Vec<Version> {
        self.pairs.keys().copied().collect()
    }

    /// Highest known version
    pub fn latest(&self) -> Option<Version> {
        self.pairs.keys().next_back().copied()
    }

    /// Up records whose version is not applied, ascending (apply to latest).
    pub fn plan_up(&self, applied: &[Version]) -> Vec<MigrationFile> {
        let applied: BTreeSet<Version> = applied.iter().copied().collect();
        self.pending(&applied).cloned().collect()
    }

    /// Down records for every applied version, descending (roll back all).
    pub fn plan_down(&self, applied: &[Version]) -> CoreResult<Vec<MigrationFile>> {
        let applied: BTreeSet<Version> = applied.iter().copied().collect();
        applied.iter().rev().map(|v| self.down_for(*v)).collect()
    }

    /// Relative plan: `n > 0` applies the next `n` pending versions,
    /// `n < 0` rolls back the `|n|` highest applied versions.
    pub fn plan_relative(&self, n: i64, applied: &[Version]) -> CoreResult<Vec<MigrationFile>> {
        let applied: BTreeSet<Version> = applied.iter().copied().collect();
        let count = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);

        if n > 0 {
            Ok(self.pending(&applied).take(count).cloned().collect())
        } else {
            applied
                .iter()
                .rev()
                .take(count)
                .map(|v| self.down_for(*v))
                .collect()
        }
    }

    /// Plan to reach `target`: roll back applied versions above it
    /// (descending), then apply pending versions up to it (ascending).
    ///
    /// `Version::new(0)` means "nothing applied".
    pub fn plan_to(&self, target: Version, applied: &[Version]) -> CoreResult<Vec<MigrationFile>> {
        if target != Version::default() && !self.pairs.contains_key(&target) {
            return Err(CoreError::UnknownVersion { version: target });
        }
        let applied: BTreeSet<Version> = applied.iter().copied().collect();

        let mut steps = applied
            .range((Bound::Excluded(target), Bound::Unbounded))
            .rev()
            .map(|v| self.down_for(*v))
            .collect::<CoreResult<Vec<_>>>()?;

        steps.extend(
            self.pending(&applied)
                .take_while(|m| m.version <= target)
                .cloned(),
        );
        Ok(steps)
    }

    /// Roll back and re-apply the highest applied version.
    pub fn plan_redo(&self, applied: &[Version]) -> CoreResult<Vec<MigrationFile>> {
        let Some(latest) = applied.iter().max().copied() else {
            return Ok(Vec::new());
        };
        let down = self.down_for(latest)?;
        let up = self
            .pairs
            .get(&latest)
            .and_then(|p| p.up.clone())
            .ok_or(CoreError::MissingMigration { version: latest })?;
        Ok(vec![down, up])
    }

    fn pending<'a>(
        &'a self,
        applied: &'a BTreeSet<Version>,
    ) -> impl Iterator<Item = &'a MigrationFile> + 'a {
        self.pairs
            .values()
            .filter(move |p| !applied.contains(&p.version))
            .filter_map(|p| p.up.as_ref())
    }

    fn down_for(&self, version: Version) -> CoreResult<MigrationFile> {
        let pair = self
            .pairs
            .get(&version)
            .ok_or(CoreError::MissingMigration { version })?;
        pair.down
            .clone()
            .ok_or(CoreError::MissingDownMigration { version })
    }
}

/// Sort records by ascending version
pub fn sort_ascending(files: &mut [MigrationFile]) {
    files.sort_by_key(|f| f.version);
}

/// Sort records by descending version
pub fn sort_descending(files: &mut [MigrationFile]) {
    files.sort_by_key(|f| std::cmp::Reverse(f.version));
}

#[cfg(test)]
#[path = "set_test.rs"]
mod tests;
