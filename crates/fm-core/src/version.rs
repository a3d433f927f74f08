//! Migration version identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Format used for versions generated from the wall clock.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Unsigned, monotonic migration version.
///
/// The sole ordering key for migrations and the key stored in the version
/// ledger. Versions are usually UTC timestamps such as `20060102150405`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Wrap a raw version number.
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Return the raw version number.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Build a version from a UTC timestamp (`YYYYMMDDHHMMSS`).
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        // The formatted timestamp is always 14 ASCII digits.
        let digits = at.format(TIMESTAMP_FORMAT).to_string();
        Self(digits.parse().unwrap_or_default())
    }

    /// Convert for storage in signed 64-bit ledger columns.
    ///
    /// Returns `None` for versions above `i64::MAX`.
    pub fn to_i64(self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }

    /// Convert a value read back from a signed ledger column.
    pub fn from_i64(value: i64) -> Option<Self> {
        u64::try_from(value).ok().map(Self)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(version: u64) -> Self {
        Self(version)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

impl FromStr for Version {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}
