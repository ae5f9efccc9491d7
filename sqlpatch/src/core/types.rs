//! Shared deterministic types for patch reconciliation.
//!
//! These types carry no I/O handles. A [`PatchFile`] is rediscovered on every
//! run; only its name is ever persisted, via a [`PatchRecord`].

use std::path::PathBuf;

use serde::Deserialize;

/// A candidate patch found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatchFile {
    /// Basename without extension. Also the sort key and the ledger identity.
    pub name: String,
    /// Location the patch was discovered at (not canonicalized).
    pub path: PathBuf,
}

impl PatchFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// One applied-patch row in the ledger.
///
/// Append-only: rows are never updated or removed by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    pub patch_name: String,
    /// Batch the patch was applied in (>= 1).
    pub batch: i64,
}

/// How discovery treats two files that derive the same patch name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail discovery, naming both paths.
    #[default]
    Reject,
    /// The later discovery shadows the earlier one.
    LastWins,
}
