//! Read-only report for `sqlpatch status`.
//!
//! Never provisions the ledger; a missing table reports every patch as pending.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};

use crate::core::types::PatchRecord;
use crate::error::PatchError;
use crate::io::ledger::Ledger;
use crate::io::repository::discover;
use crate::run::RunOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchState {
    Applied { batch: i64 },
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub name: String,
    pub state: PatchState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub ledger_installed: bool,
    /// Discovered patches, sorted by name.
    pub entries: Vec<StatusEntry>,
    /// Ledger records with no matching file on disk.
    pub missing: Vec<PatchRecord>,
}

impl StatusReport {
    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.state == PatchState::Pending)
            .count()
    }

    /// One line per patch, in discovery order, then the orphaned records.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.ledger_installed {
            out.push_str("Ledger not installed.\n");
        }
        for entry in &self.entries {
            let label = match entry.state {
                PatchState::Applied { batch } => format!("applied ({batch})"),
                PatchState::Pending => "pending".to_string(),
            };
            out.push_str(&format!("{label:<14}{}\n", entry.name));
        }
        for record in &self.missing {
            let label = format!("missing ({})", record.batch);
            out.push_str(&format!("{label:<14}{}\n", record.patch_name));
        }
        if self.entries.is_empty() && self.missing.is_empty() {
            out.push_str("No patches found.\n");
        }
        out
    }
}

pub fn patch_status<L: Ledger>(ledger: &L, options: &RunOptions) -> Result<StatusReport> {
    let discovered = discover(&options.locations, &options.extension, options.duplicates)?;
    let ledger_installed = ledger.exists().context(PatchError::LedgerUnavailable)?;
    let records = if ledger_installed {
        ledger
            .list_records()
            .context(PatchError::LedgerUnavailable)?
    } else {
        Vec::new()
    };

    // First record wins if a name was somehow recorded twice.
    let mut batches: BTreeMap<&str, i64> = BTreeMap::new();
    for record in &records {
        batches.entry(record.patch_name.as_str()).or_insert(record.batch);
    }

    let entries = discovered
        .iter()
        .map(|file| StatusEntry {
            name: file.name.clone(),
            state: match batches.get(file.name.as_str()) {
                Some(&batch) => PatchState::Applied { batch },
                None => PatchState::Pending,
            },
        })
        .collect();

    let on_disk: HashSet<&str> = discovered.iter().map(|file| file.name.as_str()).collect();
    let missing = records
        .iter()
        .filter(|record| !on_disk.contains(record.patch_name.as_str()))
        .cloned()
        .collect();

    Ok(StatusReport {
        ledger_installed,
        entries,
        missing,
    })
}
