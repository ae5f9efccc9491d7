//! Orchestration for `sqlpatch run`.
//!
//! A run provisions the ledger if needed, computes the pending set, assigns one
//! batch number, and applies each pending patch in name order. It stops at the
//! first failure. Patches recorded before the failure stay recorded. The failing
//! patch and everything after it stay pending for the next run.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::core::batch::next_batch;
use crate::core::pending::pending_patches;
use crate::core::types::{DuplicatePolicy, PatchFile};
use crate::error::PatchError;
use crate::io::config::PatchConfig;
use crate::io::confirm::ConfirmGate;
use crate::io::ledger::Ledger;
use crate::io::loader::{PatchLoader, PatchUnit, UnitOrigin};
use crate::io::repository::discover;

/// Inputs for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Directories or single patch files to discover patches in.
    pub locations: Vec<PathBuf>,
    /// Patch file extension, without the dot.
    pub extension: String,
    /// Wrap each patch and its ledger record in one transaction.
    pub transaction: bool,
    pub duplicates: DuplicatePolicy,
}

impl RunOptions {
    pub fn from_config(cfg: &PatchConfig, root: &Path) -> Self {
        Self {
            locations: cfg.patch_locations(root),
            extension: cfg.extension.clone(),
            transaction: cfg.transaction,
            duplicates: cfg.duplicate_names,
        }
    }
}

/// Progress notifications emitted while patches run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Started {
        name: String,
    },
    Applied {
        name: String,
        batch: i64,
        elapsed: Duration,
    },
}

/// A patch applied and recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPatch {
    pub name: String,
    pub origin: UnitOrigin,
    pub elapsed: Duration,
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The confirmation gate declined. Nothing was read or written.
    Declined,
    /// Every discovered patch is already recorded.
    NothingToRun,
    /// All pending patches were applied under `batch`.
    Applied {
        batch: i64,
        patches: Vec<AppliedPatch>,
    },
}

/// Apply every pending patch.
///
/// `on_event` is called when a patch starts and after it is recorded.
pub fn run_patches<L, G, F>(
    conn: &Connection,
    ledger: &L,
    loader: &PatchLoader,
    gate: &G,
    options: &RunOptions,
    mut on_event: F,
) -> Result<RunOutcome>
where
    L: Ledger,
    G: ConfirmGate + ?Sized,
    F: FnMut(&RunEvent),
{
    if !gate.confirm().context("confirm run")? {
        warn!("run declined, no patches applied");
        return Ok(RunOutcome::Declined);
    }

    ensure_ledger(ledger)?;

    let discovered = discover(&options.locations, &options.extension, options.duplicates)?;
    let applied = ledger
        .list_applied()
        .context(PatchError::LedgerUnavailable)?;
    let pending = pending_patches(&discovered, &applied);
    debug!(
        discovered = discovered.len(),
        applied = applied.len(),
        pending = pending.len(),
        "pending set computed"
    );
    if pending.is_empty() {
        info!("nothing to run");
        return Ok(RunOutcome::NothingToRun);
    }

    let batch = next_batch(ledger.max_batch().context(PatchError::LedgerUnavailable)?);
    info!(batch, count = pending.len(), "applying patches");

    let mut patches = Vec::with_capacity(pending.len());
    for file in &pending {
        let resolved = loader.resolve(file)?;
        on_event(&RunEvent::Started {
            name: file.name.clone(),
        });

        let start = Instant::now();
        apply_and_record(
            conn,
            ledger,
            file,
            resolved.unit.as_ref(),
            batch,
            options.transaction,
        )?;
        let elapsed = start.elapsed();
        debug!(patch = %file.name, batch, elapsed_ms = elapsed.as_millis() as u64, "patch applied");

        on_event(&RunEvent::Applied {
            name: file.name.clone(),
            batch,
            elapsed,
        });
        patches.push(AppliedPatch {
            name: file.name.clone(),
            origin: resolved.origin,
            elapsed,
        });
    }

    Ok(RunOutcome::Applied { batch, patches })
}

/// Provision the ledger unless it already exists.
pub fn ensure_ledger<L: Ledger>(ledger: &L) -> Result<()> {
    let exists = ledger.exists().context(PatchError::LedgerUnavailable)?;
    if !exists {
        info!("ledger missing, provisioning");
        ledger.create().context(PatchError::LedgerUnavailable)?;
    }
    Ok(())
}

/// Run one unit and record it. The record is written only after `apply` succeeds.
///
/// In transaction mode both happen inside one transaction; dropping it on error
/// rolls back the patch's own effects.
fn apply_and_record<L: Ledger>(
    conn: &Connection,
    ledger: &L,
    file: &PatchFile,
    unit: &dyn PatchUnit,
    batch: i64,
    transaction: bool,
) -> Result<()> {
    let failed = || PatchError::PatchExecution {
        name: file.name.clone(),
    };

    if !transaction {
        unit.apply(conn).with_context(failed)?;
        return ledger
            .append(&file.name, batch)
            .context(PatchError::LedgerUnavailable);
    }

    let tx = conn
        .unchecked_transaction()
        .with_context(|| format!("begin transaction for {}", file.name))
        .with_context(failed)?;
    unit.apply(&tx).with_context(failed)?;
    ledger
        .append(&file.name, batch)
        .context(PatchError::LedgerUnavailable)?;
    tx.commit()
        .with_context(|| format!("commit transaction for {}", file.name))
        .with_context(failed)
}
