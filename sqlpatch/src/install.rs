//! Orchestration for `sqlpatch install`.

use anyhow::Result;
use tracing::info;

use crate::error::{PatchError, classify};
use crate::io::ledger::Ledger;

/// Provision the ledger table.
///
/// Fails with [`PatchError::AlreadyProvisioned`] when the table exists; the
/// existing records are left untouched.
pub fn install_ledger<L: Ledger>(ledger: &L) -> Result<()> {
    match ledger.create() {
        Ok(()) => {
            info!("ledger provisioned");
            Ok(())
        }
        Err(err) if matches!(classify(&err), Some(PatchError::AlreadyProvisioned { .. })) => {
            Err(err)
        }
        Err(err) => Err(err.context(PatchError::LedgerUnavailable)),
    }
}
