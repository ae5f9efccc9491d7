//! Pending-set computation: discovered patches minus ledger entries.

use std::collections::HashSet;

use crate::core::types::PatchFile;

/// Return the discovered patches whose names are absent from `applied`.
///
/// Output is sorted by name and never repeats a name, whatever the input order.
/// A name present in the ledger is excluded even if its path has changed.
pub fn pending_patches(discovered: &[PatchFile], applied: &[String]) -> Vec<PatchFile> {
    let applied: HashSet<&str> = applied.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut pending: Vec<PatchFile> = discovered
        .iter()
        .filter(|file| !applied.contains(file.name.as_str()))
        .filter(|file| seen.insert(file.name.as_str()))
        .cloned()
        .collect();
    pending.sort_by(|left, right| left.name.cmp(&right.name));
    pending
}
