//! Orchestration for `sqlpatch make`.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};

use crate::io::config::PatchConfig;
use crate::io::scaffold::{ScaffoldRequest, ScaffoldedPatch, write_patch};

/// Directory new patches are written to: the first configured location that is
/// not a direct file reference.
pub fn target_directory(cfg: &PatchConfig, root: &Path) -> Result<PathBuf> {
    let suffix = format!(".{}", cfg.extension);
    cfg.patch_locations(root)
        .into_iter()
        .find(|location| {
            !location
                .to_str()
                .is_some_and(|value| value.ends_with(&suffix))
        })
        .ok_or_else(|| anyhow!("no patch directory configured in paths"))
}

/// Write a new dated patch file for `title`.
pub fn make_patch(
    root: &Path,
    cfg: &PatchConfig,
    title: &str,
    now: DateTime<Utc>,
) -> Result<ScaffoldedPatch> {
    let dir = target_directory(cfg, root)?;
    write_patch(&ScaffoldRequest {
        dir: &dir,
        title,
        extension: &cfg.extension,
        now,
    })
}

/// `path` relative to `root` when it lies under it.
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
