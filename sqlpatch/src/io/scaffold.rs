//! Patch file scaffolding for `sqlpatch make`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::naming::{date_prefix, sanitize_patch_name, unit_type_name};

const PATCH_TEMPLATE: &str = include_str!("templates/patch.sql.j2");

/// Inputs for a new patch file.
#[derive(Debug, Clone)]
pub struct ScaffoldRequest<'a> {
    /// Directory the file is written to (created if missing).
    pub dir: &'a Path,
    /// Human-readable title, e.g. `"add users index"`.
    pub title: &'a str,
    /// Patch file extension, without the dot.
    pub extension: &'a str,
    /// Timestamp for the date prefix.
    pub now: DateTime<Utc>,
}

/// A freshly written patch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldedPatch {
    pub path: PathBuf,
    /// Patch name as it will appear in the ledger.
    pub name: String,
    /// Unit type identifier named in the template.
    pub unit: String,
}

/// Render the template and write `<dir>/<YYYY_MM_DD_HHMMSS>_<Name>.<ext>`.
///
/// Refuses to overwrite an existing file.
pub fn write_patch(request: &ScaffoldRequest<'_>) -> Result<ScaffoldedPatch> {
    let studly = sanitize_patch_name(request.title)?;
    let name = format!("{}_{}", date_prefix(request.now), studly);
    let unit = unit_type_name(&name);
    let path = request.dir.join(format!("{name}.{}", request.extension));
    if path.exists() {
        return Err(anyhow!("patch file {} already exists", path.display()));
    }

    let contents = render_patch(&name, &unit, request.now)?;
    fs::create_dir_all(request.dir)
        .with_context(|| format!("create patch directory {}", request.dir.display()))?;
    fs::write(&path, contents).with_context(|| format!("write patch {}", path.display()))?;
    debug!(path = %path.display(), unit = %unit, "patch scaffolded");

    Ok(ScaffoldedPatch { path, name, unit })
}

fn render_patch(name: &str, unit: &str, now: DateTime<Utc>) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("patch", PATCH_TEMPLATE)
        .context("load patch template")?;
    let template = env.get_template("patch").context("get patch template")?;
    let mut rendered = template
        .render(context! {
            name => name,
            unit => unit,
            created_at => now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        })
        .context("render patch template")?;
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(rendered)
}
