//! Project configuration stored in `sqlpatch.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::core::types::DuplicatePolicy;
use crate::io::ledger::{DEFAULT_TABLE, validate_table_name};

/// Default config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "sqlpatch.toml";

/// Environment variable that overrides `environment`.
pub const ENVIRONMENT_VAR: &str = "SQLPATCH_ENV";

/// Patch runner configuration (TOML).
///
/// Intended to be edited by humans. Missing fields take the defaults below;
/// relative paths resolve against the project root.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PatchConfig {
    /// SQLite database file the patches run against.
    pub database: PathBuf,

    /// Ledger table name.
    pub table: String,

    /// Patch file extension, without the dot.
    pub extension: String,

    /// Directories (or single patch files) to discover patches in. The first
    /// entry is where `make` writes new patches.
    pub paths: Vec<PathBuf>,

    /// Wrap each patch and its ledger record in a transaction.
    pub transaction: bool,

    /// Name of the environment this project runs in.
    pub environment: String,

    /// Environments in which `run` asks for confirmation unless `--force` is given.
    pub confirm_environments: Vec<String>,

    /// Policy for two patch files that derive the same name.
    pub duplicate_names: DuplicatePolicy,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("database/database.sqlite"),
            table: DEFAULT_TABLE.to_string(),
            extension: "sql".to_string(),
            paths: vec![PathBuf::from("database/patches")],
            transaction: false,
            environment: "local".to_string(),
            confirm_environments: vec!["production".to_string()],
            duplicate_names: DuplicatePolicy::Reject,
        }
    }
}

impl PatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.database.as_os_str().is_empty() {
            return Err(anyhow!("database must be non-empty"));
        }
        validate_table_name(&self.table)?;
        if self.extension.is_empty()
            || !self
                .extension
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric())
        {
            return Err(anyhow!(
                "extension must be non-empty [A-Za-z0-9] (got '{}')",
                self.extension
            ));
        }
        if self.paths.is_empty() || self.paths.iter().any(|p| p.as_os_str().is_empty()) {
            return Err(anyhow!("paths must be a non-empty array of paths"));
        }
        if self.environment.trim().is_empty() {
            return Err(anyhow!("environment must be non-empty"));
        }
        Ok(())
    }

    /// Replace `environment` with `value` when it is set and non-empty.
    pub fn apply_environment_override(&mut self, value: Option<String>) {
        if let Some(env) = value.filter(|env| !env.trim().is_empty()) {
            self.environment = env.trim().to_string();
        }
    }

    /// Resolve `database` against the project root.
    pub fn database_path(&self, root: &Path) -> PathBuf {
        root.join(&self.database)
    }

    /// Resolve `paths` against the project root.
    pub fn patch_locations(&self, root: &Path) -> Vec<PathBuf> {
        self.paths.iter().map(|path| root.join(path)).collect()
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PatchConfig::default()`.
pub fn load_config(path: &Path) -> Result<PatchConfig> {
    if !path.exists() {
        let cfg = PatchConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PatchConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
