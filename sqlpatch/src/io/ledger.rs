//! Ledger of applied patches, persisted in the target database.
//!
//! The [`Ledger`] trait decouples run orchestration from storage. The runner only
//! calls `append` after a unit's `apply` returned without error, so a recorded
//! name always means a successfully applied patch.

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::core::types::PatchRecord;
use crate::error::PatchError;

/// Default ledger table name.
pub const DEFAULT_TABLE: &str = "sql_patches";

/// Storage contract for applied-patch records.
pub trait Ledger {
    /// True once the ledger table has been provisioned.
    fn exists(&self) -> Result<bool>;
    /// Provision the ledger table. Fails with `AlreadyProvisioned` if it exists.
    fn create(&self) -> Result<()>;
    /// Applied patch names ordered by `(batch, patch_name)`.
    fn list_applied(&self) -> Result<Vec<String>>;
    /// Full records ordered by `(batch, patch_name)`.
    fn list_records(&self) -> Result<Vec<PatchRecord>>;
    /// Record one applied patch.
    fn append(&self, patch_name: &str, batch: i64) -> Result<()>;
    /// Highest recorded batch, or `0` when the ledger is empty.
    fn max_batch(&self) -> Result<i64>;
}

/// SQLite-backed ledger bound to one connection and table.
pub struct SqliteLedger<'c> {
    conn: &'c Connection,
    table: String,
}

impl<'c> SqliteLedger<'c> {
    /// Bind a ledger to `table`. The name is interpolated into SQL, so it must be a
    /// plain identifier.
    pub fn new(conn: &'c Connection, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { conn, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Ledger for SqliteLedger<'_> {
    fn exists(&self) -> Result<bool> {
        let exists: i64 = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                params![self.table],
                |row| row.get(0),
            )
            .with_context(|| format!("check ledger table {}", self.table))?;
        Ok(exists == 1)
    }

    fn create(&self) -> Result<()> {
        if self.exists()? {
            return Err(PatchError::AlreadyProvisioned {
                table: self.table.clone(),
            }
            .into());
        }
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    patch_name TEXT NOT NULL,
                    batch INTEGER NOT NULL
                )",
                self.table
            ))
            .with_context(|| format!("create ledger table {}", self.table))?;
        info!(table = %self.table, "ledger table created");
        Ok(())
    }

    fn list_applied(&self) -> Result<Vec<String>> {
        Ok(self
            .list_records()?
            .into_iter()
            .map(|record| record.patch_name)
            .collect())
    }

    fn list_records(&self) -> Result<Vec<PatchRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT patch_name, batch FROM {} ORDER BY batch ASC, patch_name ASC",
                self.table
            ))
            .with_context(|| format!("query ledger table {}", self.table))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PatchRecord {
                    patch_name: row.get(0)?,
                    batch: row.get(1)?,
                })
            })
            .with_context(|| format!("read ledger table {}", self.table))?;
        let records = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("decode ledger rows from {}", self.table))?;
        debug!(table = %self.table, count = records.len(), "ledger records loaded");
        Ok(records)
    }

    fn append(&self, patch_name: &str, batch: i64) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} (patch_name, batch) VALUES (?1, ?2)",
                    self.table
                ),
                params![patch_name, batch],
            )
            .with_context(|| format!("record patch {patch_name} in {}", self.table))?;
        debug!(patch = patch_name, batch, "ledger record appended");
        Ok(())
    }

    fn max_batch(&self) -> Result<i64> {
        let max: Option<i64> = self
            .conn
            .query_row(&format!("SELECT MAX(batch) FROM {}", self.table), [], |row| {
                row.get(0)
            })
            .with_context(|| format!("read max batch from {}", self.table))?;
        Ok(max.unwrap_or(0))
    }
}

/// Validate that a table name is a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    if !valid_start || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        bail!("ledger table name must match [A-Za-z_][A-Za-z0-9_]* (got '{table}')");
    }
    Ok(())
}
