//! Test-only fixtures for patch directories, units, gates, and ledgers.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use tempfile::TempDir;

use crate::core::types::PatchRecord;
use crate::io::confirm::ConfirmGate;
use crate::io::ledger::Ledger;
use crate::io::loader::PatchUnit;

/// Temporary directory holding `.sql` patch files.
pub struct PatchDir {
    temp: TempDir,
}

impl PatchDir {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: tempfile::tempdir().context("create patch tempdir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Write `<name>.sql`.
    pub fn write(&self, name: &str, sql: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(format!("{name}.sql"));
        fs::write(&path, sql).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

/// Shared log that units append their label to when applied.
#[derive(Clone, Default)]
pub struct UnitLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl UnitLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    fn push(&self, label: &str) {
        self.entries.borrow_mut().push(label.to_string());
    }
}

/// Unit that logs its label when applied.
pub struct RecordingUnit {
    label: String,
    log: UnitLog,
}

impl RecordingUnit {
    pub fn new(label: &str, log: &UnitLog) -> Self {
        Self {
            label: label.to_string(),
            log: log.clone(),
        }
    }
}

impl PatchUnit for RecordingUnit {
    fn apply(&self, _conn: &Connection) -> Result<()> {
        self.log.push(&self.label);
        Ok(())
    }
}

/// Unit that logs its label, then fails.
pub struct FailingUnit {
    label: String,
    log: UnitLog,
}

impl FailingUnit {
    pub fn new(label: &str, log: &UnitLog) -> Self {
        Self {
            label: label.to_string(),
            log: log.clone(),
        }
    }
}

impl PatchUnit for FailingUnit {
    fn apply(&self, _conn: &Connection) -> Result<()> {
        self.log.push(&self.label);
        bail!("{} failed on purpose", self.label)
    }
}

/// Gate with a fixed answer that counts how often it was asked.
pub struct ScriptedGate {
    answer: bool,
    calls: Cell<usize>,
}

impl ScriptedGate {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ConfirmGate for ScriptedGate {
    fn confirm(&self) -> Result<bool> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.answer)
    }
}

/// Ledger wrapper that records which operations were called.
pub struct RecordingLedger<L> {
    inner: L,
    calls: RefCell<Vec<&'static str>>,
}

impl<L: Ledger> RecordingLedger<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.borrow_mut().push(call);
    }
}

impl<L: Ledger> Ledger for RecordingLedger<L> {
    fn exists(&self) -> Result<bool> {
        self.record("exists");
        self.inner.exists()
    }

    fn create(&self) -> Result<()> {
        self.record("create");
        self.inner.create()
    }

    fn list_applied(&self) -> Result<Vec<String>> {
        self.record("list_applied");
        self.inner.list_applied()
    }

    fn list_records(&self) -> Result<Vec<PatchRecord>> {
        self.record("list_records");
        self.inner.list_records()
    }

    fn append(&self, patch_name: &str, batch: i64) -> Result<()> {
        self.record("append");
        self.inner.append(patch_name, batch)
    }

    fn max_batch(&self) -> Result<i64> {
        self.record("max_batch");
        self.inner.max_batch()
    }
}
