//! Resolution of patch files into executable units.
//!
//! Units come from two places:
//!
//! - **Registered units**: Rust types registered in a [`PatchRegistry`] under their
//!   unit type identifier (`AddUsersIndex` for `2024_01_01_000000_add_users_index`).
//!   A registration may be bound to the file that declares it.
//! - **Script units**: the SQL text of the patch file itself.
//!
//! Resolution order for a file:
//! 1. a registration bound to exactly this file,
//! 2. the file's SQL, when it contains any statement,
//! 3. an unbound registration for the derived identifier (comment-only file).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::Connection;
use tracing::debug;

use crate::core::naming::unit_type_name;
use crate::core::types::PatchFile;
use crate::error::PatchError;

/// A unit of work that applies one patch.
pub trait PatchUnit {
    fn apply(&self, conn: &Connection) -> Result<()>;
}

type Factory = Box<dyn Fn() -> Box<dyn PatchUnit>>;

struct Registration {
    source: Option<PathBuf>,
    factory: Factory,
}

/// Explicit map from unit type identifier to factory.
#[derive(Default)]
pub struct PatchRegistry {
    entries: BTreeMap<String, Registration>,
}

impl PatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit by type identifier only.
    ///
    /// Used when the patch file on disk is comment-only and names this identifier.
    pub fn register<F, U>(&mut self, type_name: &str, factory: F) -> Result<&mut Self>
    where
        F: Fn() -> U + 'static,
        U: PatchUnit + 'static,
    {
        self.insert(type_name, None, factory)
    }

    /// Register a unit bound to the patch file that declares it.
    ///
    /// The binding only matches when `source` and the discovered path resolve to the
    /// same file, so a same-named unit meant for another location is never picked up.
    pub fn register_at<F, U>(
        &mut self,
        type_name: &str,
        source: impl Into<PathBuf>,
        factory: F,
    ) -> Result<&mut Self>
    where
        F: Fn() -> U + 'static,
        U: PatchUnit + 'static,
    {
        self.insert(type_name, Some(source.into()), factory)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert<F, U>(
        &mut self,
        type_name: &str,
        source: Option<PathBuf>,
        factory: F,
    ) -> Result<&mut Self>
    where
        F: Fn() -> U + 'static,
        U: PatchUnit + 'static,
    {
        if type_name.is_empty() {
            bail!("unit type name must not be empty");
        }
        if self.entries.contains_key(type_name) {
            bail!("unit type {type_name} is already registered");
        }
        self.entries.insert(
            type_name.to_string(),
            Registration {
                source,
                factory: Box::new(move || Box::new(factory()) as Box<dyn PatchUnit>),
            },
        );
        Ok(self)
    }

    fn get(&self, type_name: &str) -> Option<&Registration> {
        self.entries.get(type_name)
    }
}

/// Patch whose effect is the SQL text of its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlScript {
    sql: String,
}

impl SqlScript {
    /// Wrap SQL text, or `None` when it holds nothing but comments and whitespace.
    pub fn parse(sql: impl Into<String>) -> Option<Self> {
        let sql = sql.into();
        has_statements(&sql).then_some(Self { sql })
    }
}

impl PatchUnit for SqlScript {
    fn apply(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&self.sql).context("execute patch sql")
    }
}

/// Where a resolved unit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOrigin {
    /// Registration bound to the patch file.
    Registered,
    /// SQL text of the patch file.
    Script,
    /// Unbound registration reached through a comment-only file.
    Fallback,
}

pub struct ResolvedUnit {
    pub unit: Box<dyn PatchUnit>,
    pub origin: UnitOrigin,
}

/// Resolves discovered files against a registry.
pub struct PatchLoader {
    registry: PatchRegistry,
}

impl PatchLoader {
    pub fn new(registry: PatchRegistry) -> Self {
        Self { registry }
    }

    /// Loader that only runs SQL scripts.
    pub fn scripts_only() -> Self {
        Self::new(PatchRegistry::new())
    }

    pub fn resolve(&self, file: &PatchFile) -> Result<ResolvedUnit> {
        let unresolvable = || PatchError::UnresolvablePatch {
            name: file.name.clone(),
            path: file.path.clone(),
        };
        let type_name = unit_type_name(&file.name);

        if let Some(registration) = self.registry.get(&type_name)
            && let Some(source) = &registration.source
            && same_file(source, &file.path)
        {
            debug!(patch = %file.name, unit = %type_name, "resolved bound registration");
            return Ok(ResolvedUnit {
                unit: (registration.factory)(),
                origin: UnitOrigin::Registered,
            });
        }

        let contents = fs::read_to_string(&file.path)
            .with_context(|| format!("read patch file {}", file.path.display()))
            .with_context(unresolvable)?;
        if let Some(script) = SqlScript::parse(contents) {
            debug!(patch = %file.name, "resolved sql script");
            return Ok(ResolvedUnit {
                unit: Box::new(script),
                origin: UnitOrigin::Script,
            });
        }

        if let Some(registration) = self.registry.get(&type_name) {
            debug!(patch = %file.name, unit = %type_name, "resolved fallback registration");
            return Ok(ResolvedUnit {
                unit: (registration.factory)(),
                origin: UnitOrigin::Fallback,
            });
        }

        Err(
            anyhow!("file has no statements and no unit is registered as '{type_name}'")
                .context(unresolvable()),
        )
    }
}

fn same_file(left: &Path, right: &Path) -> bool {
    match (left.canonicalize(), right.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

/// True if `sql` has any character outside `--` and `/* */` comments and whitespace.
fn has_statements(sql: &str) -> bool {
    enum State {
        Code,
        LineComment,
        BlockComment,
    }

    let mut state = State::Code;
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        match state {
            State::Code => match ch {
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                }
                ch if ch.is_whitespace() || ch == ';' => {}
                _ => return true,
            },
            State::LineComment => {
                if ch == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                }
            }
        }
    }
    false
}
