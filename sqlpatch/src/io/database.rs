//! SQLite connection setup for the target database.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

/// Open (or create) the SQLite database at `path` and apply runtime pragmas.
pub fn open(path: &Path) -> Result<Connection> {
    debug!(path = %path.display(), "opening database");
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create database directory {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("open sqlite database {}", path.display()))?;
    configure(&conn)?;
    Ok(conn)
}

/// Open an existing database without creating or writing to it.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    debug!(path = %path.display(), "opening database read-only");
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("open sqlite database {} read-only", path.display()))
}

/// Open a private in-memory database with the same pragmas.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite database")?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
    .context("configure sqlite pragmas")
}
