//! CLI tests for `sqlpatch install`, `make`, `run` and `status`.
//!
//! Spawns the sqlpatch binary in a temporary project and verifies exit codes
//! and the progress lines printed to stdout.

use std::fs;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use sqlpatch::exit_codes;
use sqlpatch::io::config::ENVIRONMENT_VAR;

fn sqlpatch(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sqlpatch"))
        .current_dir(root)
        .env_remove(ENVIRONMENT_VAR)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .args(args)
        .output()
        .expect("spawn sqlpatch")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_patch(root: &Path, name: &str, sql: &str) {
    let dir = root.join("database").join("patches");
    fs::create_dir_all(&dir).expect("mkdir");
    fs::write(dir.join(format!("{name}.sql")), sql).expect("write patch");
}

#[test]
fn install_twice_fails_the_second_time() {
    let temp = tempfile::tempdir().expect("tempdir");

    let first = sqlpatch(temp.path(), &["install"]);
    assert_eq!(first.status.code(), Some(exit_codes::OK));
    assert!(stdout(&first).contains("sql_patches"));
    assert!(temp.path().join("database/database.sqlite").is_file());

    let second = sqlpatch(temp.path(), &["install"]);
    assert_eq!(second.status.code(), Some(exit_codes::FAILED));
    assert!(stderr(&second).contains("already exists"));
}

#[test]
fn run_applies_pending_then_reports_nothing_to_run() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_patch(
        temp.path(),
        "2024_01_01_000000_create_users",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL);",
    );
    write_patch(
        temp.path(),
        "2024_01_02_000000_add_users_index",
        "CREATE UNIQUE INDEX users_email ON users (email);",
    );

    let first = sqlpatch(temp.path(), &["run"]);
    assert_eq!(first.status.code(), Some(exit_codes::OK), "{}", stderr(&first));
    let out = stdout(&first);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Run patch: 2024_01_01_000000_create_users");
    assert!(lines[1].starts_with("Patch: 2024_01_01_000000_create_users ("));
    assert!(lines[1].ends_with("ms)"));
    assert_eq!(lines[2], "Run patch: 2024_01_02_000000_add_users_index");
    assert!(lines[3].starts_with("Patch: 2024_01_02_000000_add_users_index ("));

    let second = sqlpatch(temp.path(), &["run"]);
    assert_eq!(second.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout(&second), "Nothing to run.\n");

    let status = sqlpatch(temp.path(), &["status"]);
    assert_eq!(status.status.code(), Some(exit_codes::OK));
    assert_eq!(
        stdout(&status),
        "applied (1)   2024_01_01_000000_create_users\n\
         applied (1)   2024_01_02_000000_add_users_index\n"
    );
}

#[test]
fn failing_patch_exits_nonzero_and_stays_pending() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_patch(temp.path(), "2024_01_01_000000_ok", "CREATE TABLE ok (id INTEGER);");
    write_patch(
        temp.path(),
        "2024_01_02_000000_broken",
        "INSERT INTO missing_table VALUES (1);",
    );

    let output = sqlpatch(temp.path(), &["run"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(stderr(&output).contains("patch 2024_01_02_000000_broken failed"));

    let status = sqlpatch(temp.path(), &["status"]);
    assert_eq!(
        stdout(&status),
        "applied (1)   2024_01_01_000000_ok\n\
         pending       2024_01_02_000000_broken\n"
    );
}

#[test]
fn transaction_flag_rolls_back_only_the_failing_patch() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_patch(temp.path(), "2024_01_01_000000_a", "CREATE TABLE a (id INTEGER);");
    write_patch(temp.path(), "2024_01_01_000001_b", "INSERT INTO a VALUES (1);");
    write_patch(
        temp.path(),
        "2024_01_01_000002_c",
        "CREATE TABLE c (id INTEGER);\nINSERT INTO nope VALUES (1);",
    );

    let output = sqlpatch(temp.path(), &["run", "--transaction"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let out = stdout(&output);
    assert!(out.contains("Patch: 2024_01_01_000001_b ("));
    assert!(!out.contains("Patch: 2024_01_01_000002_c ("));
    assert!(stderr(&output).contains("patch 2024_01_01_000002_c failed"));

    let status = sqlpatch(temp.path(), &["status"]);
    assert_eq!(
        stdout(&status),
        "applied (1)   2024_01_01_000000_a\n\
         applied (1)   2024_01_01_000001_b\n\
         pending       2024_01_01_000002_c\n"
    );

    // The rolled-back CREATE TABLE must not block the retry.
    write_patch(temp.path(), "2024_01_01_000002_c", "CREATE TABLE c (id INTEGER);");
    let retry = sqlpatch(temp.path(), &["run", "--transaction"]);
    assert_eq!(retry.status.code(), Some(exit_codes::OK), "{}", stderr(&retry));
    assert!(stdout(&retry).contains("Run patch: 2024_01_01_000002_c"));
}

#[test]
fn comment_only_patch_is_unresolvable_without_registered_unit() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_patch(temp.path(), "2024_01_01_000000_todo", "-- nothing yet\n");

    let output = sqlpatch(temp.path(), &["run"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(stderr(&output).contains("unresolvable patch 2024_01_01_000000_todo"));
}

#[test]
fn sensitive_environment_declines_without_confirmation() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_patch(temp.path(), "2024_01_01_000000_a", "CREATE TABLE a (id INTEGER);");

    let declined = Command::new(env!("CARGO_BIN_EXE_sqlpatch"))
        .current_dir(temp.path())
        .env(ENVIRONMENT_VAR, "production")
        .stdin(Stdio::null())
        .arg("run")
        .output()
        .expect("spawn sqlpatch");
    assert_eq!(declined.status.code(), Some(exit_codes::DECLINED));
    assert!(!stdout(&declined).contains("Run patch"));
    assert!(!temp.path().join("database/database.sqlite").exists());

    let forced = Command::new(env!("CARGO_BIN_EXE_sqlpatch"))
        .current_dir(temp.path())
        .env(ENVIRONMENT_VAR, "production")
        .stdin(Stdio::null())
        .args(["run", "--force"])
        .output()
        .expect("spawn sqlpatch");
    assert_eq!(forced.status.code(), Some(exit_codes::OK));
    assert!(stdout(&forced).contains("Run patch: 2024_01_01_000000_a"));
}

#[test]
fn make_writes_a_dated_patch_and_refuses_blank_names() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = sqlpatch(temp.path(), &["make", "add users index"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    let out = stdout(&output);
    let rel = out
        .trim()
        .strip_prefix("Created patch: ")
        .expect("created line");
    assert!(rel.ends_with("_AddUsersIndex.sql"));
    let contents = fs::read_to_string(temp.path().join(rel)).expect("read patch");
    assert!(contents.contains("AddUsersIndex"));

    let blank = sqlpatch(temp.path(), &["make", "  "]);
    assert_eq!(blank.status.code(), Some(exit_codes::FAILED));
}

#[test]
fn config_file_and_path_flag_select_patch_locations() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("sqlpatch.toml"),
        "database = \"var/app.db\"\ntable = \"schema_log\"\npaths = [\"patches\"]\n",
    )
    .expect("write config");
    fs::create_dir_all(temp.path().join("patches")).expect("mkdir");
    fs::write(
        temp.path().join("patches/2024_01_01_000000_a.sql"),
        "CREATE TABLE a (id INTEGER);",
    )
    .expect("write");
    fs::create_dir_all(temp.path().join("extra")).expect("mkdir");
    fs::write(
        temp.path().join("extra/2024_01_01_000000_b.sql"),
        "CREATE TABLE b (id INTEGER);",
    )
    .expect("write");

    let output = sqlpatch(temp.path(), &["run", "--path", "extra"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    assert!(stdout(&output).contains("Run patch: 2024_01_01_000000_b"));
    assert!(!stdout(&output).contains("2024_01_01_000000_a"));
    assert!(temp.path().join("var/app.db").is_file());

    let status = sqlpatch(temp.path(), &["status"]);
    assert_eq!(
        stdout(&status),
        "pending       2024_01_01_000000_a\n\
         missing (1)   2024_01_01_000000_b\n"
    );
}
