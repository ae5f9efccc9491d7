//! Stable exit codes for sqlpatch CLI commands.

/// Command succeeded (including a run with nothing pending).
pub const OK: i32 = 0;
/// `sqlpatch run` was declined at the confirmation prompt.
pub const DECLINED: i32 = 1;
/// Command failed: bad config, ledger unavailable, unresolvable or failing patch.
pub const FAILED: i32 = 2;
