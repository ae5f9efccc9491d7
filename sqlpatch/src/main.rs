//! Sequential, idempotent SQL patch runner.
//!
//! Applies every `*_*.sql` file under the configured patch directories that is
//! not yet recorded in the ledger table, in name order, under one batch number.

use sqlpatch::io::loader::PatchRegistry;

fn main() {
    std::process::exit(sqlpatch::cli::run_cli(PatchRegistry::new()));
}
