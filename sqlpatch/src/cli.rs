//! Command-line entry point.
//!
//! The `sqlpatch` binary runs SQL scripts only. A project that also ships Rust
//! units builds its own binary around [`run_cli`]:
//!
//! ```no_run
//! use sqlpatch::io::loader::PatchRegistry;
//!
//! fn main() {
//!     let registry = PatchRegistry::new();
//!     // registry.register("BackfillSlugs", || BackfillSlugs)?;
//!     std::process::exit(sqlpatch::cli::run_cli(registry));
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use tracing::debug;

use crate::error::PatchError;
use crate::exit_codes;
use crate::install::install_ledger;
use crate::io::config::{CONFIG_FILE, ENVIRONMENT_VAR, PatchConfig, load_config};
use crate::io::confirm::{Proceed, gate_for};
use crate::io::database::{open, open_in_memory, open_read_only};
use crate::io::ledger::SqliteLedger;
use crate::io::loader::{PatchLoader, PatchRegistry};
use crate::logging;
use crate::make::{display_path, make_patch};
use crate::run::{RunEvent, RunOptions, RunOutcome, run_patches};
use crate::status::patch_status;

#[derive(Parser, Debug)]
#[command(
    name = "sqlpatch",
    version,
    about = "Sequential, idempotent SQL patch runner"
)]
pub struct Cli {
    /// Config file, relative to the working directory.
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply every pending patch under one new batch number.
    Run(RunArgs),
    /// Create the ledger table.
    Install {
        /// Database file, overriding the config.
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Scaffold a new dated patch file.
    Make {
        /// Patch title, e.g. "add users index".
        name: String,
    },
    /// Show applied and pending patches without changing anything.
    Status(TargetArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Skip the confirmation prompt in sensitive environments.
    #[arg(short, long)]
    force: bool,

    /// Wrap each patch in a transaction.
    #[arg(long, conflicts_with = "no_transaction")]
    transaction: bool,

    /// Run each patch without a transaction.
    #[arg(long)]
    no_transaction: bool,
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Database file, overriding the config.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Patch directory or file, replacing the configured paths. Repeatable.
    #[arg(long = "path", value_name = "PATH")]
    paths: Vec<PathBuf>,
}

impl TargetArgs {
    fn apply(self, cfg: &mut PatchConfig) {
        if let Some(database) = self.database {
            cfg.database = database;
        }
        if !self.paths.is_empty() {
            cfg.paths = self.paths;
        }
    }
}

impl RunArgs {
    fn transaction_override(&self) -> Option<bool> {
        if self.transaction {
            Some(true)
        } else if self.no_transaction {
            Some(false)
        } else {
            None
        }
    }
}

/// Parse arguments, run the command, and return the process exit code.
pub fn run_cli(registry: PatchRegistry) -> i32 {
    logging::init();
    let cli = Cli::parse();
    match dispatch(cli, registry) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::FAILED
        }
    }
}

fn dispatch(cli: Cli, registry: PatchRegistry) -> Result<i32> {
    let root = std::env::current_dir().context("resolve working directory")?;
    let mut cfg = load_config(&root.join(&cli.config))?;
    cfg.apply_environment_override(std::env::var(ENVIRONMENT_VAR).ok());
    debug!(environment = %cfg.environment, "config loaded");

    match cli.command {
        Command::Run(args) => cmd_run(&root, cfg, args, registry),
        Command::Install { database } => {
            if let Some(database) = database {
                cfg.database = database;
            }
            cmd_install(&root, &cfg)
        }
        Command::Make { name } => cmd_make(&root, &cfg, &name),
        Command::Status(target) => {
            target.apply(&mut cfg);
            cmd_status(&root, &cfg)
        }
    }
}

fn cmd_run(
    root: &Path,
    mut cfg: PatchConfig,
    args: RunArgs,
    registry: PatchRegistry,
) -> Result<i32> {
    if let Some(transaction) = args.transaction_override() {
        cfg.transaction = transaction;
    }
    let force = args.force;
    args.target.apply(&mut cfg);
    cfg.validate()?;

    // Asked before opening, so a declined run does not even create the database file.
    let gate = gate_for(&cfg.environment, &cfg.confirm_environments, force);
    if !gate.confirm().context("confirm run")? {
        return Ok(declined());
    }

    let conn = open_target(&cfg.database_path(root))?;
    let ledger = SqliteLedger::new(&conn, cfg.table.clone())?;
    let loader = PatchLoader::new(registry);
    let options = RunOptions::from_config(&cfg, root);

    let outcome = run_patches(&conn, &ledger, &loader, &Proceed, &options, |event| {
        match event {
            RunEvent::Started { name } => println!("Run patch: {name}"),
            RunEvent::Applied { name, elapsed, .. } => {
                println!("Patch: {name} ({}ms)", elapsed.as_millis());
            }
        }
    })?;

    match outcome {
        RunOutcome::Declined => Ok(declined()),
        RunOutcome::NothingToRun => {
            println!("Nothing to run.");
            Ok(exit_codes::OK)
        }
        RunOutcome::Applied { .. } => Ok(exit_codes::OK),
    }
}

/// Open the target database; a failure here means the ledger cannot be reached.
fn open_target(path: &Path) -> Result<Connection> {
    open(path).context(PatchError::LedgerUnavailable)
}

fn declined() -> i32 {
    eprintln!("Command cancelled.");
    exit_codes::DECLINED
}

fn cmd_install(root: &Path, cfg: &PatchConfig) -> Result<i32> {
    cfg.validate()?;
    let conn = open_target(&cfg.database_path(root))?;
    let ledger = SqliteLedger::new(&conn, cfg.table.clone())?;
    install_ledger(&ledger)?;
    println!("Ledger table {} created.", ledger.table());
    Ok(exit_codes::OK)
}

fn cmd_make(root: &Path, cfg: &PatchConfig, name: &str) -> Result<i32> {
    let patch = make_patch(root, cfg, name, Utc::now())?;
    println!("Created patch: {}", display_path(root, &patch.path));
    Ok(exit_codes::OK)
}

fn cmd_status(root: &Path, cfg: &PatchConfig) -> Result<i32> {
    cfg.validate()?;
    let db_path = cfg.database_path(root);
    // A missing database has no ledger; do not create the file just to say so.
    let conn = if db_path.exists() {
        open_read_only(&db_path).context(PatchError::LedgerUnavailable)?
    } else {
        open_in_memory()?
    };
    let ledger = SqliteLedger::new(&conn, cfg.table.clone())?;
    let report = patch_status(&ledger, &RunOptions::from_config(cfg, root))?;
    print!("{}", report.render());
    Ok(exit_codes::OK)
}
