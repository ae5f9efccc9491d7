//! Confirmation gate consulted before touching a sensitive database.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::info;

/// Yes/no gate. Returning `false` aborts the run before any ledger access.
pub trait ConfirmGate {
    fn confirm(&self) -> Result<bool>;
}

/// Gate that always proceeds (`--force`, or a non-sensitive environment).
pub struct Proceed;

impl ConfirmGate for Proceed {
    fn confirm(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Gate that asks on stderr and reads the answer from stdin.
pub struct TerminalPrompt {
    environment: String,
}

impl TerminalPrompt {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }
}

impl ConfirmGate for TerminalPrompt {
    fn confirm(&self) -> Result<bool> {
        let stdin = std::io::stdin();
        let mut stderr = std::io::stderr();
        let confirmed = ask(&self.environment, &mut stdin.lock(), &mut stderr)?;
        if !confirmed {
            info!(environment = %self.environment, "run declined at confirmation prompt");
        }
        Ok(confirmed)
    }
}

/// True if running in `environment` needs an explicit confirmation.
pub fn requires_confirmation(environment: &str, sensitive: &[String], force: bool) -> bool {
    !force && sensitive.iter().any(|env| env == environment)
}

/// Pick the gate for an invocation.
pub fn gate_for(environment: &str, sensitive: &[String], force: bool) -> Box<dyn ConfirmGate> {
    if requires_confirmation(environment, sensitive, force) {
        Box::new(TerminalPrompt::new(environment))
    } else {
        Box::new(Proceed)
    }
}

fn ask<R: BufRead, W: Write>(environment: &str, input: &mut R, output: &mut W) -> Result<bool> {
    write!(
        output,
        "Application is running in '{environment}'. Do you really wish to run this command? [y/N] "
    )
    .context("write confirmation prompt")?;
    output.flush().context("flush confirmation prompt")?;

    let mut answer = String::new();
    let read = input
        .read_line(&mut answer)
        .context("read confirmation answer")?;
    if read == 0 {
        return Ok(false);
    }
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
