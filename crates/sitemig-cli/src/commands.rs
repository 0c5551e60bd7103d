//! `run` and `check` commands

use crate::config::MigrationConfig;
use anyhow::{Context, Result};
use sitemig_core::{MigrationDocument, MigrationExecutor, RunFailure, RunReport};
use sitemig_gateway::{Gateway, HttpTransport, RecordCounts};
use sitemig_symbol::{AuditLog, SymbolTable};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

/// Interactive yes/no confirmation
#[derive(Debug)]
pub struct Prompt<R, W> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            assume_yes,
        }
    }

    /// Ask `question`; only `y`/`yes` count as consent
    ///
    /// # Errors
    /// Returns error if the terminal cannot be read or written
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        write!(self.output, "{question} [y/N] ")?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    /// Output handle for progress text
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }
}

/// How an interactive run ended
#[derive(Debug)]
pub enum Outcome {
    /// Operator declined at a checkpoint; nothing was mutated
    Declined,
    Completed(RunReport),
    Failed(RunFailure),
}

/// Checkpoints, permission check, then the run itself
///
/// # Errors
/// Returns error for terminal I/O, permission or pre-run remote failures;
/// a failed run is reported as [`Outcome::Failed`]
pub async fn drive<R: BufRead, W: Write>(
    executor: &MigrationExecutor,
    document: &MigrationDocument,
    prompt: &mut Prompt<R, W>,
) -> Result<Outcome> {
    let facility = executor.gateway().facility().to_string();
    writeln!(prompt.output(), "Input document:\n{}", document.summary())?;
    if !prompt.confirm(&format!("Migrate into facility {facility}?"))? {
        return Ok(Outcome::Declined);
    }

    executor
        .check_permissions(document)
        .await
        .context("permission check failed")?;

    let counts = executor.record_counts().await.context("fetching record counts")?;
    writeln!(prompt.output(), "Target facility {facility} currently holds:\n{}", format_counts(&counts))?;
    if !prompt.confirm("Continue?")? {
        return Ok(Outcome::Declined);
    }

    match executor.run(document).await {
        Ok(report) => Ok(Outcome::Completed(report)),
        Err(failure) => Ok(Outcome::Failed(failure)),
    }
}

/// `sitemig run`
///
/// Returns whether the migration completed (or was declined) cleanly.
///
/// # Errors
/// Returns error for configuration, I/O, permission or pre-run failures
pub async fn run(config_path: &Path, assume_yes: bool) -> Result<bool> {
    let config = MigrationConfig::load(config_path)?;
    let document = config.load_document()?;

    let transport = HttpTransport::new(&config.api).context("building HTTP client")?;
    let gateway = Gateway::new(Arc::new(transport), config.facility_id.clone()).with_retry(config.retry_policy());

    let symbols = match &config.audit_dir {
        Some(dir) => {
            let audit = AuditLog::create_in(dir).with_context(|| format!("creating audit log in {}", dir.display()))?;
            tracing::info!(path = %audit.path().display(), "audit log opened");
            SymbolTable::with_audit(audit)
        }
        None => SymbolTable::new(),
    };
    let executor = MigrationExecutor::new(gateway, Arc::new(symbols)).with_config(config.executor_config());

    let stdin = io::stdin();
    let mut prompt = Prompt::new(stdin.lock(), io::stdout(), assume_yes);
    match drive(&executor, &document, &mut prompt).await? {
        Outcome::Declined => {
            println!("Aborted; nothing was changed.");
            Ok(true)
        }
        Outcome::Completed(report) => {
            println!("Migration complete.\n{report}");
            Ok(true)
        }
        Outcome::Failed(failure) => {
            eprintln!("Migration failed at {}: {}", failure.action, failure.error);
            eprintln!("Completed before the failure:\n{}", failure.report);
            if let Some(path) = executor.symbols().audit_path() {
                eprintln!("Registered identities are listed in {}", path.display());
            }
            Ok(false)
        }
    }
}

/// `sitemig check`: parse config and document without contacting the API
///
/// # Errors
/// Returns error if either cannot be loaded
pub fn check(config_path: &Path) -> Result<()> {
    let config = MigrationConfig::load(config_path)?;
    let document = config.load_document()?;

    println!("Facility: {}", config.facility_id);
    println!("Input:    {}", config.input.display());
    println!("{}", document.summary());
    if config.skip_data {
        println!("Data phase disabled (skip_data = true)");
    }
    Ok(())
}

fn format_counts(counts: &RecordCounts) -> String {
    format!(
        "  staff:          {}\n  clients:        {}\n  client groups:  {}\n  meetings:       {}\n  dictionaries:   {}\n  attributes:     {}",
        counts.staff, counts.clients, counts.client_groups, counts.meetings, counts.dictionaries, counts.attributes
    )
}
