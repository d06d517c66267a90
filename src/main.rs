//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `access_log_ingest` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use access_log_ingest::initialization::init_logger_with;
use access_log_ingest::{run_ingest, Config, IngestError, Opt, RunReport};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials and endpoint may live in a local .env file
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env file: {e}");
        }
    }

    let config = Config::from(Opt::parse());

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    match run_ingest(config).await {
        Ok(RunReport::DryRun(documents)) => {
            for document in &documents {
                println!(
                    "{}",
                    serde_json::to_string(document).context("Failed to serialize document")?
                );
            }
            eprintln!(
                "Built {} document{} (dry run, nothing written)",
                documents.len(),
                if documents.len() == 1 { "" } else { "s" }
            );
            Ok(())
        }
        Ok(RunReport::Ingested(report)) => {
            println!(
                "Wrote {} document{} from {} record{} in {} bulk attempt{}",
                report.documents,
                if report.documents == 1 { "" } else { "s" },
                report.records,
                if report.records == 1 { "" } else { "s" },
                report.attempts,
                if report.attempts == 1 { "" } else { "s" }
            );
            Ok(())
        }
        Err(e) => {
            if let Some(IngestError::UnresolvedDocuments { failed, .. }) = e.downcast_ref() {
                for failure in failed.iter().take(10) {
                    eprintln!(
                        "  unresolved {}: {}",
                        failure.document.id().unwrap_or("-"),
                        failure.error
                    );
                }
            }
            eprintln!("access_log_ingest error: {:#}", e);
            process::exit(1);
        }
    }
}
