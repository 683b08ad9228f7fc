//! Bigraph Check
//!
//! Loads a document, completes it and reports diagnostics.
//!
//! Usage: `bigraph-check <document> [--config <yaml>] [--write <out>]`

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use bigraph_tools::Summary;
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "bigraph-check")]
#[command(about = "Complete a bigraph document and report diagnostics")]
struct Args {
    /// Path to the document (JSON, or YAML by extension)
    document: PathBuf,

    /// Builder configuration (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the completed document here
    #[arg(long)]
    write: Option<PathBuf>,
}

fn main() {
    bigraph_tools::init_logging();

    let args = Args::parse();

    if let Err(err) = run(&args) {
        error!("{:#}", err);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    if !args.document.is_file() {
        anyhow::bail!("'{}' is not a file", args.document.display());
    }

    info!("Checking document: {}", args.document.display());
    let builder = bigraph_tools::check(&args.document, args.config.as_deref())
        .with_context(|| format!("failed to complete {}", args.document.display()))?;

    let summary = Summary::of(&builder);
    info!("Document is complete");
    info!("  - Processes: {}", summary.processes);
    info!("  - Steps: {}", summary.steps);
    info!("  - Stores: {}", summary.stores);

    if let Some(out) = &args.write {
        builder
            .write(out)
            .with_context(|| format!("failed to write {}", out.display()))?;
        info!("Wrote completed document to {}", out.display());
    }
    Ok(())
}
