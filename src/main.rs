//! memquery - evaluate a query document over JSON candidates

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use memquery::access::Value;
use memquery::query::{InMemoryQuery, QueryDocument};
use std::path::PathBuf;

/// memquery - run an in-memory query over a set of candidate objects
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Query document (JSON)
    #[arg(short, long)]
    query: PathBuf,

    /// Candidates (JSON array)
    #[arg(short, long)]
    candidates: PathBuf,

    /// Candidate alias, overriding the document's
    #[arg(short, long)]
    alias: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn read_candidates(path: &PathBuf) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read candidates from {}", path.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).context("Failed to parse candidates")?;
    let serde_json::Value::Array(items) = json else {
        bail!("Candidates must be a JSON array");
    };
    Ok(items.iter().map(Value::from_json).collect())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let text = std::fs::read_to_string(&args.query)
        .with_context(|| format!("Failed to read query from {}", args.query.display()))?;
    let mut document = QueryDocument::from_json(&text).context("Failed to load query")?;
    if let Some(alias) = args.alias {
        document.alias = alias;
    }

    let candidates = read_candidates(&args.candidates)?;
    let results = InMemoryQuery::new(document)
        .execute(candidates)
        .context("Query execution failed")?;

    for result in results {
        println!("{}", result.to_json());
    }

    Ok(())
}
