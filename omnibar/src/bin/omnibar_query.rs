//! Run an omnibar query against candidates from a JSON file.
//!
//! Usage:
//!     cargo run --bin omnibar-query -- --candidates tabs.json "zillow 17"
//!
//! The candidates file is a JSON array of candidate records. Results are printed
//! one JSON object per line, best first. Set OMNIBAR_LOG or RUST_LOG for logs.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use omnibar::{
    evaluate, BangRegistry, CandidateRecord, CandidateSource, EngineConfig, FallbackSource, MatchSpan, SearchField,
    StaticSource,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Query text, as typed into the omnibar
    query: String,

    /// JSON array of candidate records
    #[arg(short, long)]
    candidates: Option<PathBuf>,

    /// JSON array of bang definitions (defaults to the built-in table)
    #[arg(short, long)]
    bangs: Option<PathBuf>,

    /// JSON engine config; missing keys take defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured result cap
    #[arg(short, long)]
    limit: Option<usize>,

    /// Skip URL, web search and bang fallbacks
    #[arg(long)]
    no_fallback: bool,
}

#[derive(Serialize)]
struct ResultLine<'a> {
    rank: usize,
    score: f64,
    kind: &'static str,
    candidate: CandidateRecord,
    matches: &'a std::collections::BTreeMap<SearchField, Vec<MatchSpan>>,
}

fn init_tracing() {
    let filter = std::env::var("OMNIBAR_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .compact()
        .init();
}

fn read(path: &PathBuf) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json(&read(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(limit) = args.limit {
        config.max_results = limit;
        config = config.validated()?;
    }

    let bangs = match &args.bangs {
        Some(path) => BangRegistry::from_json(&read(path)?)?,
        None => BangRegistry::builtin(),
    };
    let bangs = Arc::new(bangs);

    let mut sources: Vec<Arc<dyn CandidateSource>> = Vec::new();
    if let Some(path) = &args.candidates {
        let records: Vec<CandidateRecord> =
            serde_json::from_str(&read(path)?).with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(count = records.len(), "loaded candidates");
        sources.push(Arc::new(StaticSource::from_records("file", records)));
    }
    if !args.no_fallback {
        sources.push(Arc::new(FallbackSource::new(Arc::clone(&bangs), &config)));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting tokio runtime")?;
    let results = runtime.block_on(evaluate(&args.query, &sources, &bangs, &config));

    for (rank, result) in results.iter().enumerate() {
        let line = ResultLine {
            rank: rank + 1,
            score: result.score,
            kind: result.candidate.kind().label(),
            candidate: CandidateRecord::from(&result.candidate),
            matches: &result.matches,
        };
        println!("{}", serde_json::to_string(&line)?);
    }

    Ok(())
}
