use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;

use herald_core::format_check;
use herald_sdk::{FormatContext, GraphSource, QuerySource, TimeWindow};

// Ensure the formatter module is linked so it registers.
use mod_graphite as _;

#[derive(Parser, Debug)]
#[command(
    name = "herald",
    version,
    about = "Renders an annotated report for one monitoring check"
)]
struct Cli {
    /// JSON object of check variables (name -> value)
    #[arg(long)]
    vars: PathBuf,

    /// JSON object of canned query results, keyed by raw query string or
    /// query file name
    #[arg(long)]
    results: Option<PathBuf>,

    /// Comma-separated graph file references
    #[arg(long)]
    graphs: Option<String>,

    /// Directory holding file-based query definitions
    #[arg(long, default_value = "queries")]
    query_dir: PathBuf,

    /// Formatter to run
    #[arg(long, default_value = "graphite-graph")]
    formatter: String,

    /// Output format: html fragment or json
    #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
    format: OutputFormat,
}

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Html,
    Json,
}

/// Graph collaborator fed from the command line; an empty list behaves
/// like a fetch failure so the degrade path is exercised end to end.
struct CannedGraphs(Vec<String>);

impl GraphSource for CannedGraphs {
    fn fetch_graphs(&self, _url: &str, show_historical: bool) -> Result<Vec<String>> {
        if self.0.is_empty() {
            anyhow::bail!("no graph references supplied");
        }
        let take = if show_historical { self.0.len() } else { 1 };
        Ok(self.0.iter().take(take).cloned().collect())
    }
}

/// Query collaborator answering from a canned result map; file-based
/// queries are looked up by file name.
struct CannedQueries(serde_json::Map<String, Value>);

impl CannedQueries {
    fn lookup(&self, key: &str) -> Result<Value> {
        self.0
            .get(key)
            .cloned()
            .with_context(|| format!("no canned result for '{key}'"))
    }
}

impl QuerySource for CannedQueries {
    fn query_from_file(&self, path: &Path, _window: &TimeWindow) -> Result<Value> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        self.lookup(name)
    }

    fn query_from_string(&self, query: &str, _window: &TimeWindow) -> Result<Value> {
        self.lookup(query)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let vars: HashMap<String, String> = read_json(&cli.vars)?;
    let results: serde_json::Map<String, Value> = match &cli.results {
        Some(path) => read_json(path)?,
        None => serde_json::Map::new(),
    };
    let graph_refs: Vec<String> = cli
        .graphs
        .as_deref()
        .map(|list| {
            list.split(',')
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let graphs = CannedGraphs(graph_refs);
    let queries = CannedQueries(results);
    let ctx = FormatContext::new(&vars, &graphs, &queries).with_query_dir(cli.query_dir.clone());

    let report = format_check(&cli.formatter, &ctx)?;

    match cli.format {
        OutputFormat::Html => {
            println!("{}", report.to_html()?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report.to_json_value())?);
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
