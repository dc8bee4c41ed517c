use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use search_core::builder::build_index;
use search_core::persist::IndexPaths;
use search_core::summary::{self, Summarizer, Truncate};
use search_core::{BuildConfig, EngineConfig, QueryMode, SearchEngine};
use tracing_subscriber::{fmt, EnvFilter};

use std::io::{self, BufRead, Write};
use std::path::Path;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a partitioned inverted index over crawled pages and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory of page JSON files
    Build {
        /// Root directory of `{url, content}` page files
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long, default_value = "./data")]
        output: String,
        /// Number of partial indexes
        #[arg(long, default_value_t = 3)]
        partitions: usize,
        /// SimHash Hamming distance below which pages are near-duplicates
        #[arg(long, default_value_t = 24)]
        threshold: u32,
        /// Keep the partial index files after merging
        #[arg(long, default_value_t = false)]
        keep_partitions: bool,
        /// External summarizer command; reads page text on stdin, writes the summary to stdout
        #[arg(long)]
        summarizer: Option<String>,
    },
    /// Query an index from the terminal; reads queries from stdin when none is given
    Query {
        #[arg(long, default_value = "./data")]
        index: String,
        #[arg(long, value_enum, default_value_t = Mode::Ranked)]
        mode: Mode,
        #[arg(long, default_value_t = 5)]
        k: usize,
        query: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Ranked,
    Boolean,
}

impl From<Mode> for QueryMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Ranked => QueryMode::Ranked,
            Mode::Boolean => QueryMode::Boolean,
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, partitions, threshold, keep_partitions, summarizer } => {
            let config = BuildConfig { partitions, duplicate_threshold: threshold, keep_partitions, ..BuildConfig::default() };
            let external = summarizer.as_deref().and_then(summary::Command::parse);
            let truncate = Truncate { words: config.summary_words };
            let summarizer: &dyn Summarizer = match &external {
                Some(cmd) => cmd,
                None => &truncate,
            };
            let report = build_index(Path::new(&input), &IndexPaths::new(&output), &config, summarizer)?;
            println!(
                "indexed {} documents ({} near-duplicates, {} skipped) into {} terms across {} partitions",
                report.indexed, report.duplicates, report.skipped, report.terms, report.partitions
            );
            Ok(())
        }
        Commands::Query { index, mode, k, query } => {
            let engine = SearchEngine::open(&IndexPaths::new(&index), EngineConfig::default());
            match query {
                Some(q) => print_results(&engine, &q, mode.into(), k),
                None => repl(&engine, mode.into(), k),
            }
        }
    }
}

fn repl(engine: &SearchEngine, mode: QueryMode, k: usize) -> Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("Enter your search query: ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 || line.trim().is_empty() {
            return Ok(());
        }
        print_results(engine, line.trim(), mode, k)?;
    }
}

fn print_results(engine: &SearchEngine, query: &str, mode: QueryMode, k: usize) -> Result<()> {
    let results = engine.search(query, mode, k);
    let mut out = io::stdout().lock();
    if results.hits.is_empty() {
        writeln!(out, "No results found for your query")?;
    }
    for (rank, hit) in results.hits.iter().enumerate() {
        writeln!(out, "{}. {}", rank + 1, hit.url)?;
        if !hit.title.is_empty() {
            writeln!(out, "   {}", hit.title)?;
        }
        if !hit.summary.is_empty() {
            writeln!(out, "   {}", hit.summary)?;
        }
    }
    writeln!(out, "{} results in {:.3}s", results.total_hits, results.took.as_secs_f64())?;
    Ok(())
}
