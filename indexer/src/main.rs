use anyhow::Result;
use clap::{Parser, Subcommand};
use search_core::output::{save_counts, save_index, save_results};
use search_core::{
    ConcurrentIndex, ConcurrentIndexBuilder, ConcurrentQueryResults, IndexBuilder, InvertedIndex,
    QueryResults, ResultBuilder, ResultMap, WorkQueue,
};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Dispatch;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a positional inverted index from text files and search it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory (or single file) of .txt/.text files
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        path: PathBuf,
        /// Worker threads; builds sequentially when omitted
        #[arg(long)]
        threads: Option<NonZeroUsize>,
        /// File of queries, one per line
        #[arg(long)]
        queries: Option<PathBuf>,
        /// Match query stems exactly instead of as prefixes
        #[arg(long, default_value_t = false)]
        exact: bool,
        /// Write the index as JSON
        #[arg(long, num_args = 0..=1, default_missing_value = "index.json")]
        index: Option<PathBuf>,
        /// Write per-location word counts as JSON
        #[arg(long, num_args = 0..=1, default_missing_value = "counts.json")]
        counts: Option<PathBuf>,
        /// Write query results as JSON
        #[arg(long, num_args = 0..=1, default_missing_value = "results.json")]
        results: Option<PathBuf>,
    },
}

struct Outputs {
    queries: Option<PathBuf>,
    exact: bool,
    index: Option<PathBuf>,
    counts: Option<PathBuf>,
    results: Option<PathBuf>,
}

fn main() -> Result<()> {
    let logging = Dispatch::new(fmt().with_env_filter(EnvFilter::from_default_env()).finish());
    let _logging = tracing::dispatcher::set_default(&logging);
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { path, threads, queries, exact, index, counts, results } => {
            let outputs = Outputs { queries, exact, index, counts, results };
            match threads {
                Some(threads) => build_concurrent(&path, threads, &outputs),
                None => build_sequential(&path, &outputs),
            }
        }
    }
}

fn build_sequential(path: &Path, outputs: &Outputs) -> Result<()> {
    let mut index = InvertedIndex::new();
    IndexBuilder::new(&mut index).build(path)?;

    let results = run_queries(&mut QueryResults::new(&index), outputs)?;
    write_outputs(&index, &results, outputs)
}

fn build_concurrent(path: &Path, threads: NonZeroUsize, outputs: &Outputs) -> Result<()> {
    let queue = WorkQueue::new(threads);
    let index = Arc::new(ConcurrentIndex::new());
    ConcurrentIndexBuilder::new(Arc::clone(&index), &queue).build(path)?;

    let results = run_queries(&mut ConcurrentQueryResults::new(Arc::clone(&index), &queue), outputs)?;
    queue.join();
    index.read(|index| write_outputs(index, &results, outputs))
}

fn run_queries(results: &mut dyn ResultBuilder, outputs: &Outputs) -> Result<ResultMap> {
    if let Some(queries) = &outputs.queries {
        results.build(queries, outputs.exact)?;
    }
    Ok(results.results())
}

fn write_outputs(index: &InvertedIndex, results: &ResultMap, outputs: &Outputs) -> Result<()> {
    if let Some(path) = &outputs.index {
        save_index(index, path)?;
    }
    if let Some(path) = &outputs.counts {
        save_counts(index, path)?;
    }
    if let Some(path) = &outputs.results {
        save_results(results, path)?;
    }
    tracing::info!(words = index.num_words(), locations = index.counts().len(), "outputs written");
    Ok(())
}
