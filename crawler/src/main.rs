use anyhow::{anyhow, Result};
use clap::Parser;
use search_core::output::{save_counts, save_index, save_results};
use search_core::{
    ConcurrentIndex, ConcurrentQueryResults, FetchConfig, HttpFetcher, ResultBuilder, WebCrawler, WorkQueue,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Dispatch;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl outward from a seed URL and index the pages found")]
struct Cli {
    /// Seed URL to start crawling from
    #[arg(long)]
    url: String,
    /// Maximum number of pages to crawl
    #[arg(long, default_value = "1")]
    max: NonZeroUsize,
    /// Concurrency (number of workers)
    #[arg(long, default_value = "5")]
    threads: NonZeroUsize,
    /// Redirects to follow per fetch
    #[arg(long, default_value_t = 3)]
    redirects: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    /// User-Agent string to use for crawling
    #[arg(long, default_value = "search-engine-rs-bot/0.1")]
    user_agent: String,
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
}

fn main() -> Result<()> {
    let logging = Dispatch::new(fmt().with_env_filter(EnvFilter::from_default_env()).finish());
    let _logging = tracing::dispatcher::set_default(&logging);
    let args = Cli::parse();

    let seed = Url::parse(&args.url)
        .or_else(|_| Url::parse(&format!("https://{}", args.url)))
        .map_err(|err| anyhow!("invalid seed url {}: {err}", args.url))?;
    tracing::info!(%seed, max = args.max.get(), threads = args.threads.get(), "crawler starting");

    let fetcher = HttpFetcher::new(&FetchConfig {
        max_redirects: args.redirects,
        timeout: Duration::from_secs(args.timeout_secs),
        user_agent: args.user_agent.clone(),
    })?;

    let queue = WorkQueue::new(args.threads);
    let index = Arc::new(ConcurrentIndex::new());
    let crawler = WebCrawler::new(Arc::clone(&index), &queue, args.max, Arc::new(fetcher));
    crawler.build(seed);

    let mut results = ConcurrentQueryResults::new(Arc::clone(&index), &queue);
    if let Some(queries) = &args.queries {
        results.build(queries, args.exact)?;
    }
    let results = results.results();
    queue.join();

    index.read(|index| -> Result<()> {
        if let Some(path) = &args.index {
            save_index(index, path)?;
        }
        if let Some(path) = &args.counts {
            save_counts(index, path)?;
        }
        if let Some(path) = &args.results {
            save_results(&results, path)?;
        }
        tracing::info!(pages = index.counts().len(), words = index.num_words(), "done");
        Ok(())
    })
}
