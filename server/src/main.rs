use anyhow::{anyhow, Result};
use clap::Parser;
use search_core::{ConcurrentIndex, ConcurrentIndexBuilder, FetchConfig, HttpFetcher, WebCrawler, WorkQueue};
use server::build_app;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::Dispatch;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser)]
struct Args {
    /// Directory (or file) of text documents to index
    #[arg(long, conflicts_with = "url")]
    path: Option<PathBuf>,
    /// Seed URL to crawl and index
    #[arg(long)]
    url: Option<String>,
    /// Maximum number of pages to crawl
    #[arg(long, default_value = "50")]
    max: NonZeroUsize,
    /// Worker threads used to build the index
    #[arg(long, default_value = "5")]
    threads: NonZeroUsize,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

fn main() -> Result<()> {
    let logging = Dispatch::new(fmt().with_env_filter(EnvFilter::from_default_env()).finish());
    // The server lives as long as the process, so its handle is the process default.
    tracing::dispatcher::set_global_default(logging)?;
    let args = Args::parse();

    // Build before starting the runtime: the crawler's HTTP client blocks.
    let index = build_index(&args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(serve(index, &args))
}

fn build_index(args: &Args) -> Result<Arc<ConcurrentIndex>> {
    let queue = WorkQueue::new(args.threads);
    let index = Arc::new(ConcurrentIndex::new());
    match (&args.path, &args.url) {
        (Some(path), _) => ConcurrentIndexBuilder::new(Arc::clone(&index), &queue).build(path)?,
        (None, Some(url)) => {
            let seed = Url::parse(url).map_err(|err| anyhow!("invalid seed url {url}: {err}"))?;
            let fetcher = HttpFetcher::new(&FetchConfig::default())?;
            WebCrawler::new(Arc::clone(&index), &queue, args.max, Arc::new(fetcher)).build(seed);
        }
        (None, None) => return Err(anyhow!("one of --path or --url is required")),
    }
    queue.join();
    Ok(index)
}

async fn serve(index: Arc<ConcurrentIndex>, args: &Args) -> Result<()> {
    let app = build_app(index);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
