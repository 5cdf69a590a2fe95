//! Bounded-frontier web crawl feeding a [`ConcurrentIndex`].
//!
//! Each page is one task on the [`WorkQueue`]: fetch, admit newly discovered
//! links into the frontier (spawning a task per admitted link), then index
//! the page's visible text into a local index and merge it.

use crate::builder::add_text;
use crate::concurrent::ConcurrentIndex;
use crate::fetch::Fetcher;
use crate::html;
use crate::index::InvertedIndex;
use crate::work_queue::{Submitter, WorkQueue};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use url::Url;

/// The set of addresses ever admitted to the crawl, capped at `max`. The cap
/// is never zero, so a crawl always has room for its seed.
#[derive(Debug)]
pub struct Frontier {
    max: usize,
    seen: Mutex<HashSet<Url>>,
}

impl Frontier {
    pub fn new(max: NonZeroUsize) -> Self {
        Self { max: max.get(), seen: Mutex::new(HashSet::new()) }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.max
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.seen.lock().contains(url)
    }

    /// Admits unseen `links` in order until the frontier is full, returning
    /// those admitted. Checking the bound and inserting happen under one lock.
    pub fn admit<I>(&self, links: I) -> Vec<Url>
    where
        I: IntoIterator<Item = Url>,
    {
        let mut seen = self.seen.lock();
        let mut admitted = Vec::new();
        for link in links {
            if seen.len() >= self.max {
                break;
            }
            if seen.insert(link.clone()) {
                admitted.push(link);
            }
        }
        admitted
    }

    /// Sorted copy of the admitted addresses.
    pub fn urls(&self) -> Vec<Url> {
        let mut urls: Vec<Url> = self.seen.lock().iter().cloned().collect();
        urls.sort();
        urls
    }
}

struct Crawl {
    index: Arc<ConcurrentIndex>,
    frontier: Frontier,
    fetcher: Arc<dyn Fetcher>,
    queue: Submitter,
}

/// Crawls outward from a seed, indexing at most `max` pages.
pub struct WebCrawler {
    crawl: Arc<Crawl>,
}

impl WebCrawler {
    pub fn new(index: Arc<ConcurrentIndex>, queue: &WorkQueue, max: NonZeroUsize, fetcher: Arc<dyn Fetcher>) -> Self {
        let crawl = Crawl { index, frontier: Frontier::new(max), fetcher, queue: queue.submitter() };
        Self { crawl: Arc::new(crawl) }
    }

    /// Crawls from `seed` and returns once every admitted page is processed.
    pub fn build(&self, seed: Url) {
        for url in self.crawl.frontier.admit([seed]) {
            spawn(&self.crawl, url);
        }
        self.crawl.queue.finish();
        tracing::info!(pages = self.crawl.frontier.len(), "crawl complete");
    }

    pub fn frontier(&self) -> &Frontier {
        &self.crawl.frontier
    }
}

fn spawn(crawl: &Arc<Crawl>, url: Url) {
    tracing::debug!(%url, "crawl task created");
    let task = Arc::clone(crawl);
    crawl.queue.execute(move || crawl_page(&task, url));
}

fn crawl_page(crawl: &Arc<Crawl>, url: Url) {
    let Some(page) = crawl.fetcher.fetch(&url) else {
        tracing::warn!(%url, "no content fetched");
        return;
    };
    let page = html::strip_block_elements(&page);

    if !crawl.frontier.is_full() {
        let links = html::valid_links(&url, &page);
        for link in crawl.frontier.admit(links) {
            spawn(crawl, link);
        }
    }

    let mut local = InvertedIndex::new();
    add_text(url.as_str(), &html::strip_html(&page), &mut local);
    crawl.index.add_all(local);
}
