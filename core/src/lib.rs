//! In-memory positional search index with concurrent builders.
//!
//! Documents (text files or crawled pages) are stemmed into per-task local
//! [`InvertedIndex`]es that are merged into a shared [`ConcurrentIndex`] by
//! tasks running on a [`WorkQueue`]. The finished index answers exact and
//! prefix queries with ranked [`SearchResult`]s.

pub mod builder;
pub mod concurrent;
pub mod crawl;
pub mod fetch;
pub mod html;
pub mod index;
pub mod output;
pub mod results;
pub mod rwlock;
pub mod tokenizer;
pub mod work_queue;

pub use builder::{ConcurrentIndexBuilder, IndexBuilder};
pub use concurrent::ConcurrentIndex;
pub use crawl::{Frontier, WebCrawler};
pub use fetch::{FetchConfig, Fetcher, HttpFetcher};
pub use index::{InvertedIndex, SearchResult};
pub use results::{ConcurrentQueryResults, QueryResults, ResultBuilder, ResultMap};
pub use rwlock::{LockError, ReadWriteLock, Shared, SimpleLock};
pub use work_queue::{Submitter, WorkQueue};
