//! Answers a file of queries, one query per line, against a built index.

use crate::concurrent::ConcurrentIndex;
use crate::index::{InvertedIndex, SearchResult};
use crate::tokenizer;
use crate::work_queue::WorkQueue;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Query (its unique stems joined by spaces) -> ranked results.
pub type ResultMap = BTreeMap<String, Vec<SearchResult>>;

/// Unique stems of `line` and the key they are reported under, or `None` if
/// the line has no stems.
pub fn query_key(line: &str) -> Option<(String, BTreeSet<String>)> {
    let stems = tokenizer::unique_stems(line);
    if stems.is_empty() {
        return None;
    }
    let key = stems.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
    Some((key, stems))
}

pub trait ResultBuilder {
    /// Searches one query line, unless an equivalent query was already answered.
    fn add_line(&mut self, line: &str, exact: bool);

    fn results(&self) -> ResultMap;

    /// Searches every line of `path`.
    fn build(&mut self, path: &Path, exact: bool) -> Result<()> {
        let reader = BufReader::new(File::open(path).with_context(|| format!("cannot open {}", path.display()))?);
        for line in reader.lines() {
            let line = line.with_context(|| format!("cannot read {}", path.display()))?;
            self.add_line(&line, exact);
        }
        Ok(())
    }
}

pub struct QueryResults<'a> {
    index: &'a InvertedIndex,
    results: ResultMap,
}

impl<'a> QueryResults<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self { index, results: ResultMap::new() }
    }
}

impl ResultBuilder for QueryResults<'_> {
    fn add_line(&mut self, line: &str, exact: bool) {
        if let Some((key, stems)) = query_key(line) {
            if !self.results.contains_key(&key) {
                let found = self.index.search(&stems, exact);
                self.results.insert(key, found);
            }
        }
    }

    fn results(&self) -> ResultMap {
        self.results.clone()
    }
}

/// Searches each query line as its own task.
pub struct ConcurrentQueryResults<'a> {
    index: Arc<ConcurrentIndex>,
    queue: &'a WorkQueue,
    results: Arc<Mutex<ResultMap>>,
}

impl<'a> ConcurrentQueryResults<'a> {
    pub fn new(index: Arc<ConcurrentIndex>, queue: &'a WorkQueue) -> Self {
        Self { index, queue, results: Arc::default() }
    }
}

impl ResultBuilder for ConcurrentQueryResults<'_> {
    fn add_line(&mut self, line: &str, exact: bool) {
        let line = line.to_string();
        let index = Arc::clone(&self.index);
        let results = Arc::clone(&self.results);
        self.queue.execute(move || {
            let Some((key, stems)) = query_key(&line) else {
                return;
            };
            if results.lock().contains_key(&key) {
                return;
            }
            let found = index.search(&stems, exact);
            results.lock().insert(key, found);
        });
    }

    /// Waits for queued queries before returning.
    fn results(&self) -> ResultMap {
        self.queue.finish();
        self.results.lock().clone()
    }

    fn build(&mut self, path: &Path, exact: bool) -> Result<()> {
        let reader = BufReader::new(File::open(path).with_context(|| format!("cannot open {}", path.display()))?);
        for line in reader.lines() {
            let line = line.with_context(|| format!("cannot read {}", path.display()))?;
            self.add_line(&line, exact);
        }
        self.queue.finish();
        Ok(())
    }
}
