//! Turns text files into index entries, either directly into one index or in
//! parallel through per-file local indexes merged into a [`ConcurrentIndex`].

use crate::concurrent::ConcurrentIndex;
use crate::index::InvertedIndex;
use crate::tokenizer;
use crate::work_queue::WorkQueue;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Lists the text files under `root` (`.txt` / `.text`, any case), sorted.
/// A `root` that is not a directory is returned as-is.
pub fn traverse(root: &Path) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(root).with_context(|| format!("cannot read {}", root.display()))?;
    if !meta.is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(%err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_text_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .is_some_and(|ext| matches!(ext.as_str(), "txt" | "text"))
}

/// Stems every line of `path` into `index`, positions running across lines.
pub fn add_file(path: &Path, index: &mut InvertedIndex) -> Result<()> {
    let location = path.to_string_lossy();
    let reader = BufReader::new(File::open(path).with_context(|| format!("cannot open {}", path.display()))?);

    let mut position = 0;
    for line in reader.lines() {
        let line = line.with_context(|| format!("cannot read {}", path.display()))?;
        for word in tokenizer::list_stems(&line) {
            index.add(&location, &word, position);
            position += 1;
        }
    }
    Ok(())
}

/// Stems `text` into `index` under `location`.
pub fn add_text(location: &str, text: &str, index: &mut InvertedIndex) {
    index.add_words(location, &tokenizer::list_stems(text));
}

/// Single-threaded builder writing straight into one index.
pub struct IndexBuilder<'a> {
    index: &'a mut InvertedIndex,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(index: &'a mut InvertedIndex) -> Self {
        Self { index }
    }

    pub fn build(&mut self, root: &Path) -> Result<()> {
        for path in traverse(root)? {
            add_file(&path, self.index)?;
        }
        tracing::info!(words = self.index.num_words(), "index build complete");
        Ok(())
    }
}

/// Builds a [`ConcurrentIndex`] with one task per file.
pub struct ConcurrentIndexBuilder<'a> {
    index: Arc<ConcurrentIndex>,
    queue: &'a WorkQueue,
}

impl<'a> ConcurrentIndexBuilder<'a> {
    pub fn new(index: Arc<ConcurrentIndex>, queue: &'a WorkQueue) -> Self {
        Self { index, queue }
    }

    /// Indexes every file under `root` and returns once all of them have been
    /// merged. A file that fails to read is logged and left out.
    pub fn build(&self, root: &Path) -> Result<()> {
        for path in traverse(root)? {
            self.add_file(path);
        }
        self.queue.finish();
        tracing::info!(words = self.index.num_words(), "index build complete");
        Ok(())
    }

    /// Indexes in-memory documents, one task each.
    pub fn build_documents<I>(&self, documents: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (location, text) in documents {
            let index = Arc::clone(&self.index);
            self.queue.execute(move || {
                let mut local = InvertedIndex::new();
                add_text(&location, &text, &mut local);
                index.add_all(local);
            });
        }
        self.queue.finish();
    }

    fn add_file(&self, path: PathBuf) {
        let index = Arc::clone(&self.index);
        tracing::debug!(path = %path.display(), "index task created");
        self.queue.execute(move || {
            let mut local = InvertedIndex::new();
            match add_file(&path, &mut local) {
                Ok(()) => index.add_all(local),
                Err(err) => tracing::warn!(path = %path.display(), "skipping file: {err:#}"),
            }
        });
    }
}
