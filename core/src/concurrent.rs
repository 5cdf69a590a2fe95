use crate::index::{InvertedIndex, SearchResult};
use crate::rwlock::Shared;
use std::collections::BTreeSet;

/// An [`InvertedIndex`] that many threads can build and query at once.
///
/// Mutations run under the write lock, everything else under the read lock.
/// Because merging is a set union, the final contents do not depend on the
/// order in which writers get the lock.
#[derive(Debug, Default)]
pub struct ConcurrentIndex {
    inner: Shared<InvertedIndex>,
}

impl ConcurrentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, location: &str, word: &str, position: usize) {
        self.inner.write(|index| index.add(location, word, position));
    }

    pub fn add_words<S: AsRef<str>>(&self, location: &str, words: &[S]) {
        self.inner.write(|index| index.add_words(location, words));
    }

    pub fn add_all(&self, other: InvertedIndex) {
        self.inner.write(|index| index.add_all(other));
    }

    pub fn num_words(&self) -> usize {
        self.inner.read(InvertedIndex::num_words)
    }

    pub fn num_locations(&self, word: &str) -> usize {
        self.inner.read(|index| index.num_locations(word))
    }

    pub fn num_positions(&self, word: &str, location: &str) -> usize {
        self.inner.read(|index| index.num_positions(word, location))
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.inner.read(|index| index.has_word(word))
    }

    pub fn has_location(&self, word: &str, location: &str) -> bool {
        self.inner.read(|index| index.has_location(word, location))
    }

    pub fn has_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.inner.read(|index| index.has_position(word, location, position))
    }

    pub fn words(&self) -> Vec<String> {
        self.inner.read(|index| index.words().map(str::to_string).collect())
    }

    pub fn locations(&self, word: &str) -> Vec<String> {
        self.inner.read(|index| index.locations(word).map(str::to_string).collect())
    }

    pub fn positions(&self, word: &str, location: &str) -> Vec<usize> {
        self.inner.read(|index| index.get_positions(word, location).collect())
    }

    pub fn count(&self, location: &str) -> usize {
        self.inner.read(|index| index.count(location))
    }

    pub fn search(&self, queries: &BTreeSet<String>, exact: bool) -> Vec<SearchResult> {
        self.inner.read(|index| index.search(queries, exact))
    }

    /// Runs `f` against the index inside one read-locked section.
    pub fn read<R>(&self, f: impl FnOnce(&InvertedIndex) -> R) -> R {
        self.inner.read(f)
    }

    /// A consistent copy of the current contents.
    pub fn snapshot(&self) -> InvertedIndex {
        self.inner.read(InvertedIndex::clone)
    }

    pub fn into_inner(self) -> InvertedIndex {
        self.inner.into_inner()
    }
}

impl From<InvertedIndex> for ConcurrentIndex {
    fn from(index: InvertedIndex) -> Self {
        Self { inner: Shared::new(index) }
    }
}
