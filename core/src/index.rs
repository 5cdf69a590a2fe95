use serde::{Serialize, Serializer};
use serde_json::value::RawValue;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

/// Positions of one word at one location, 1-based.
pub type Positions = BTreeSet<usize>;

/// Positional inverted index: word -> location -> positions, plus the total
/// number of indexed positions per location.
///
/// Both levels are sorted maps, so iteration (and therefore serialization)
/// order is stable and prefix search can run as a range scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    index: BTreeMap<String, BTreeMap<String, Positions>>,
    counts: BTreeMap<String, usize>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `word` at the 0-based `position` of `location`.
    ///
    /// The position is stored 1-based. The location's count grows only when
    /// the position was not already present for this word.
    pub fn add(&mut self, location: &str, word: &str, position: usize) {
        let positions = self
            .index
            .entry(word.to_string())
            .or_default()
            .entry(location.to_string())
            .or_default();

        if positions.insert(position + 1) {
            *self.counts.entry(location.to_string()).or_insert(0) += 1;
        }
    }

    /// Adds each word at its index in `words`.
    pub fn add_words<S: AsRef<str>>(&mut self, location: &str, words: &[S]) {
        for (position, word) in words.iter().enumerate() {
            self.add(location, word.as_ref(), position);
        }
    }

    /// Union-merges `other` into this index. Counts are only taken from
    /// `other` for locations this index has never seen.
    pub fn add_all(&mut self, other: InvertedIndex) {
        for (word, locations) in other.index {
            match self.index.get_mut(&word) {
                None => {
                    self.index.insert(word, locations);
                }
                Some(existing) => {
                    for (location, positions) in locations {
                        existing.entry(location).or_default().extend(positions);
                    }
                }
            }
        }

        for (location, count) in other.counts {
            self.counts.entry(location).or_insert(count);
        }
    }

    pub fn num_words(&self) -> usize {
        self.index.len()
    }

    pub fn num_locations(&self, word: &str) -> usize {
        self.index.get(word).map_or(0, BTreeMap::len)
    }

    pub fn num_positions(&self, word: &str, location: &str) -> usize {
        self.positions(word, location).map_or(0, BTreeSet::len)
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn has_location(&self, word: &str, location: &str) -> bool {
        self.positions(word, location).is_some()
    }

    /// `position` is 1-based, as stored.
    pub fn has_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.positions(word, location)
            .is_some_and(|positions| positions.contains(&position))
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn locations<'a>(&'a self, word: &str) -> impl Iterator<Item = &'a str> {
        self.index
            .get(word)
            .into_iter()
            .flat_map(|locations| locations.keys().map(String::as_str))
    }

    pub fn get_positions<'a>(&'a self, word: &str, location: &str) -> impl Iterator<Item = usize> + 'a {
        self.positions(word, location).into_iter().flatten().copied()
    }

    /// Locations that have a word count, sorted.
    pub fn counted_locations(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn count(&self, location: &str) -> usize {
        self.counts.get(location).copied().unwrap_or(0)
    }

    /// word -> location -> positions, in sorted order.
    pub fn entries(&self) -> &BTreeMap<String, BTreeMap<String, Positions>> {
        &self.index
    }

    /// location -> total word count, in sorted order.
    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Exact or prefix search for a set of query stems, ranked.
    pub fn search(&self, queries: &BTreeSet<String>, exact: bool) -> Vec<SearchResult> {
        if exact {
            self.exact_search(queries)
        } else {
            self.partial_search(queries)
        }
    }

    pub fn exact_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut collector = Collector::new(self);
        for query in queries {
            if let Some(locations) = self.index.get(query) {
                collector.gather(locations);
            }
        }
        collector.finish()
    }

    pub fn partial_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut collector = Collector::new(self);
        for query in queries {
            let range = self
                .index
                .range::<str, _>((Bound::Included(query.as_str()), Bound::Unbounded))
                .take_while(|(word, _)| word.starts_with(query.as_str()));
            for (_, locations) in range {
                collector.gather(locations);
            }
        }
        collector.finish()
    }

    fn positions(&self, word: &str, location: &str) -> Option<&Positions> {
        self.index.get(word)?.get(location)
    }
}

/// Accumulates one result per location across every matching word of a query.
struct Collector<'a> {
    index: &'a InvertedIndex,
    results: Vec<SearchResult>,
    lookup: HashMap<&'a str, usize>,
}

impl<'a> Collector<'a> {
    fn new(index: &'a InvertedIndex) -> Self {
        Self { index, results: Vec::new(), lookup: HashMap::new() }
    }

    fn gather(&mut self, locations: &'a BTreeMap<String, Positions>) {
        for (location, positions) in locations {
            let slot = *self.lookup.entry(location.as_str()).or_insert_with(|| {
                self.results.push(SearchResult::new(location.clone()));
                self.results.len() - 1
            });
            self.results[slot].count += positions.len();
        }
    }

    fn finish(mut self) -> Vec<SearchResult> {
        for result in &mut self.results {
            let total = self.index.count(&result.location);
            result.score = if total == 0 { 0.0 } else { result.count as f64 / total as f64 };
        }
        self.results.sort();
        self.results
    }
}

/// One ranked hit: how many query-word positions matched at `location`, and
/// that number as a fraction of all words there.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(rename = "where")]
    pub location: String,
    pub count: usize,
    #[serde(serialize_with = "eight_digits")]
    pub score: f64,
}

impl SearchResult {
    fn new(location: String) -> Self {
        Self { location, count: 0, score: 0.0 }
    }
}

fn eight_digits<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    let raw = RawValue::from_string(format!("{score:.8}")).map_err(serde::ser::Error::custom)?;
    raw.serialize(serializer)
}

impl Ord for SearchResult {
    /// Score descending, then count descending, then location ascending
    /// ignoring case.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.count.cmp(&self.count))
            .then_with(|| self.location.to_lowercase().cmp(&other.location.to_lowercase()))
            .then_with(|| self.location.cmp(&other.location))
    }
}

impl PartialOrd for SearchResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SearchResult {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchResult {}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn sample() -> InvertedIndex {
        let mut index = InvertedIndex::new();
        index.add_words("A", &["alpha", "beta"]);
        index.add_words("B", &["beta", "gamma"]);
        index
    }

    #[test]
    fn add_stores_one_based_positions() {
        let index = sample();
        assert!(index.has_position("alpha", "A", 1));
        assert!(index.has_position("beta", "A", 2));
        assert!(!index.has_position("beta", "A", 0));
        assert_eq!(index.get_positions("gamma", "B").collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn duplicate_insert_does_not_recount() {
        let mut index = InvertedIndex::new();
        index.add("doc", "word", 3);
        index.add("doc", "word", 3);
        index.add("doc", "other", 3);
        assert_eq!(index.num_positions("word", "doc"), 1);
        assert_eq!(index.count("doc"), 2);
    }

    #[test]
    fn absent_lookups_are_empty() {
        let index = sample();
        assert!(!index.has_word("delta"));
        assert!(!index.has_location("alpha", "B"));
        assert_eq!(index.num_locations("delta"), 0);
        assert_eq!(index.num_positions("alpha", "Z"), 0);
        assert_eq!(index.locations("delta").count(), 0);
        assert_eq!(index.get_positions("delta", "A").count(), 0);
        assert_eq!(index.count("Z"), 0);
    }

    #[test]
    fn add_all_keeps_existing_counts() {
        let mut left = sample();
        let mut right = InvertedIndex::new();
        right.add("A", "alpha", 5);
        right.add("C", "delta", 0);

        left.add_all(right);
        assert_eq!(left.get_positions("alpha", "A").collect::<Vec<_>>(), vec![1, 6]);
        assert_eq!(left.count("A"), 2);
        assert_eq!(left.count("C"), 1);
        assert_eq!(left.num_words(), 4);
    }

    #[test]
    fn exact_search_ties_break_on_location() {
        let results = sample().search(&query(&["beta"]), true);
        let wheres: Vec<_> = results.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(wheres, vec!["A", "B"]);
        assert!(results.iter().all(|r| r.count == 1 && r.score == 0.5));
    }

    #[test]
    fn partial_search_scans_prefix_range() {
        let mut index = InvertedIndex::new();
        index.add_words("one", &["run", "walk"]);
        index.add_words("two", &["running", "runner", "ruin"]);
        index.add_words("three", &["rum", "runt"]);

        let exact = index.search(&query(&["run"]), true);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].location, "one");

        let partial = index.search(&query(&["run"]), false);
        let mut wheres: Vec<_> = partial.iter().map(|r| r.location.clone()).collect();
        wheres.sort();
        assert_eq!(wheres, vec!["one", "three", "two"]);
        let two = partial.iter().find(|r| r.location == "two").unwrap();
        assert_eq!(two.count, 2);
    }

    #[test]
    fn multiple_query_words_merge_into_one_result() {
        let mut index = InvertedIndex::new();
        index.add_words("doc", &["apple", "banana", "apple", "cherry"]);
        let results = index.search(&query(&["apple", "banana"]), true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].count, 3);
        assert!((results[0].score - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn ranking_prefers_count_then_case_insensitive_location() {
        let mut results = vec![
            SearchResult { location: "b".into(), count: 1, score: 0.5 },
            SearchResult { location: "C".into(), count: 2, score: 0.5 },
            SearchResult { location: "A".into(), count: 1, score: 0.5 },
            SearchResult { location: "z".into(), count: 1, score: 0.9 },
        ];
        results.sort();
        let wheres: Vec<_> = results.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(wheres, vec!["z", "C", "A", "b"]);
    }

    #[test]
    fn result_serializes_score_with_eight_digits() {
        let result = SearchResult { location: "A".into(), count: 1, score: 0.5 };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"where":"A","count":1,"score":0.50000000}"#);
    }
}
