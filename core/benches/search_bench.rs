use criterion::{criterion_group, criterion_main, Criterion};
use search_core::InvertedIndex;
use std::collections::BTreeSet;

fn build_index() -> InvertedIndex {
    let mut index = InvertedIndex::new();
    for doc in 0..500 {
        let words: Vec<String> = (0..200).map(|i| format!("w{}", (i * 31 + doc * 7) % 997)).collect();
        index.add_words(&format!("doc{doc}"), &words);
    }
    index
}

fn bench_search(c: &mut Criterion) {
    let index = build_index();
    let queries: BTreeSet<String> = ["w1", "w42", "w500"].iter().map(|s| s.to_string()).collect();
    c.bench_function("exact_search", |b| b.iter(|| index.search(&queries, true)));
    c.bench_function("partial_search", |b| b.iter(|| index.search(&queries, false)));
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
