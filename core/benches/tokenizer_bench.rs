use criterion::{criterion_group, criterion_main, Criterion};
use search_core::tokenizer::list_stems;

fn bench_tokenize(c: &mut Criterion) {
    let text = "The quick brown fox jumps over the lazy dog. Running runners ran; café menus! ".repeat(200);
    c.bench_function("list_stems_paragraph", |b| b.iter(|| list_stems(&text)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
