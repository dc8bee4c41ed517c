use criterion::{criterion_group, criterion_main, Criterion};
use search_core::html::extract;
use search_core::tokenizer::tokenize;

const PAGE: &str = r#"<html><head><title>Information Retrieval</title></head><body>
<h1>Indexing</h1><p>An inverted index maps every <b>token</b> to the documents containing it.
Partitioned construction writes sorted partial indexes that are merged into a single file,
and a term directory records the byte offset of each token so postings can be read with one seek.</p>
</body></html>"#;

fn bench_tokenize(c: &mut Criterion) {
    let text = PAGE.repeat(50);
    c.bench_function("tokenize_page_text", |b| b.iter(|| tokenize(&text)));
    c.bench_function("extract_and_tokenize", |b| b.iter(|| tokenize(&extract(PAGE).text)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
