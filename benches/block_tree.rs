use criterion::{criterion_group, criterion_main, Criterion};
use dedup_tree::blocktree::{access, build_block_tree, BlockTreeArity};

fn build_on_english_prose(c: &mut Criterion) {
    let text: Vec<char> = "the quick brown fox jumps over the lazy dog. "
        .repeat(5_000)
        .chars()
        .collect();

    c.bench_function("build_block_tree over ~235k code points", |b| {
        b.iter(|| build_block_tree(&text, BlockTreeArity::default()));
    });
}

fn query_access_after_build(c: &mut Criterion) {
    let text: Vec<char> = "the quick brown fox jumps over the lazy dog. ".repeat(5_000).chars().collect();
    let tree = build_block_tree(&text, BlockTreeArity::default());

    c.bench_function("access 10k random positions", |b| {
        b.iter(|| {
            for i in 0..10_000 {
                let pos = (i * 37) % text.len();
                access(&tree.nodes, tree.root, pos, &text);
            }
        });
    });
}

criterion_group!(benches, build_on_english_prose, query_access_after_build);
criterion_main!(benches);
