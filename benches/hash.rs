use criterion::{criterion_group, criterion_main, Criterion};
use dedup_tree::blocktree::BlockNode;
use dedup_tree::hash::{block_id, compute_hashes_parallel_with};
use dedup_tree::pool::HashPool;

fn scalar_block_id(c: &mut Criterion) {
    let text: Vec<char> = "the quick brown fox jumps over the lazy dog ".repeat(200).chars().collect();

    c.bench_function("block_id over 64 code points", |b| {
        b.iter(|| block_id(&text, 0, 64));
    });
}

fn parallel_hash_fan_out(c: &mut Criterion) {
    let text: Vec<char> = "the quick brown fox jumps over the lazy dog ".repeat(2000).chars().collect();

    for threads in [1, 4, 16] {
        let pool = HashPool::with_thread_count(threads);
        c.bench_function(&format!("compute_hashes_parallel with {threads} thread(s)"), |b| {
            b.iter(|| {
                let mut nodes: Vec<BlockNode> = (0..10_000).map(|i| BlockNode::new(i % text.len(), 5, 1, None)).collect();
                compute_hashes_parallel_with(&mut nodes, &text, &pool);
            });
        });
    }
}

criterion_group!(benches, scalar_block_id, parallel_hash_fan_out);
criterion_main!(benches);
