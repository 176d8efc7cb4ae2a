use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hashtrie::HashTrie;
use rand::seq::SliceRandom;
use rand::thread_rng;

fn random_keys(count: usize) -> Vec<i64> {
    let mut keys: Vec<i64> = (0..count as i64).collect();
    keys.shuffle(&mut thread_rng());
    keys
}

fn criterion_benchmark(c: &mut Criterion) {
    let sizes = [10usize, 100, 1_000, 10_000, 100_000];

    for &size in &sizes {
        let keys = random_keys(size);
        c.bench_function(&format!("insert {size}"), |b| {
            b.iter(|| {
                let mut trie = HashTrie::new();
                for &k in black_box(&keys) {
                    trie.insert(k, k).unwrap();
                }
            })
        });
    }

    for &size in &sizes {
        let keys = random_keys(size);
        let mut trie = HashTrie::new();
        for &k in &keys {
            trie.insert(k, k).unwrap();
        }
        c.bench_function(&format!("get {size}"), |b| {
            b.iter(|| {
                for &k in black_box(&keys) {
                    black_box(trie.get(&k));
                }
            })
        });
    }

    for &size in &sizes {
        let keys = random_keys(size);
        let mut trie = HashTrie::new();
        for &k in &keys {
            trie.insert(k, k).unwrap();
        }
        c.bench_function(&format!("branch then insert {size}"), |b| {
            b.iter(|| {
                let mut branch = trie.branch();
                branch.insert(black_box(-1), -1).unwrap();
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
