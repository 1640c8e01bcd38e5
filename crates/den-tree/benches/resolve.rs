//! Trie resolution benchmarks.
//!
//! Run with: `cargo bench -p den-tree`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use den_tree::PageTree;

fn build_tree(num_paths: usize) -> PageTree<usize> {
    let mut tree = PageTree::new();

    for i in 0..num_paths / 2 {
        tree.add_path(&["docs".to_string(), format!("section{i}")], i);
    }

    for i in 0..num_paths / 2 {
        tree.add_path(
            &[
                "blog".to_string(),
                format!("{}", 2000 + i % 25),
                format!("post{i}"),
            ],
            i,
        );
    }

    tree
}

fn segments(path: &str) -> Vec<String> {
    path.split('/').map(str::to_string).collect()
}

fn bench_exact_match(c: &mut Criterion) {
    let tree = build_tree(100);
    let path = segments("docs/section25");

    c.bench_function("exact_match", |b| {
        b.iter(|| black_box(tree.resolve(black_box(&path[..]))));
    });
}

fn bench_suffix_match(c: &mut Criterion) {
    let tree = build_tree(100);
    let path = segments("blog/2010/post10/comments/page/2");

    c.bench_function("suffix_match", |b| {
        b.iter(|| black_box(tree.resolve(black_box(&path[..]))));
    });
}

fn bench_miss(c: &mut Criterion) {
    let tree = build_tree(100);
    let path = segments("docs/nonexistent/page");

    c.bench_function("miss", |b| {
        b.iter(|| black_box(tree.resolve(black_box(&path[..]))));
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for num_paths in [10, 100, 1000, 10_000] {
        let tree = build_tree(num_paths);

        group.bench_with_input(
            BenchmarkId::new("exact_match", num_paths),
            &num_paths,
            |b, &n| {
                let path = segments(&format!("docs/section{}", n / 4));
                b.iter(|| black_box(tree.resolve(&path[..])));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_exact_match,
    bench_suffix_match,
    bench_miss,
    bench_scaling
);
criterion_main!(benches);
