// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Completion and signature help benchmarks
//!
//! Measures the resolvers against a fixture catalog and a long document.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pg_sql_lsp_lsp::{CompletionResolver, SignatureResolver};
use pg_sql_lsp_test_utils::CatalogFixtures;

fn long_document(statements: usize, tail: &str) -> String {
    let mut text = "SELECT id, email FROM users WHERE id = 1;\n".repeat(statements);
    text.push_str(tail);
    text
}

fn bench_completion_by_trigger(c: &mut Criterion) {
    let catalog = CatalogFixtures::catalog();
    let resolver = CompletionResolver::new(&catalog);

    let cases = [
        ("general", "SELECT ", None),
        ("schema_member", "SELECT * FROM public.", Some(".")),
        ("table_member", "SELECT users.", Some(".")),
        ("quoted", "SELECT * FROM \"", Some("\"")),
    ];

    let mut group = c.benchmark_group("completion");
    for (name, tail, trigger) in cases {
        let text = long_document(200, tail);
        let offset = text.chars().count();

        group.bench_with_input(BenchmarkId::from_parameter(name), &text, |b, text| {
            b.iter(|| {
                let items = resolver.resolve(black_box(text), offset, trigger);
                black_box(items);
            });
        });
    }
    group.finish();
}

fn bench_signature_help(c: &mut Criterion) {
    let catalog = CatalogFixtures::catalog();
    let resolver = SignatureResolver::new(&catalog);

    for depth in [1usize, 8, 32] {
        let tail = format!("SELECT round({}1{}, ", "(".repeat(depth), ")".repeat(depth));
        let text = long_document(200, &tail);
        let offset = text.chars().count();

        c.bench_with_input(
            BenchmarkId::new("signature/nesting", depth),
            &text,
            |b, text| {
                b.iter(|| black_box(resolver.resolve(black_box(text), offset)));
            },
        );
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(50);
    targets =
        bench_completion_by_trigger,
        bench_signature_help
);

criterion_main!(benches);
