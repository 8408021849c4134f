//! Performance benchmarks for rule resolution
//!
//! Run with: cargo bench --package filerouter-filter

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use filerouter_filter::path;
use filerouter_filter::rules::{FilenameFilter, MatchLogic};
use filerouter_filter::{RoutingConfigSet, RoutingRule};

fn create_rule_set(size: usize) -> RoutingConfigSet {
    let mut rules: Vec<RoutingRule> = (0..size)
        .map(|i| {
            RoutingRule::new(
                format!("rule-{}", i),
                format!("Folder{}/", i),
                "dst",
                format!("Out{}/", i),
            )
            .with_priority(i as i64)
            .with_file_types([".csv", ".json"])
        })
        .collect();

    rules.push(
        RoutingRule::new("filtered", format!("Folder{}/", size), "dst", "Filtered/")
            .with_priority(size as i64)
            .with_filename_filter(FilenameFilter::MultiplePatterns {
                patterns: vec![
                    FilenameFilter::StartsWith {
                        value: "sales".to_string(),
                        case_sensitive: false,
                    },
                    FilenameFilter::regex(r"_\d{8}\.csv$", false),
                ],
                match_logic: MatchLogic::All,
            }),
    );

    RoutingConfigSet::new(rules)
}

fn bench_key_splitting(c: &mut Criterion) {
    let key = "Inbox/Region/Store/daily_export_20240101.csv";

    c.bench_function("split_key", |b| {
        b.iter(|| {
            let key = black_box(key);
            black_box((path::source_folder(key), path::filename(key)))
        });
    });
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for size in [10usize, 100, 1000] {
        let set = create_rule_set(size);
        let last_plain = format!("Folder{}/data.csv", size - 1);
        let filtered = format!("Folder{}/sales_20240101.csv", size);

        group.bench_with_input(BenchmarkId::new("last_plain_rule", size), &set, |b, set| {
            b.iter(|| black_box(set.resolve(black_box(&last_plain))));
        });

        group.bench_with_input(BenchmarkId::new("filtered_rule", size), &set, |b, set| {
            b.iter(|| black_box(set.resolve(black_box(&filtered))));
        });

        group.bench_with_input(BenchmarkId::new("no_match", size), &set, |b, set| {
            b.iter(|| black_box(set.resolve(black_box("Unknown/data.csv"))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_key_splitting, bench_resolve);
criterion_main!(benches);
