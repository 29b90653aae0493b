//! Criterion benchmarks for query assembly and in-memory execution
//!
//! These benchmarks measure:
//! - Free-text clause construction in exact and fuzzy mode
//! - Full request assembly with filters and access control
//! - Lowering to the backend query DSL
//! - In-memory search over a synthetic order set

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use global_search::search::{
    query_to_dsl, AccessControl, DateRange, FieldCatalog, InMemoryBackend, MatchType,
    QueryBuilder, SearchExecutor, SearchRequest, SearchSettings,
};
use serde_json::json;
use std::sync::Arc;

fn sample_request() -> SearchRequest {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
    SearchRequest::new("ord1009")
        .with_filter("crStatus", ["OPEN", "HOLD"])
        .with_filter("workType", ["INSTALL"])
        .with_date_range("dueDate", DateRange::new(start, end))
        .with_owner("jdoe")
        .with_access(AccessControl::default().with_sensitivity_levels(["1", "6", "8"]))
}

/// Benchmark free-text clause construction
fn bench_free_text_clause(c: &mut Criterion) {
    let builder = QueryBuilder::new(Arc::new(FieldCatalog::order_details()));

    let mut group = c.benchmark_group("free_text_clause");
    for match_type in [MatchType::Exact, MatchType::Fuzzy] {
        group.bench_with_input(
            BenchmarkId::from_parameter(match_type),
            &match_type,
            |b, &match_type| {
                b.iter(|| builder.build_free_text_clause(black_box("ORD-1009*"), match_type));
            },
        );
    }
    group.finish();
}

/// Benchmark full assembly and lowering
fn bench_assemble(c: &mut Criterion) {
    let builder = QueryBuilder::new(Arc::new(FieldCatalog::order_details()));
    let request = sample_request();

    c.bench_function("assemble", |b| {
        b.iter(|| builder.assemble(black_box(&request)));
    });

    let query = builder.assemble(&request).unwrap();
    c.bench_function("query_to_dsl", |b| {
        b.iter(|| query_to_dsl(black_box(&query)));
    });
}

/// Benchmark in-memory search at several corpus sizes
fn bench_memory_search(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let statuses = ["OPEN", "HOLD", "CLOSED"];

    let mut group = c.benchmark_group("memory_search");
    for size in [100usize, 1_000, 10_000] {
        let documents = (0..size)
            .map(|i| {
                json!({
                    "id": i.to_string(),
                    "orderNumber": format!("ORD-{}", 1000 + i),
                    "crStatus": statuses[i % statuses.len()],
                    "workType": if i % 2 == 0 { "INSTALL" } else { "REPAIR" },
                    "userName": if i % 5 == 0 { "jdoe" } else { "asmith" },
                    "dueDate": format!("2024-0{}-15", 1 + i % 6),
                })
            })
            .collect();
        let executor = SearchExecutor::new(
            Arc::new(FieldCatalog::order_details()),
            &SearchSettings::default(),
            Arc::new(InMemoryBackend::new(documents)),
        );
        let request = sample_request();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.to_async(&runtime).iter(|| executor.search(black_box(&request)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_free_text_clause,
    bench_assemble,
    bench_memory_search
);
criterion_main!(benches);
