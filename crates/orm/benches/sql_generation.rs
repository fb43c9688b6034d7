//! SQL generation benchmarks
//!
//! Compiles representative builder shapes for each dialect.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use astra_orm::query::{JoinType, QueryBuilder};
use astra_orm::SqlDialect;

fn bench_basic_sql_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("basic_sql_generation");

    group.bench_function("simple_select", |b| {
        let query = QueryBuilder::table("users").select("id, name, email");

        b.iter(|| black_box(query.to_sql()))
    });

    group.bench_function("select_with_where", |b| {
        let query = QueryBuilder::table("users")
            .select("id, name, email")
            .where_eq("active", true)
            .where_gt("created_at", "2023-01-01");

        b.iter(|| black_box(query.to_sql()))
    });

    group.bench_function("select_with_joins", |b| {
        let query = QueryBuilder::table("users")
            .select("users.id, users.name, profiles.title")
            .join("profiles", "profiles.user_id", "=", "users.id")
            .join_with("addresses", JoinType::Left, |j| {
                j.on("addresses.user_id", "=", "users.id").where_eq("addresses.primary", true)
            })
            .where_eq("users.active", true)
            .where_not_null("profiles.title")
            .order_by_desc("users.created_at")
            .limit(50);

        b.iter(|| black_box((query.to_sql(), query.get_bindings())))
    });

    group.finish();
}

fn bench_dialects(c: &mut Criterion) {
    let mut group = c.benchmark_group("dialects");
    let query = QueryBuilder::table("orders")
        .where_date("created_at", ">=", "2024-01-01")
        .where_nested(|q| q.where_eq("status", "paid").or_where_eq("status", "shipped"))
        .group_by("customer_id")
        .having("COUNT(*)", ">", 2)
        .offset(20);

    for dialect in [SqlDialect::MySQL, SqlDialect::PostgreSQL, SqlDialect::SQLite] {
        group.bench_with_input(BenchmarkId::new("compile", format!("{dialect:?}")), &dialect, |b, d| {
            b.iter(|| black_box(query.to_sql_for(*d)))
        });
    }

    group.finish();
}

fn bench_large_in_lists(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_in_lists");

    for size in [10usize, 1_000, 5_000] {
        let ids: Vec<i64> = (0..size as i64).collect();
        group.bench_with_input(BenchmarkId::new("where_in", size), &ids, |b, ids| {
            b.iter(|| {
                let query = QueryBuilder::table("users").where_in("id", ids.iter().copied());
                black_box(query.to_sql())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_basic_sql_generation,
    bench_dialects,
    bench_large_in_lists
);
criterion_main!(benches);
