//! Criterion benchmarks for the jq_core evaluator.
//!
//! Programs are compiled once outside the timed loop, so the figures measure
//! evaluation of the node tree only; the `compile` group measures parsing plus
//! lowering on its own.
//!
//! Run:
//!   cargo bench
//!   cargo bench -- simple_path        # one group
//!   cargo bench -- realistic_workload # one group

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexMap;
use jq_core::{compile, JsonValue, Program};

// ── Data builders ─────────────────────────────────────────────────────────────

/// Flat array of f64 values: [0.0, 1.0, ..., (n-1).0].
fn numeric_array(n: usize) -> JsonValue {
    JsonValue::array((0..n).map(|i| JsonValue::from(i as f64)).collect())
}

/// 100 product objects: {id, name, category, price, inStock, tags}.
fn products_100() -> JsonValue {
    let categories = ["Electronics", "Clothing", "Books", "Home"];
    let products: Vec<JsonValue> = (0..100_usize)
        .map(|i| {
            let tags: Vec<JsonValue> = (0..i % 5)
                .map(|j| JsonValue::string(format!("tag{j}")))
                .collect();
            let mut p = IndexMap::new();
            p.insert("id".to_string(), JsonValue::from(i));
            p.insert("name".to_string(), JsonValue::string(format!("Product {i}")));
            p.insert("category".to_string(), JsonValue::from(categories[i % 4]));
            p.insert("price".to_string(), JsonValue::from(10.0 + i as f64 * 2.5));
            p.insert("inStock".to_string(), JsonValue::Bool(i % 2 == 0));
            p.insert("tags".to_string(), JsonValue::array(tags));
            JsonValue::object(p)
        })
        .collect();
    let mut root = IndexMap::new();
    root.insert("products".to_string(), JsonValue::array(products));
    JsonValue::object(root)
}

fn program(source: &str) -> Program {
    compile(source).unwrap()
}

fn eval(program: &Program, data: &JsonValue) -> Vec<JsonValue> {
    program.evaluate(data).unwrap()
}

// ── Bench groups ──────────────────────────────────────────────────────────────

fn bench_simple_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("simple_path");
    group.sample_size(300);

    {
        let prog = program(".name");
        let data = JsonValue::from_json_str(r#"{"name":"Alice","age":30}"#).unwrap();
        group.bench_function("field", |b| {
            b.iter(|| black_box(eval(black_box(&prog), black_box(&data))))
        });
    }

    {
        let prog = program(".a.b.c.d.e");
        let data = JsonValue::from_json_str(r#"{"a":{"b":{"c":{"d":{"e":42}}}}}"#).unwrap();
        group.bench_function("deep_path_5", |b| {
            b.iter(|| black_box(eval(black_box(&prog), black_box(&data))))
        });
    }

    {
        let prog = program(".[42]");
        let data = numeric_array(100);
        group.bench_function("array_index_100", |b| {
            b.iter(|| black_box(eval(black_box(&prog), black_box(&data))))
        });
    }

    {
        let prog = program(".price * .quantity");
        let data = JsonValue::from_json_str(r#"{"price":10.5,"quantity":3}"#).unwrap();
        group.bench_function("arithmetic", |b| {
            b.iter(|| black_box(eval(black_box(&prog), black_box(&data))))
        });
    }

    group.finish();
}

fn bench_array_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_operations");

    for n in [100_usize, 1000, 10000] {
        let data = numeric_array(n);
        let add = program("add");
        let max = program("max");
        let spread = program("[.[] | . * 2]");

        group.bench_with_input(BenchmarkId::new("add", n), &data, |b, d| {
            b.iter(|| black_box(eval(black_box(&add), black_box(d))))
        });
        group.bench_with_input(BenchmarkId::new("max", n), &data, |b, d| {
            b.iter(|| black_box(eval(black_box(&max), black_box(d))))
        });
        group.bench_with_input(BenchmarkId::new("spread_map", n), &data, |b, d| {
            b.iter(|| black_box(eval(black_box(&spread), black_box(d))))
        });
    }

    {
        let data = products_100();
        let prog = program("[.products[] | select(.price > 100) | .name]");
        group.bench_function("select_100", |b| {
            b.iter(|| black_box(eval(black_box(&prog), black_box(&data))))
        });
    }

    {
        let data = products_100();
        let prog = program(".products | sort_by(.price) | map(.id)");
        group.bench_function("sort_by_100", |b| {
            b.iter(|| black_box(eval(black_box(&prog), black_box(&data))))
        });
    }

    group.finish();
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    {
        let data = products_100();
        let prog = program("[.products[] | {name, price, tag: .tags[]}]");
        group.bench_function("object_fanout_100", |b| {
            b.iter(|| black_box(eval(black_box(&prog), black_box(&data))))
        });
    }

    {
        let prog = program("[range(0; 1000) | {(tostring): .}] | add");
        group.bench_function("merge_1000", |b| {
            b.iter(|| black_box(eval(black_box(&prog), black_box(&JsonValue::Null))))
        });
    }

    {
        let prog = program("[combinations(3)]");
        let data = numeric_array(10);
        group.bench_function("combinations_10x3", |b| {
            b.iter(|| black_box(eval(black_box(&prog), black_box(&data))))
        });
    }

    group.finish();
}

fn bench_realistic_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("realistic_workload");
    let data = products_100();

    let cases = [
        ("group_by_category", ".products | group_by(.category) | map({category: .[0].category, count: length})"),
        ("in_stock_names", "[.products[] | select(.inStock) | .name | ascii_upcase]"),
        ("entries_roundtrip", ".products[0] | with_entries(select(.key != \"tags\"))"),
        ("tag_index", "[.products[] | .tags | join(\",\")] | unique"),
    ];

    for (name, source) in cases {
        let prog = program(source);
        group.bench_function(name, |b| {
            b.iter(|| black_box(eval(black_box(&prog), black_box(&data))))
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    let sources = [
        ("field", ".name"),
        ("pipeline", ".products[] | select(.price > 100 and .inStock) | {name, price}"),
        ("nested", "[[[[.a, .b], {c: .d[1:3]}], (.e // 1)], map(. + 1)?]"),
    ];

    for (name, source) in sources {
        group.bench_function(name, |b| b.iter(|| black_box(compile(black_box(source)).unwrap())));
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_simple_paths,
    bench_array_operations,
    bench_construction,
    bench_realistic_workload,
    bench_compile,
);
criterion_main!(benches);
