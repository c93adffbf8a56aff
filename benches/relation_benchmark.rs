use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hashbase::core::types::{attributes, Attributes, Value};
use hashbase::core::table::Model;
use hashbase::query::ast::Constraints;
use rand::Rng;
use std::thread;

/// Helper to create test rows
fn create_test_rows(count: usize) -> Vec<Attributes> {
    let mut rng = rand::thread_rng();
    let regions = ["Americas", "Europe", "Asia", "Africa", "Oceania"];

    (0..count)
        .map(|i| {
            attributes([
                ("id", Value::from(i as i64 + 1)),
                ("name", Value::from(format!("Country {}", i))),
                ("region", Value::from(regions[rng.gen_range(0..regions.len())])),
                ("population", Value::from(rng.gen_range(1_000i64..100_000_000))),
            ])
        })
        .collect()
}

fn loaded_model(count: usize) -> Model {
    let model = Model::new("Country");
    model.set_data(create_test_rows(count)).unwrap();
    model
}

/// Benchmark bulk loading
fn bench_set_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_data");

    for size in [100, 1_000, 10_000].iter() {
        let rows = create_test_rows(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            let model = Model::new("Country");
            b.iter(|| model.set_data(rows.clone()).unwrap());
        });
    }
    group.finish();
}

/// Benchmark indexed and scanning lookups
fn bench_lookup(c: &mut Criterion) {
    let model = loaded_model(10_000);
    let mut group = c.benchmark_group("lookup");

    group.bench_function("find_by_id", |b| {
        let mut rng = rand::thread_rng();
        b.iter(|| model.find_by_id(black_box(rng.gen_range(1i64..=10_000))));
    });

    group.bench_function("find_by_name", |b| {
        b.iter(|| model.find_by(Constraints::from([("name", black_box("Country 9000"))])).unwrap());
    });

    group.bench_function("dynamic_finder", |b| {
        let args = [Value::from("Europe")];
        b.iter(|| model.call(black_box("find_all_by_region"), &args).unwrap());
    });

    group.finish();
}

/// Benchmark relation evaluation
fn bench_relation(c: &mut Criterion) {
    let model = loaded_model(10_000);
    let mut group = c.benchmark_group("relation");

    group.bench_function("where_region", |b| {
        b.iter(|| model.filter(Constraints::from([("region", "Asia")])).len());
    });

    group.bench_function("where_not_region", |b| {
        b.iter(|| {
            model
                .filter_not(Constraints::from([("region", "Asia")]))
                .unwrap()
                .len()
        });
    });

    group.bench_function("open_id_range", |b| {
        b.iter(|| model.filter(Constraints::new().with("id", 5_000..)).len());
    });

    group.bench_function("order_population_desc", |b| {
        b.iter(|| model.order(["population DESC, name"]).unwrap().len());
    });

    group.finish();
}

/// Benchmark readers racing a reloading writer
fn bench_concurrent_reads(c: &mut Criterion) {
    let model = loaded_model(1_000);

    c.bench_function("concurrent_reads_during_reload", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let model = model.clone();
                    thread::spawn(move || model.filter(Constraints::from([("region", "Europe")])).len())
                })
                .collect();
            model.reload().unwrap();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_set_data,
    bench_lookup,
    bench_relation,
    bench_concurrent_reads
);
criterion_main!(benches);
