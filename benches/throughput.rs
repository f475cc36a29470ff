//! Throughput Benchmark for docbind
//!
//! This benchmark measures template binding, result decoding and command
//! round trips against the in-memory engine.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use docbind::decode::{decode, Record, Schema};
use docbind::engine::{DocumentEngine, MemoryEngine, Namespace};
use docbind::template::{bind, Template};
use docbind::{impl_decode_record, params, Client, Document};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

#[derive(Debug, Default)]
struct GeoNearResult {
    locations: Vec<Location>,
}

#[derive(Debug, Default)]
struct Location {
    dis: f64,
    name: String,
}

impl Record for GeoNearResult {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<GeoNearResult>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("GeoNearResult")
                .aliased("locations", "results", |r: &mut GeoNearResult, v: Vec<Location>| {
                    r.locations = v
                })
                .build()
        })
    }
}

impl Record for Location {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Location>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Location")
                .field("dis", |l: &mut Location, v: f64| l.dis = v)
                .aliased("name", "obj.name", |l: &mut Location, v: String| l.name = v)
                .build()
        })
    }
}

impl_decode_record!(GeoNearResult, Location);

/// A seeded engine with a `2d` index on `cities.loc`
fn seeded_engine(count: usize) -> Arc<MemoryEngine> {
    let engine = Arc::new(MemoryEngine::new());
    let ns = Namespace::new("bench", "cities");
    engine
        .ensure_index(&ns, &Document::new().with("loc", "2d"))
        .unwrap();

    for i in 0..count {
        let doc = bind(
            "{ name: #, loc: { lat: #, lng: # } }",
            &params![format!("city:{}", i), 48.0 + (i % 100) as f64 / 100.0, 9.0 + (i / 100) as f64 / 100.0],
        )
        .unwrap();
        engine.insert(&ns, &doc).unwrap();
    }
    engine
}

/// Benchmark template binding
fn bench_bind(c: &mut Criterion) {
    let mut group = c.benchmark_group("bind");
    group.throughput(Throughput::Elements(1));

    group.bench_function("bind_small", |b| {
        b.iter(|| black_box(bind("{ count: # }", &params!["friends"]).unwrap()));
    });

    group.bench_function("bind_geo_near", |b| {
        let params = params!["friends", 48.690, 9.140];
        b.iter(|| {
            black_box(
                bind(
                    "{ geoNear: #, near: [#, #], spherical: true, num: 10 }",
                    &params,
                )
                .unwrap(),
            )
        });
    });

    group.bench_function("bind_prepared", |b| {
        let template = Template::new("{ geoNear: #, near: [#, #], spherical: true, num: 10 }");
        let params = params!["friends", 48.690, 9.140];
        b.iter(|| black_box(template.bind(&params).unwrap()));
    });

    group.bench_function("bind_large_string", |b| {
        let params = params!["x\"y".repeat(1024)];
        b.iter(|| black_box(bind("{ note: # }", &params).unwrap()));
    });

    group.finish();
}

/// Benchmark result decoding
fn bench_decode(c: &mut Criterion) {
    let engine = seeded_engine(1_000);
    let response = engine
        .execute_command(
            "bench",
            &bind("{ geoNear: 'cities', near: [48.5, 9.05], num: 100 }", &[]).unwrap(),
        )
        .unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("decode_geo_near_100", |b| {
        b.iter(|| {
            let result: GeoNearResult = decode(&response).unwrap();
            black_box(result.locations.len())
        });
    });

    group.bench_function("decode_raw_document", |b| {
        b.iter(|| black_box(decode::<Document>(&response).unwrap()));
    });

    group.finish();
}

/// Benchmark command round trips
fn bench_commands(c: &mut Criterion) {
    let engine = seeded_engine(10_000);
    let client = Client::new(engine, "bench");

    let mut group = c.benchmark_group("commands");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ping", |b| {
        b.iter(|| black_box(client.run_command("{ ping: 1 }", &[]).unwrap()));
    });

    group.bench_function("count_with_query", |b| {
        b.iter(|| {
            black_box(
                client
                    .run_command("{ count: #, query: { name: # } }", &params!["cities", "city:42"])
                    .unwrap(),
            )
        });
    });

    group.bench_function("geo_near_spherical", |b| {
        b.iter(|| {
            let result = client
                .run_command(
                    "{ geoNear: #, near: [#, #], spherical: true, num: 10 }",
                    &params!["cities", 48.5, 9.5],
                )
                .unwrap()
                .throw_on_error()
                .unwrap();
            black_box(result.as_type::<GeoNearResult>().unwrap())
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_insert_count", |b| {
        b.iter(|| {
            let client = Client::new(Arc::new(MemoryEngine::new()), "bench");
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let collection = client.collection(&format!("c{}", t));
                    thread::spawn(move || {
                        for i in 0..1_000 {
                            collection.insert("{ t: #, i: # }", &params![t, i]).unwrap();
                        }
                        collection.count().unwrap()
                    })
                })
                .collect();

            for handle in handles {
                black_box(handle.join().unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_bind,
    bench_decode,
    bench_commands,
    bench_concurrent,
);

criterion_main!(benches);
