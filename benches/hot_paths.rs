//! Per-frame and per-keystroke hot paths.
//!
//! Run with: cargo bench --bench hot_paths

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use quartier_map::district::{District, Scalar};
use quartier_map::format::PriceFormatter;
use quartier_map::map::{Basemap, TerminalMap};
use quartier_map::overlay::{filter_indices, MarkerSet};

const COMMUNES: [&str; 6] = ["Cocody", "Plateau", "Yopougon", "Marcory", "Treichville", "Abobo"];

fn districts(n: usize) -> Vec<District> {
    (0..n)
        .map(|i| {
            let commune = COMMUNES[i % COMMUNES.len()];
            District::new(i.to_string(), format!("{commune} {i}"))
                .with_commune(commune)
                .with_position(5.2 + (i % 100) as f64 * 0.003, -4.2 + (i / 100) as f64 * 0.003)
        })
        .collect()
}

fn bench_format(c: &mut Criterion) {
    let fmt = PriceFormatter::default();
    let values = [
        Scalar::from(250_000.0),
        Scalar::from("1 250 000"),
        Scalar::from("-"),
        Scalar::from(f64::NAN),
    ];
    c.bench_function("format/mixed", |b| {
        b.iter(|| {
            for v in &values {
                black_box(fmt.format(Some(v)));
            }
        })
    });
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("search/filter");
    for n in [100, 1_000, 10_000] {
        let list = districts(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &list, |b, list| {
            b.iter(|| black_box(filter_indices("cocody", list, 8)))
        });
    }
    group.finish();
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("markers/rebuild");
    for n in [100, 1_000] {
        let list = districts(n);
        let mut map = TerminalMap::with_basemap(Basemap::empty(), 120, 40);
        let mut markers = MarkerSet::new();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &list, |b, list| {
            b.iter(|| black_box(markers.rebuild(&mut map, list)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_format, bench_filter, bench_rebuild);
criterion_main!(benches);
