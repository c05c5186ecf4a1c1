// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use cat_engine::estimator::estimate;
use cat_engine::irt::{fisher_information, icc, total_information};
use cat_engine::selector::select_next;
use cat_engine::{Dimension, Item, ItemInput};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashSet;

fn uniform_pool(n: usize) -> Vec<(f64, f64, f64)> {
    (0..n)
        .map(|i| {
            let beta = -2.0 + (4.0 * i as f64) / (n.max(1) - 1).max(1) as f64;
            (2.0, beta, 0.0)
        })
        .collect()
}

fn bench_icc_and_information(c: &mut Criterion) {
    c.bench_function("icc", |b| {
        b.iter(|| icc(black_box(0.3), black_box(1.5), black_box(-0.2), black_box(0.1)));
    });

    c.bench_function("fisher_information", |b| {
        b.iter(|| {
            fisher_information(black_box(0.3), black_box(1.5), black_box(-0.2), black_box(0.1))
        });
    });
}

fn bench_total_information(c: &mut Criterion) {
    let mut group = c.benchmark_group("total_information");

    for size in [10, 50, 200].iter() {
        let items = uniform_pool(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| total_information(black_box(0.0), items.iter().copied()));
        });
    }

    group.finish();
}

fn bench_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate");

    for size in [5usize, 20, 50].iter() {
        let items = uniform_pool(*size);
        let responses: Vec<u8> = (0..*size).map(|i| (i % 2) as u8).collect();
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| estimate(black_box(&items), black_box(&responses)));
        });
    }

    group.finish();
}

fn bench_select_next(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_next");

    for size in [10usize, 50, 200].iter() {
        let pool: Vec<Item> = (0..*size)
            .map(|i| {
                Item::new(
                    format!("q{i}"),
                    Dimension::Security,
                    1.0 + (i as f64 % 5.0) * 0.1,
                    -2.0 + (4.0 * i as f64) / *size as f64,
                    0.0,
                    false,
                    ItemInput::simple("probe"),
                    vec![],
                )
            })
            .collect();
        let administered = HashSet::new();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            b.iter(|| select_next(black_box(0.0), pool, &administered, Dimension::Security));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_icc_and_information,
    bench_total_information,
    bench_estimate,
    bench_select_next
);
criterion_main!(benches);
