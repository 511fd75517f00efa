// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_data_source::{DataSource, DataSourceBuilder, IgnoreDiagnostics};

type Blob = Vec<Vec<u64>>;
type Source = DataSource<Blob, usize, usize, Option<u64>, Option<Vec<u64>>>;

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.0
    }

    fn gen_range_usize(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        ((self.next_u64() >> 32) as usize) % upper_exclusive
    }
}

fn source() -> Source {
    DataSourceBuilder::<Blob, _, _, _, _>::for_blob()
        .row_has_changed(|a, b| a != b)
        .section_header_has_changed(|_, _| false)
        .diagnostics(IgnoreDiagnostics)
        .build()
        .expect("comparator and extractor are configured")
}

fn build_blob(sections: usize, rows_per_section: usize, seed: u64) -> Blob {
    let mut rng = Lcg::new(seed);
    (0..sections)
        .map(|_| (0..rows_per_section).map(|_| rng.next_u64()).collect())
        .collect()
}

fn bench_clone(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_data_source");
    group.sample_size(50);

    for &(sections, rows_per_section) in &[(1_usize, 1_000_usize), (50, 200), (200, 50)] {
        let source = source();
        let blob = build_blob(sections, rows_per_section, 0xDA7A_0000_0000_0001);
        let base = source
            .snapshot_with_rows_and_sections(blob.clone(), None, None)
            .expect("header comparator is configured");

        group.bench_function(
            format!("clone_identical(s={sections},r={rows_per_section})"),
            |b| {
                b.iter_batched(
                    || blob.clone(),
                    |next| {
                        let snapshot = base
                            .clone_with_rows_and_sections(next, None, None)
                            .expect("header comparator is configured");
                        black_box(snapshot.dirty_row_count());
                    },
                    BatchSize::LargeInput,
                );
            },
        );

        group.bench_function(
            format!("clone_one_change(s={sections},r={rows_per_section})"),
            |b| {
                let mut rng = Lcg::new(0xDA7A_0000_0000_0002);
                b.iter_batched(
                    || {
                        let mut next = blob.clone();
                        let s = rng.gen_range_usize(sections);
                        let r = rng.gen_range_usize(rows_per_section);
                        next[s][r] = next[s][r].wrapping_add(1);
                        next
                    },
                    |next| {
                        let snapshot = base
                            .clone_with_rows_and_sections(next, None, None)
                            .expect("header comparator is configured");
                        black_box(snapshot.dirty_row_count());
                    },
                    BatchSize::LargeInput,
                );
            },
        );

        group.bench_function(
            format!("flat_index_lookup(s={sections},r={rows_per_section})"),
            |b| {
                let total = base.row_count();
                let mut rng = Lcg::new(0xDA7A_0000_0000_0003);
                b.iter(|| {
                    let flat = rng.gen_range_usize(total);
                    black_box(base.position_for_flat_index(black_box(flat)));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_clone);
criterion_main!(benches);
