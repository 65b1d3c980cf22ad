use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use fragment_assembler::{assemble, AssemblyConfig, OverlapIndex};

/// Spectrum of a random DNA string with `missing` fragments dropped at random.
fn generate_instance(length: usize, k: usize, missing: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let bases = ['A', 'C', 'G', 'T'];
    let original: String = (0..length).map(|_| bases[rng.gen_range(0..4)]).collect();

    let mut fragments: Vec<String> = (0..=length - k)
        .map(|i| original[i..i + k].to_string())
        .collect();
    for _ in 0..missing.min(fragments.len().saturating_sub(1)) {
        let victim = rng.gen_range(0..fragments.len());
        fragments.swap_remove(victim);
    }
    fragments.shuffle(&mut rng);
    fragments
}

fn bench_index_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_construction");

    for length in [200, 500, 1000] {
        let fragments = generate_instance(length, 10, 0, 42);
        group.bench_with_input(
            BenchmarkId::new("symmetric", length),
            &fragments,
            |b, fragments| {
                b.iter(|| OverlapIndex::symmetric(black_box(fragments), 1, false));
            },
        );
        #[cfg(feature = "parallel")]
        group.bench_with_input(
            BenchmarkId::new("symmetric_threaded", length),
            &fragments,
            |b, fragments| {
                b.iter(|| OverlapIndex::symmetric(black_box(fragments), 1, true));
            },
        );
    }

    group.finish();
}

fn bench_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly");
    group.measurement_time(Duration::from_secs(10));

    for (length, missing) in [(200, 0), (200, 20), (500, 50), (1000, 100)] {
        let fragments = generate_instance(length, 10, missing, 7);
        let config = AssemblyConfig {
            target_length: length,
            max_offset: 5,
            ..Default::default()
        };
        group.bench_with_input(
            BenchmarkId::new(format!("missing_{missing}"), length),
            &fragments,
            |b, fragments| {
                b.iter(|| assemble(black_box(fragments), config));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_index_construction, bench_assembly);
criterion_main!(benches);
