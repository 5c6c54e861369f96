//! Benchmarks for parent selection and variation.

#![allow(missing_docs)] // Benchmark macros generate undocumented functions
#![allow(clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pushgp::gp::{GeneSpawner, Individual, Population, SelectionMethod, VariationOperator};
use pushgp::{OutputSpec, ProgramSignature, StackKind};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Evaluated population with random integer-valued errors.
fn population(size: usize, cases: usize) -> Population {
    let signature = ProgramSignature::new(1, vec![OutputSpec::Stack(StackKind::Int)]);
    let spawner = GeneSpawner::for_stacks(1, &[StackKind::Int]).unwrap();
    let mut rng = SmallRng::seed_from_u64(3);
    (0..size)
        .map(|_| {
            let genome = spawner.random_genome(10, &mut rng);
            let errors = (0..cases).map(|_| f64::from(rng.gen_range(0u8..5))).collect();
            Individual::new(genome, &signature).with_errors(errors)
        })
        .collect()
}

fn bench_selection(c: &mut Criterion) {
    let pop = population(1000, 100);
    let mut group = c.benchmark_group("select_1000");
    for method in [
        SelectionMethod::default(),
        "epsilon-lexicase".parse().unwrap(),
        SelectionMethod::Tournament { size: 7 },
        SelectionMethod::FitnessProportionate,
    ] {
        let mut rng = SmallRng::seed_from_u64(4);
        group.bench_with_input(BenchmarkId::from_parameter(method.name()), &method, |b, m| {
            b.iter(|| black_box(m.select(&pop, 1000, &mut rng)));
        });
    }
    group.finish();
}

fn bench_variation(c: &mut Criterion) {
    let spawner = GeneSpawner::for_stacks(1, &StackKind::ALL).unwrap();
    let mut rng = SmallRng::seed_from_u64(5);
    let a = spawner.random_genome(200, &mut rng);
    let b = spawner.random_genome(200, &mut rng);
    let mut group = c.benchmark_group("produce_200_genes");
    for op in [
        VariationOperator::umad(),
        VariationOperator::alternation(),
        VariationOperator::uniform_mutation(),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(op.name()), &op, |bench, op| {
            bench.iter(|| black_box(op.produce(&[&a, &b], &spawner, 500, &mut rng)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_selection, bench_variation);
criterion_main!(benches);
