//! Benchmarks for the Push interpreter.

#![allow(missing_docs)] // Benchmark macros generate undocumented functions
#![allow(clippy::unwrap_used)] // Fixtures are built from catalog names

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use pushgp::gp::GeneSpawner;
use pushgp::push::instructions;
use pushgp::{Atom, CodeBlock, PushConfig, PushInterpreter, StackKind, Value};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn bench_arithmetic_loop(c: &mut Criterion) {
    // 0 999 exec_do*range (int_add): sums the counters
    let program = CodeBlock::new(vec![
        Atom::Literal(Value::Int(0)),
        Atom::Literal(Value::Int(0)),
        Atom::Literal(Value::Int(999)),
        Atom::instruction("exec_do*range").unwrap(),
        Atom::Block(CodeBlock::new(vec![Atom::instruction("int_add").unwrap()])),
    ]);
    let mut interpreter = PushInterpreter::new(PushConfig {
        step_limit: 10_000,
        ..PushConfig::default()
    });

    c.bench_function("do_range_1000", |b| {
        b.iter(|| black_box(interpreter.execute(&program, &[])));
    });
}

fn bench_random_programs(c: &mut Criterion) {
    let spawner = GeneSpawner::for_stacks(1, &StackKind::ALL).unwrap();
    let mut rng = SmallRng::seed_from_u64(1);
    let programs: Vec<CodeBlock> = (0..100)
        .map(|_| spawner.random_genome(100, &mut rng).translate(500))
        .collect();
    let mut interpreter = PushInterpreter::new(PushConfig::default());

    c.bench_function("random_programs_100", |b| {
        b.iter(|| {
            for program in &programs {
                let _ = black_box(interpreter.execute(program, &[Value::Int(7)]));
            }
        });
    });
}

fn bench_translate(c: &mut Criterion) {
    let spawner = GeneSpawner::for_stacks(1, &StackKind::ALL).unwrap();
    let mut rng = SmallRng::seed_from_u64(2);
    let genome = spawner.random_genome(500, &mut rng);

    c.bench_function("translate_500_genes", |b| {
        b.iter(|| black_box(genome.translate(usize::MAX)));
    });
}

fn bench_catalog_lookup(c: &mut Criterion) {
    let names: Vec<&str> = instructions::all().iter().map(|i| i.name()).collect();

    c.bench_function("lookup_catalog", |b| {
        b.iter(|| {
            for name in &names {
                let _ = black_box(instructions::lookup(name));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_arithmetic_loop,
    bench_random_programs,
    bench_translate,
    bench_catalog_lookup
);
criterion_main!(benches);
