#![no_main]

//! Interpreter fuzzer.
//!
//! Builds a genome from arbitrary catalog indices and literals, translates
//! it and runs it under tight limits. Checks that every run halts within
//! the step limit and that the state stays under the size limit unless the
//! run stopped on it.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pushgp::gp::{Gene, Genome};
use pushgp::push::instructions;
use pushgp::{Atom, PushConfig, PushInterpreter, RunStatus, Value};

/// One fuzzer-chosen gene.
#[derive(Arbitrary, Debug)]
enum FuzzAtom {
    /// Catalog instruction, by index modulo the catalog size.
    Instruction(u16),
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    Input(u8),
}

#[derive(Arbitrary, Debug)]
struct FuzzGene {
    atom: FuzzAtom,
    close: u8,
    silent: bool,
}

#[derive(Arbitrary, Debug)]
struct InterpreterInput {
    genes: Vec<FuzzGene>,
    inputs: Vec<i64>,
    step_limit: u16,
    state_size_limit: u16,
}

fuzz_target!(|input: InterpreterInput| {
    let catalog = instructions::all();
    let genome: Genome = input
        .genes
        .into_iter()
        .take(300)
        .map(|g| {
            let atom = match g.atom {
                FuzzAtom::Instruction(i) => Atom::Instruction(catalog[usize::from(i) % catalog.len()]),
                FuzzAtom::Int(v) => Atom::Literal(Value::Int(v)),
                FuzzAtom::Float(v) if v.is_nan() => Atom::Literal(Value::Float(0.0)),
                FuzzAtom::Float(v) => Atom::Literal(Value::Float(v)),
                FuzzAtom::Bool(v) => Atom::Literal(Value::Bool(v)),
                FuzzAtom::Char(v) => Atom::Literal(Value::Char(v)),
                FuzzAtom::Str(v) => Atom::Literal(Value::Str(v)),
                FuzzAtom::Input(i) => Atom::Input(usize::from(i % 4)),
            };
            Gene {
                atom,
                close: g.close % 4,
                silent: g.silent,
            }
        })
        .collect();

    let config = PushConfig {
        step_limit: usize::from(input.step_limit % 2000) + 1,
        state_size_limit: usize::from(input.state_size_limit % 5000) + 10,
        ..PushConfig::default()
    };
    let program = genome.translate(config.max_code_points);
    let inputs: Vec<Value> = input.inputs.into_iter().take(4).map(Value::Int).collect();

    let mut interpreter = PushInterpreter::new(config);
    let status = interpreter.execute(&program, &inputs);

    assert!(interpreter.steps() <= config.step_limit);
    assert!(
        status == RunStatus::StateSizeLimitExceeded
            || interpreter.state().size() < config.state_size_limit,
        "state grew to {} under {:?}",
        interpreter.state().size(),
        status
    );
});
