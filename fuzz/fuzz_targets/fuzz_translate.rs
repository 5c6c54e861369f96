#![no_main]

//! Genome translation fuzzer.
//!
//! Arbitrary gene sequences must always translate to a balanced block
//! within the point limit, and the block must survive a JSON round trip.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pushgp::gp::{Gene, Genome, from_json};
use pushgp::push::instructions;
use pushgp::{Atom, CodeBlock, Value};

#[derive(Arbitrary, Debug)]
struct TranslateInput {
    /// (catalog index or literal, close count, silent) per gene.
    genes: Vec<(Option<u16>, i32, u8, bool)>,
    max_points: u16,
}

fuzz_target!(|input: TranslateInput| {
    let catalog = instructions::all();
    let genome: Genome = input
        .genes
        .into_iter()
        .take(1000)
        .map(|(instruction, literal, close, silent)| {
            let atom = match instruction {
                Some(i) => Atom::Instruction(catalog[usize::from(i) % catalog.len()]),
                None => Atom::Literal(Value::Int(i64::from(literal))),
            };
            Gene { atom, close, silent }
        })
        .collect();

    let max_points = usize::from(input.max_points).max(1);
    let code = genome.translate(max_points);
    assert!(code.points() <= max_points || code.is_empty());

    let json = serde_json::to_string(&code).expect("code serializes");
    let back: CodeBlock = from_json(&json).expect("code deserializes");
    assert_eq!(back, code);
});
