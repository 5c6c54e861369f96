//! Property-based tests for the Push interpreter.
//!
//! Run with: cargo test --release prop_interpreter

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use pushgp::gp::{Erc, Gene, GeneSpawner, Genome, from_json};
use pushgp::push::instructions;
use pushgp::{Atom, CodeBlock, PushConfig, PushInterpreter, RunStatus, StackKind, State, Value};

fn spawner() -> GeneSpawner {
    GeneSpawner::for_stacks(0, &StackKind::ALL).unwrap()
}

fn random_value(kind: StackKind, spawner: &GeneSpawner, rng: &mut SmallRng) -> Value {
    let int = Erc::Int { min: -5, max: 5 };
    match kind {
        StackKind::Bool => Erc::Bool.sample(rng),
        StackKind::Int => int.sample(rng),
        StackKind::Float => Erc::Float { min: -5.0, max: 5.0 }.sample(rng),
        StackKind::Char => Erc::Char.sample(rng),
        StackKind::Str => Erc::Str { min_len: 0, max_len: 4 }.sample(rng),
        StackKind::Exec | StackKind::Code => Value::code(spawner.random_atom(rng)),
        StackKind::VectorBool => Value::VectorBool((0..rng.gen_range(0..4)).map(|_| rng.r#gen()).collect()),
        StackKind::VectorInt => Value::VectorInt((0..rng.gen_range(0..4)).map(|_| rng.gen_range(-5..=5)).collect()),
        StackKind::VectorFloat => {
            Value::VectorFloat((0..rng.gen_range(0..4)).map(|_| rng.gen_range(-5.0..5.0)).collect())
        }
        StackKind::VectorStr => Value::VectorStr(
            (0..rng.gen_range(0..4))
                .map(|_| Erc::Str { min_len: 0, max_len: 3 }.sample(rng).as_str().unwrap_or_default().to_string())
                .collect(),
        ),
    }
}

/// A state with a few random items on every stack.
fn random_state(seed: u64) -> State {
    let mut rng = SmallRng::seed_from_u64(seed);
    let spawner = spawner();
    let mut state = State::new(PushConfig::default());
    state.load_inputs(vec![Value::Int(rng.gen_range(-5..=5))]);
    for kind in StackKind::ALL {
        for _ in 0..rng.gen_range(0..4) {
            let value = random_value(kind, &spawner, &mut rng);
            assert!(state.stack_mut(kind).push(value));
        }
    }
    state
}

fn random_program(seed: u64, len: usize) -> CodeBlock {
    let mut rng = SmallRng::seed_from_u64(seed);
    spawner().random_genome(len, &mut rng).translate(usize::MAX)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// An instruction that reports no change leaves the state untouched.
    #[test]
    fn prop_failed_instruction_is_noop(seed in any::<u64>()) {
        let state = random_state(seed);
        for instruction in instructions::all() {
            let mut after = state.clone();
            if !instruction.execute(&mut after) {
                prop_assert_eq!(&after, &state, "{} reported no-op but changed the state", instruction.name());
            }
        }
    }

    /// Runs never exceed the step limit, and only a size-limit stop may
    /// leave the state at or above the size limit.
    #[test]
    fn prop_run_respects_limits(
        seed in any::<u64>(),
        len in 0usize..200,
        step_limit in 1usize..300,
        state_size_limit in 10usize..500
    ) {
        let program = random_program(seed, len);
        let config = PushConfig {
            step_limit,
            state_size_limit,
            ..PushConfig::default()
        };
        let mut interpreter = PushInterpreter::new(config);
        let status = interpreter.execute(&program, &[Value::Int(3)]);

        prop_assert!(interpreter.steps() <= step_limit);
        prop_assert!(
            status == RunStatus::StateSizeLimitExceeded
                || interpreter.state().size() < state_size_limit
        );
        if status == RunStatus::Normal {
            prop_assert!(interpreter.state().stack(StackKind::Exec).is_empty());
        }
    }

    /// Running the same program twice gives the same state.
    #[test]
    fn prop_run_is_deterministic(seed in any::<u64>(), len in 0usize..100) {
        let program = random_program(seed, len);
        let mut a = PushInterpreter::new(PushConfig::default());
        let mut b = PushInterpreter::new(PushConfig::default());
        a.execute(&program, &[Value::Int(7)]);
        b.execute(&program, &[Value::Int(7)]);
        prop_assert_eq!(a.status(), b.status());
        prop_assert_eq!(a.state(), b.state());
    }

    /// Code survives a JSON round trip.
    #[test]
    fn prop_code_json_roundtrip(seed in any::<u64>(), len in 0usize..60) {
        let program = random_program(seed, len);
        let json = serde_json::to_string(&program).unwrap();
        let back: CodeBlock = from_json(&json).unwrap();
        prop_assert_eq!(back, program);
    }
}

/// A genome whose translation nests `depth` blocks inside each other.
fn nested_genome(depth: usize, filler: &str) -> Genome {
    let opener = Gene::new(Atom::instruction(filler).unwrap());
    let mut genes = vec![opener; depth];
    genes.push(Gene::new(Atom::Literal(Value::Int(i64::try_from(depth).unwrap()))));
    Genome::new(genes)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Nesting deeper than the default JSON recursion limit still round trips.
    #[test]
    fn prop_deep_code_json_roundtrip(
        depth in 130usize..250,
        filler in prop::sample::select(vec!["exec_dup", "exec_if", "exec_do*times"])
    ) {
        let program = nested_genome(depth, filler).translate(usize::MAX);
        prop_assert!(program.points() > depth);
        let json = serde_json::to_string(&program).unwrap();
        prop_assert!(serde_json::from_str::<CodeBlock>(&json).is_err());
        let back: CodeBlock = from_json(&json).unwrap();
        prop_assert_eq!(back, program);
    }
}
