//! Built-in benchmark problems.

use clap::ValueEnum;
use pushgp::gp::{Case, DatasetEvaluator, GeneSpawner};
use pushgp::{ConfigError, OutputSpec, ProgramSignature, StackKind, Value};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Seed for generating fitness cases, fixed so every run sees the same data.
const CASE_SEED: u64 = 0x5eed;

/// Problems the `evolve` command can solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Problem {
    /// Sum of two integers.
    IntSum,
    /// Smallest of four integers.
    Smallest,
    /// Length of a string.
    StrLength,
}

/// A problem ready to search.
pub(crate) struct Setup {
    pub(crate) signature: ProgramSignature,
    pub(crate) evaluator: DatasetEvaluator,
    pub(crate) spawner: GeneSpawner,
}

impl Problem {
    /// Signature, fitness cases and gene alphabet.
    pub(crate) fn setup(self, cases: usize) -> Result<Setup, ConfigError> {
        let mut rng = SmallRng::seed_from_u64(CASE_SEED);
        let int = OutputSpec::Stack(StackKind::Int);
        let (arity, stacks, cases): (usize, &[StackKind], Vec<Case>) = match self {
            Problem::IntSum => (
                2,
                &[StackKind::Int, StackKind::Bool],
                (0..cases)
                    .map(|_| {
                        let (a, b) = (rng.gen_range(-100..=100), rng.gen_range(-100..=100));
                        Case::new(vec![Value::Int(a), Value::Int(b)], vec![Value::Int(a + b)])
                    })
                    .collect(),
            ),
            Problem::Smallest => (
                4,
                &[StackKind::Int, StackKind::Bool],
                (0..cases)
                    .map(|_| {
                        let xs: Vec<i64> = (0..4).map(|_| rng.gen_range(-100..=100)).collect();
                        let min = xs.iter().copied().min().unwrap_or_default();
                        Case::new(xs.into_iter().map(Value::Int).collect(), vec![Value::Int(min)])
                    })
                    .collect(),
            ),
            Problem::StrLength => (
                1,
                &[StackKind::Str, StackKind::Int, StackKind::Bool, StackKind::Char],
                (0..cases)
                    .map(|_| {
                        let len = rng.gen_range(0..=20);
                        let s: String = (0..len).map(|_| char::from(rng.gen_range(b'a'..=b'z'))).collect();
                        Case::new(vec![Value::Str(s)], vec![Value::Int(len)])
                    })
                    .collect(),
            ),
        };
        Ok(Setup {
            signature: ProgramSignature::new(arity, vec![int]),
            evaluator: DatasetEvaluator::new(cases).with_penalty(1_000_000.0),
            spawner: GeneSpawner::for_stacks(arity, stacks)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgp::gp::Evaluator;

    #[test]
    fn test_setups_are_reproducible() {
        for problem in [Problem::IntSum, Problem::Smallest, Problem::StrLength] {
            let a = problem.setup(20).unwrap();
            let b = problem.setup(20).unwrap();
            assert_eq!(a.evaluator.cases(), b.evaluator.cases());
            assert_eq!(a.evaluator.error_vector_len(), 20);
            assert!(a.evaluator.cases().iter().all(|c| c.inputs.len() == a.signature.input_arity));
        }
    }
}
