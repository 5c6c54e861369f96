//! Post-search genome simplification.
//!
//! Random subsets of active genes are silenced; a silencing is kept only if
//! the error vector is bit-for-bit unchanged.

use rand::Rng;
use rand::seq::index;
use tracing::debug;

use crate::gp::evaluation::Evaluator;
use crate::gp::genome::Genome;
use crate::gp::individual::Individual;
use crate::push::ProgramSignature;

/// Shrinks genomes while preserving their behaviour on an evaluator.
pub struct GenomeSimplifier<'a> {
    evaluator: &'a dyn Evaluator,
    signature: &'a ProgramSignature,
}

impl std::fmt::Debug for GenomeSimplifier<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenomeSimplifier")
            .field("signature", self.signature)
            .finish_non_exhaustive()
    }
}

impl<'a> GenomeSimplifier<'a> {
    /// Simplify against `evaluator` under `signature`.
    #[must_use]
    pub fn new(evaluator: &'a dyn Evaluator, signature: &'a ProgramSignature) -> Self {
        Self {
            evaluator,
            signature,
        }
    }

    /// Try `steps` random silencings of 1 to 3 genes.
    ///
    /// `errors` is the error vector of `genome`. The returned genome has no
    /// silent genes and re-evaluates to exactly `errors`.
    pub fn simplify<R: Rng>(&self, genome: &Genome, errors: &[f64], steps: usize, rng: &mut R) -> Genome {
        let mut current = genome.without_silent();
        if !self.matches(&current, errors) {
            debug!("simplifier baseline differs from supplied errors; keeping genome");
            return genome.clone();
        }
        let start = current.len();

        for step in 0..steps {
            let active: Vec<usize> = current
                .genes()
                .iter()
                .enumerate()
                .filter(|(_, g)| !g.silent)
                .map(|(i, _)| i)
                .collect();
            if active.is_empty() {
                break;
            }
            let count = rng.gen_range(1..=3).min(active.len());
            let picks = index::sample(rng, active.len(), count);

            let mut candidate = current.clone();
            for pick in picks {
                candidate.genes_mut()[active[pick]].silent = true;
            }
            if self.matches(&candidate, errors) {
                current = candidate;
                debug!(step, active = current.active_len(), "simplification accepted");
            }
        }

        let simplified = current.without_silent();
        debug!(from = start, to = simplified.len(), "simplification finished");
        simplified
    }

    fn matches(&self, genome: &Genome, errors: &[f64]) -> bool {
        let mut individual = Individual::new(genome.clone(), self.signature);
        individual.evaluate(self.evaluator);
        individual.error_vector().is_some_and(|e| {
            e.len() == errors.len() && e.iter().zip(errors).all(|(a, b)| a.to_bits() == b.to_bits())
        })
    }
}
