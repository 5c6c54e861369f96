//! Individuals and the population container.

use std::cmp::Ordering;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::warn;

use crate::gp::evaluation::Evaluator;
use crate::gp::genome::Genome;
use crate::push::{Program, ProgramSignature};

/// A genome, its translated program and, once evaluated, its errors.
#[derive(Debug, Clone)]
pub struct Individual {
    genome: Genome,
    program: Program,
    error_vector: Option<Vec<f64>>,
    total_error: f64,
}

impl Individual {
    /// Translate `genome` under `signature`. The result is unevaluated.
    #[must_use]
    pub fn new(genome: Genome, signature: &ProgramSignature) -> Self {
        let code = genome.translate(signature.push_config.max_code_points);
        Self {
            genome,
            program: Program::new(signature.clone(), code),
            error_vector: None,
            total_error: f64::INFINITY,
        }
    }

    /// Same individual with its error vector set.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<f64>) -> Self {
        self.set_errors(errors);
        self
    }

    fn set_errors(&mut self, errors: Vec<f64>) {
        self.total_error = total_error(&errors);
        self.error_vector = Some(errors);
    }

    /// The genome.
    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    /// The translated program.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Per-case errors, if evaluated.
    #[must_use]
    pub fn error_vector(&self) -> Option<&[f64]> {
        self.error_vector.as_deref()
    }

    /// Sum of the error vector; infinite while unevaluated.
    #[must_use]
    pub fn total_error(&self) -> f64 {
        self.total_error
    }

    /// Whether the error vector is set.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.error_vector.is_some()
    }

    /// Evaluate in place, containing evaluator panics.
    pub(crate) fn evaluate(&mut self, evaluator: &dyn Evaluator) {
        let errors = score(&self.program, evaluator);
        self.set_errors(errors);
    }
}

/// Sum of errors. Overflow saturates to infinity and NaN becomes infinity.
#[must_use]
pub fn total_error(errors: &[f64]) -> f64 {
    let sum: f64 = errors.iter().sum();
    if sum.is_nan() { f64::INFINITY } else { sum }
}

/// Order by total error, then lexicographically by error vector.
#[must_use]
pub fn fitness_cmp(a: &Individual, b: &Individual) -> Ordering {
    a.total_error.total_cmp(&b.total_error).then_with(|| {
        let (ea, eb) = (a.error_vector().unwrap_or(&[]), b.error_vector().unwrap_or(&[]));
        ea.iter()
            .zip(eb)
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| ea.len().cmp(&eb.len()))
    })
}

fn score(program: &Program, evaluator: &dyn Evaluator) -> Vec<f64> {
    match catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(program))) {
        Ok(errors) => errors,
        Err(_) => {
            warn!(code = %program.code, "evaluator panicked; scoring with penalty");
            vec![f64::INFINITY; evaluator.error_vector_len()]
        }
    }
}

/// Evaluated individuals, kept best-first, plus a queue awaiting evaluation.
#[derive(Debug, Clone, Default)]
pub struct Population {
    evaluated: Vec<Individual>,
    unevaluated: Vec<Individual>,
}

impl Population {
    /// Empty population.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an individual. Evaluated ones go to their sorted position.
    pub fn add(&mut self, individual: Individual) {
        if individual.is_evaluated() {
            let at = self
                .evaluated
                .partition_point(|i| fitness_cmp(i, &individual).is_le());
            self.evaluated.insert(at, individual);
        } else {
            self.unevaluated.push(individual);
        }
    }

    /// Evaluated individuals, best first.
    #[must_use]
    pub fn evaluated(&self) -> &[Individual] {
        &self.evaluated
    }

    /// Individuals awaiting evaluation.
    #[must_use]
    pub fn unevaluated(&self) -> &[Individual] {
        &self.unevaluated
    }

    /// Best evaluated individual.
    #[must_use]
    pub fn best(&self) -> Option<&Individual> {
        self.evaluated.first()
    }

    /// Total number of individuals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.evaluated.len() + self.unevaluated.len()
    }

    /// Whether the population holds no individuals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into the evaluated individuals, best first.
    #[must_use]
    pub fn into_evaluated(self) -> Vec<Individual> {
        self.evaluated
    }

    /// Evaluate every queued individual.
    ///
    /// Runs on `pool` when given, serially otherwise. The evaluated order
    /// only depends on the queue order, not on scheduling. Returns `false`
    /// and leaves the queue untouched if `cancel` was raised during the
    /// batch.
    pub fn evaluate(
        &mut self,
        evaluator: &dyn Evaluator,
        pool: Option<&ThreadPool>,
        cancel: Option<&AtomicBool>,
    ) -> bool {
        let cancelled = || cancel.is_some_and(|c| c.load(AtomicOrdering::Relaxed));
        let task = |individual: &Individual| {
            if cancelled() {
                None
            } else {
                Some(score(&individual.program, evaluator))
            }
        };

        let batch = std::mem::take(&mut self.unevaluated);
        let results: Vec<Option<Vec<f64>>> = match pool {
            Some(pool) => pool.install(|| batch.par_iter().map(task).collect()),
            None => batch.iter().map(task).collect(),
        };

        if cancelled() || results.iter().any(Option::is_none) {
            self.unevaluated = batch;
            return false;
        }

        self.evaluated.reserve(batch.len());
        for (mut individual, errors) in batch.into_iter().zip(results.into_iter().flatten()) {
            individual.set_errors(errors);
            self.evaluated.push(individual);
        }
        self.evaluated.sort_by(fitness_cmp);
        true
    }
}

impl FromIterator<Individual> for Population {
    fn from_iter<I: IntoIterator<Item = Individual>>(iter: I) -> Self {
        let mut population = Self::new();
        for individual in iter {
            population.add(individual);
        }
        population
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::evaluation::FunctionEvaluator;
    use crate::gp::genome::Gene;
    use crate::push::{Atom, OutputSpec, StackKind, Value};

    fn signature() -> ProgramSignature {
        ProgramSignature::new(0, vec![OutputSpec::Stack(StackKind::Int)])
    }

    fn literal_genome(values: &[i64]) -> Genome {
        values
            .iter()
            .map(|v| Gene::new(Atom::Literal(Value::Int(*v))))
            .collect()
    }

    /// Errors are the distance of the top int from 10.
    fn evaluator() -> FunctionEvaluator {
        FunctionEvaluator::new(1, |program| {
            let out = program.apply(&[]);
            match out.first().and_then(Option::as_ref).and_then(Value::as_int) {
                Some(v) => vec![(10 - v).abs() as f64],
                None => vec![f64::INFINITY],
            }
        })
    }

    #[test]
    fn test_total_error_law() {
        assert_eq!(total_error(&[1.0, 2.5]), 3.5);
        assert_eq!(total_error(&[f64::MAX, f64::MAX]), f64::INFINITY);
        assert_eq!(total_error(&[f64::NAN]), f64::INFINITY);
        assert_eq!(total_error(&[]), 0.0);
    }

    #[test]
    fn test_fitness_cmp_breaks_ties_lexicographically() {
        let a = Individual::new(Genome::default(), &signature()).with_errors(vec![0.0, 2.0]);
        let b = Individual::new(Genome::default(), &signature()).with_errors(vec![1.0, 1.0]);
        assert_eq!(fitness_cmp(&a, &b), Ordering::Less);
        assert_eq!(fitness_cmp(&b, &b), Ordering::Equal);
    }

    #[test]
    fn test_add_keeps_evaluated_sorted() {
        let mut population = Population::new();
        for e in [3.0, 1.0, 2.0] {
            population.add(Individual::new(Genome::default(), &signature()).with_errors(vec![e]));
        }
        population.add(Individual::new(Genome::default(), &signature()));
        let totals: Vec<f64> = population.evaluated().iter().map(Individual::total_error).collect();
        assert_eq!(totals, vec![1.0, 2.0, 3.0]);
        assert_eq!(population.unevaluated().len(), 1);
        assert_eq!(population.len(), 4);
    }

    #[test]
    fn test_evaluate_serial_and_parallel_agree() {
        let genomes = [vec![1], vec![9], vec![4, 12], vec![], vec![10]];
        let build = || -> Population {
            genomes
                .iter()
                .map(|g| Individual::new(literal_genome(g), &signature()))
                .collect()
        };
        let evaluator = evaluator();

        let mut serial = build();
        assert!(serial.evaluate(&evaluator, None, None));

        let pool = rayon::ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let mut parallel = build();
        assert!(parallel.evaluate(&evaluator, Some(&pool), None));

        let totals = |p: &Population| -> Vec<f64> {
            p.evaluated().iter().map(Individual::total_error).collect()
        };
        assert_eq!(totals(&serial), vec![0.0, 1.0, 2.0, 9.0, f64::INFINITY]);
        assert_eq!(totals(&serial), totals(&parallel));
        assert!(serial.unevaluated().is_empty());
    }

    #[test]
    fn test_cancelled_batch_is_discarded() {
        let mut population: Population = (0..4)
            .map(|i| Individual::new(literal_genome(&[i]), &signature()))
            .collect();
        let cancel = AtomicBool::new(true);
        assert!(!population.evaluate(&evaluator(), None, Some(&cancel)));
        assert!(population.evaluated().is_empty());
        assert_eq!(population.unevaluated().len(), 4);
    }

    #[test]
    fn test_evaluator_panic_gives_penalty() {
        let evaluator = FunctionEvaluator::new(2, |_| panic!("boom"));
        let mut population: Population =
            std::iter::once(Individual::new(Genome::default(), &signature())).collect();
        assert!(population.evaluate(&evaluator, None, None));
        let best = population.best().unwrap();
        assert_eq!(best.error_vector(), Some(&[f64::INFINITY, f64::INFINITY][..]));
    }
}
