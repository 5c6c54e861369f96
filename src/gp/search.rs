//! Search drivers: the generational genetic algorithm and simulated
//! annealing.
//!
//! Both drivers draw every random decision from one `SmallRng` seeded from
//! the configuration, so a run is reproducible from its seed regardless of
//! the evaluation thread count.

// Statistics use intentional casts
#![allow(clippy::cast_precision_loss)]

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, SearchError};
use crate::gp::evaluation::Evaluator;
use crate::gp::genome::Genome;
use crate::gp::individual::{Individual, Population, fitness_cmp};
use crate::gp::persistence::{Checkpoint, ScoredGenome, checkpoint_path, save_checkpoint};
use crate::gp::selection::SelectionMethod;
use crate::gp::simplification::GenomeSimplifier;
use crate::gp::spawn::GeneSpawner;
use crate::gp::variation::VariationOperator;
use crate::push::ProgramSignature;

/// Where and how often checkpoints are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Output directory, created on first write.
    pub directory: PathBuf,
    /// Write at the start of every `interval`-th generation.
    pub interval: usize,
}

/// Everything a search needs.
#[derive(Clone)]
pub struct SearchConfiguration {
    /// Calling convention of evolved programs.
    pub signature: ProgramSignature,
    /// Scores programs.
    pub evaluator: Arc<dyn Evaluator>,
    /// Source of random genes.
    pub spawner: GeneSpawner,
    /// Parent selection.
    pub selection: SelectionMethod,
    /// Operators with their relative weights.
    pub variation: Vec<(VariationOperator, f64)>,
    /// Individuals per generation.
    pub population_size: usize,
    /// Hard upper bound on generations.
    pub max_generations: usize,
    /// Stop once the best total error is at most this.
    pub error_threshold: f64,
    /// Inclusive length range of initial genomes.
    pub initial_genome_size: (usize, usize),
    /// Children are clipped to this many genes.
    pub max_genome_length: usize,
    /// Simplification attempts on the final best.
    pub simplification_steps: usize,
    /// Evaluation threads; 0 or 1 evaluates serially.
    pub parallelism: usize,
    /// Master seed.
    pub seed: u64,
    /// Periodic checkpoints.
    pub checkpoint: Option<CheckpointConfig>,
    /// Raised to stop the search at the next evaluation boundary.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SearchConfiguration {
    /// Configuration with default tuning: lexicase selection, UMAD,
    /// population 500, 100 generations.
    #[must_use]
    pub fn new(signature: ProgramSignature, evaluator: Arc<dyn Evaluator>, spawner: GeneSpawner) -> Self {
        Self {
            signature,
            evaluator,
            spawner,
            selection: SelectionMethod::default(),
            variation: vec![(VariationOperator::umad(), 1.0)],
            population_size: 500,
            max_generations: 100,
            error_threshold: 0.0,
            initial_genome_size: (20, 100),
            max_genome_length: 500,
            simplification_steps: 2000,
            parallelism: 0,
            seed: 0,
            checkpoint: None,
            cancel: None,
        }
    }

    /// Check every option.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.max_generations == 0 {
            return Err(ConfigError::NoGenerations);
        }
        let (min, max) = self.initial_genome_size;
        if min > max {
            return Err(ConfigError::InvalidSizeRange { min, max });
        }
        if self.error_threshold.is_nan() {
            return Err(ConfigError::InvalidParameter {
                name: "error_threshold",
                value: self.error_threshold,
            });
        }
        if let Some(checkpoint) = &self.checkpoint
            && checkpoint.interval == 0
        {
            return Err(ConfigError::InvalidParameter {
                name: "checkpoint_interval",
                value: 0.0,
            });
        }
        self.selection.validate()?;
        for (op, weight) in &self.variation {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    operator: op.name().to_string(),
                    weight: *weight,
                });
            }
            op.validate()?;
        }
        self.operator_index().map(|_| ())
    }

    fn operator_index(&self) -> Result<WeightedIndex<f64>, ConfigError> {
        WeightedIndex::new(self.variation.iter().map(|(_, w)| *w)).map_err(|_| ConfigError::NoVariation)
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed))
    }

    fn random_genome(&self, rng: &mut SmallRng) -> Genome {
        let (min, max) = self.initial_genome_size;
        let len = rng.gen_range(min..=max);
        self.spawner.random_genome(len, rng)
    }

    fn simplify(&self, best: Individual, rng: &mut SmallRng) -> Individual {
        let Some(errors) = best.error_vector().map(<[f64]>::to_vec) else {
            return best;
        };
        if self.simplification_steps == 0 {
            return best;
        }
        let simplifier = GenomeSimplifier::new(self.evaluator.as_ref(), &self.signature);
        let genome = simplifier.simplify(best.genome(), &errors, self.simplification_steps, rng);
        info!(
            from = best.genome().len(),
            to = genome.len(),
            "simplified best genome"
        );
        Individual::new(genome, &self.signature).with_errors(errors)
    }
}

impl fmt::Debug for SearchConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfiguration")
            .field("signature", &self.signature)
            .field("selection", &self.selection)
            .field("variation", &self.variation)
            .field("population_size", &self.population_size)
            .field("max_generations", &self.max_generations)
            .field("error_threshold", &self.error_threshold)
            .field("initial_genome_size", &self.initial_genome_size)
            .field("max_genome_length", &self.max_genome_length)
            .field("simplification_steps", &self.simplification_steps)
            .field("parallelism", &self.parallelism)
            .field("seed", &self.seed)
            .field("checkpoint", &self.checkpoint)
            .finish_non_exhaustive()
    }
}

/// Statistics for a single generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationStats {
    /// Generation number, from 0.
    pub generation: usize,
    /// Lowest total error this generation.
    pub best_total_error: f64,
    /// Median total error this generation.
    pub median_total_error: f64,
    /// Mean genome length, silent genes included.
    pub mean_genome_length: f64,
    /// Distinct error vectors.
    pub unique_error_vectors: usize,
}

impl GenerationStats {
    fn of(generation: usize, evaluated: &[Individual]) -> Self {
        let n = evaluated.len().max(1) as f64;
        let unique: HashSet<Vec<u64>> = evaluated
            .iter()
            .map(|i| i.error_vector().unwrap_or(&[]).iter().map(|e| e.to_bits()).collect())
            .collect();
        Self {
            generation,
            best_total_error: evaluated.first().map_or(f64::INFINITY, Individual::total_error),
            median_total_error: evaluated
                .get(evaluated.len() / 2)
                .map_or(f64::INFINITY, Individual::total_error),
            mean_genome_length: evaluated.iter().map(|i| i.genome().len()).sum::<usize>() as f64 / n,
            unique_error_vectors: unique.len(),
        }
    }
}

/// Generational PushGP.
#[derive(Debug)]
pub struct GeneticAlgorithm {
    config: SearchConfiguration,
    pool: Option<ThreadPool>,
    operators: WeightedIndex<f64>,
    rng: SmallRng,
    population: Population,
    generation: usize,
    best: Option<Individual>,
}

impl GeneticAlgorithm {
    /// Validate `config` and build a random initial population.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an invalid configuration or if the
    /// evaluation thread pool cannot be built.
    pub fn new(config: SearchConfiguration) -> Result<Self, ConfigError> {
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let genomes: Vec<Genome> = (0..config.population_size)
            .map(|_| config.random_genome(&mut rng))
            .collect();
        Self::assemble(config, rng, genomes, 0, None)
    }

    /// Continue a search from a checkpoint.
    ///
    /// The random stream is re-seeded from the checkpoint, so a resumed run
    /// is reproducible but differs from an uninterrupted one.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an invalid configuration.
    pub fn from_checkpoint(config: SearchConfiguration, checkpoint: &Checkpoint) -> Result<Self, ConfigError> {
        let rng = SmallRng::seed_from_u64(checkpoint.seed ^ (checkpoint.generation as u64).rotate_left(32));
        let best = checkpoint
            .best
            .as_ref()
            .map(|b| Individual::new(b.genome.clone(), &config.signature).with_errors(b.error_vector.clone()));
        Self::assemble(
            config,
            rng,
            checkpoint.population.clone(),
            checkpoint.generation,
            best,
        )
    }

    fn assemble(
        config: SearchConfiguration,
        rng: SmallRng,
        genomes: Vec<Genome>,
        generation: usize,
        best: Option<Individual>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let operators = config.operator_index()?;
        let pool = if config.parallelism > 1 {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(config.parallelism)
                    .build()
                    .map_err(|e| ConfigError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };
        let population = genomes
            .into_iter()
            .map(|g| Individual::new(g, &config.signature))
            .collect();
        Ok(Self {
            config,
            pool,
            operators,
            rng,
            population,
            generation,
            best,
        })
    }

    /// Generation about to run, or the last one run once finished.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Best individual seen so far.
    #[must_use]
    pub fn best(&self) -> Option<&Individual> {
        self.best.as_ref()
    }

    /// Current population.
    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Run to completion and return the simplified best individual.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Cancelled`] if cancelled before anything was
    /// evaluated.
    pub fn run(self) -> Result<Individual, SearchError> {
        self.run_with(|_| {})
    }

    /// Like [`GeneticAlgorithm::run`], calling `observer` after each
    /// generation is evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Cancelled`] if cancelled before anything was
    /// evaluated.
    pub fn run_with<F: FnMut(&GenerationStats)>(mut self, mut observer: F) -> Result<Individual, SearchError> {
        info!(
            population_size = self.config.population_size,
            max_generations = self.config.max_generations,
            selection = self.config.selection.name(),
            parallelism = self.config.parallelism,
            seed = self.config.seed,
            "starting search"
        );

        while self.generation < self.config.max_generations {
            self.write_checkpoint();

            let evaluated = self.population.evaluate(
                self.config.evaluator.as_ref(),
                self.pool.as_ref(),
                self.config.cancel.as_deref(),
            );
            if !evaluated {
                return self.stop_cancelled();
            }

            let stats = GenerationStats::of(self.generation, self.population.evaluated());
            if let Some(candidate) = self.population.best()
                && self
                    .best
                    .as_ref()
                    .is_none_or(|best| fitness_cmp(candidate, best).is_lt())
            {
                self.best = Some(candidate.clone());
            }
            info!(
                generation = stats.generation,
                best = stats.best_total_error,
                median = stats.median_total_error,
                genome_length = stats.mean_genome_length,
                unique = stats.unique_error_vectors,
                "generation evaluated"
            );
            observer(&stats);

            if self
                .best
                .as_ref()
                .is_some_and(|b| b.total_error() <= self.config.error_threshold)
            {
                info!(generation = self.generation, "error threshold reached");
                break;
            }
            if self.generation + 1 >= self.config.max_generations {
                break;
            }
            self.breed();
            self.generation += 1;
        }

        let best = self
            .best
            .take()
            .ok_or(SearchError::Cancelled {
                generation: self.generation,
            })?;
        info!(total_error = best.total_error(), "search finished");
        Ok(self.config.simplify(best, &mut self.rng))
    }

    fn stop_cancelled(self) -> Result<Individual, SearchError> {
        match self.best {
            Some(best) => {
                warn!(generation = self.generation, "search cancelled; returning best so far");
                Ok(best)
            }
            None => Err(SearchError::Cancelled {
                generation: self.generation,
            }),
        }
    }

    fn breed(&mut self) {
        let config = &self.config;
        let mut next = Population::new();
        for _ in 0..config.population_size {
            let (op, _) = &config.variation[self.operators.sample(&mut self.rng)];
            let parents = config
                .selection
                .select(&self.population, op.num_parents(), &mut self.rng);
            let genomes: Vec<&Genome> = parents.iter().map(|i| i.genome()).collect();
            let child = op.produce(&genomes, &config.spawner, config.max_genome_length, &mut self.rng);
            next.add(Individual::new(child, &config.signature));
        }
        self.population = next;
    }

    fn write_checkpoint(&self) {
        let Some(settings) = &self.config.checkpoint else {
            return;
        };
        if !self.generation.is_multiple_of(settings.interval) {
            return;
        }
        let population = self
            .population
            .unevaluated()
            .iter()
            .chain(self.population.evaluated())
            .map(|i| i.genome().clone())
            .collect();
        let best = self.best.as_ref().and_then(|b| {
            b.error_vector().map(|errors| ScoredGenome {
                genome: b.genome().clone(),
                error_vector: errors.to_vec(),
            })
        });
        let checkpoint = Checkpoint::new(self.generation, self.config.seed, population, best);
        let path = checkpoint_path(&settings.directory, self.generation);
        match save_checkpoint(&checkpoint, &path) {
            Ok(()) => debug!(path = %path.display(), "checkpoint written"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to write checkpoint"),
        }
    }
}

/// Single-individual search that accepts worse candidates with a
/// probability that falls as the temperature cools linearly to zero.
#[derive(Debug)]
pub struct SimulatedAnnealing {
    config: SearchConfiguration,
    operators: WeightedIndex<f64>,
    rng: SmallRng,
}

impl SimulatedAnnealing {
    /// Validate `config`. Every operator must need at most one parent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TooManyParents`] for multi-parent operators
    /// and any other [`ConfigError`] from validation.
    pub fn new(config: SearchConfiguration) -> Result<Self, ConfigError> {
        config.validate()?;
        if let Some((op, _)) = config.variation.iter().find(|(op, _)| op.num_parents() > 1) {
            return Err(ConfigError::TooManyParents {
                operator: op.name().to_string(),
                parents: op.num_parents(),
            });
        }
        let operators = config.operator_index()?;
        let rng = SmallRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            operators,
            rng,
        })
    }

    /// Run and return the simplified best individual.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Cancelled`] if cancelled before the initial
    /// individual was evaluated.
    pub fn run(self) -> Result<Individual, SearchError> {
        self.run_with(|_| {})
    }

    /// Like [`SimulatedAnnealing::run`], calling `observer` after each step.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Cancelled`] if cancelled before the initial
    /// individual was evaluated.
    pub fn run_with<F: FnMut(&GenerationStats)>(mut self, mut observer: F) -> Result<Individual, SearchError> {
        let config = &self.config;
        if config.cancelled() {
            return Err(SearchError::Cancelled { generation: 0 });
        }
        let evaluator = config.evaluator.as_ref();
        let mut current = Individual::new(config.random_genome(&mut self.rng), &config.signature);
        current.evaluate(evaluator);
        let mut best = current.clone();
        info!(max_generations = config.max_generations, "starting simulated annealing");

        let max = config.max_generations as f64;
        for generation in 0..config.max_generations {
            if config.cancelled() {
                warn!(generation, "annealing cancelled; returning best so far");
                return Ok(best);
            }
            let temperature = 1.0 - generation as f64 / max;
            let (op, _) = &config.variation[self.operators.sample(&mut self.rng)];
            let child = op.produce(
                &[current.genome()],
                &config.spawner,
                config.max_genome_length,
                &mut self.rng,
            );
            let mut candidate = Individual::new(child, &config.signature);
            candidate.evaluate(evaluator);

            let delta = candidate.total_error() - current.total_error();
            let accepted = candidate.total_error() <= current.total_error()
                || (delta.is_finite() && self.rng.r#gen::<f64>() < (-delta / temperature).exp());
            debug!(generation, temperature, delta, accepted, "annealing step");
            if accepted {
                current = candidate;
                if fitness_cmp(&current, &best).is_lt() {
                    best = current.clone();
                }
            }

            observer(&GenerationStats {
                generation,
                best_total_error: best.total_error(),
                median_total_error: current.total_error(),
                mean_genome_length: current.genome().len() as f64,
                unique_error_vectors: 1,
            });
            if best.total_error() <= config.error_threshold {
                info!(generation, "error threshold reached");
                break;
            }
        }

        info!(total_error = best.total_error(), "annealing finished");
        Ok(self.config.simplify(best, &mut self.rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::evaluation::{Case, DatasetEvaluator};
    use crate::gp::spawn::Erc;
    use crate::push::{OutputSpec, StackKind, Value, instructions};

    /// f(x) = 2x over a tiny alphabet.
    fn doubling() -> SearchConfiguration {
        let signature = ProgramSignature::new(1, vec![OutputSpec::Stack(StackKind::Int)]);
        let cases = [-3, 0, 1, 4, 10]
            .into_iter()
            .map(|x| Case::new(vec![Value::Int(x)], vec![Value::Int(2 * x)]))
            .collect();
        let spawner = GeneSpawner::new(
            1,
            ["int_add", "int_sub", "int_dup"]
                .into_iter()
                .map(|name| instructions::lookup(name).unwrap())
                .collect(),
            vec![],
            vec![Erc::Int { min: 0, max: 2 }],
        )
        .unwrap();
        let mut config = SearchConfiguration::new(
            signature,
            Arc::new(DatasetEvaluator::new(cases).with_penalty(1000.0)),
            spawner,
        );
        config.population_size = 200;
        config.max_generations = 20;
        config.initial_genome_size = (2, 6);
        config.max_genome_length = 50;
        config.simplification_steps = 200;
        config.seed = 42;
        config
    }

    #[test]
    fn test_validation() {
        let mut config = doubling();
        config.population_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::EmptyPopulation));

        let mut config = doubling();
        config.variation = vec![];
        assert_eq!(config.validate(), Err(ConfigError::NoVariation));

        let mut config = doubling();
        config.variation = vec![(VariationOperator::umad(), 0.0)];
        assert_eq!(config.validate(), Err(ConfigError::NoVariation));

        let mut config = doubling();
        config.variation = vec![(VariationOperator::umad(), -1.0)];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWeight { .. })));

        let mut config = doubling();
        config.initial_genome_size = (9, 3);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSizeRange { min: 9, max: 3 })
        );

        assert!(doubling().validate().is_ok());
    }

    #[test]
    fn test_genetic_algorithm_solves_doubling() {
        let mut generations = Vec::new();
        let best = GeneticAlgorithm::new(doubling())
            .unwrap()
            .run_with(|stats| generations.push(*stats))
            .unwrap();
        assert_eq!(best.total_error(), 0.0);
        assert!(!generations.is_empty());
        assert!(generations.len() <= 20);
        assert!(best.genome().genes().iter().all(|g| !g.silent));
        for x in [7, -12] {
            assert_eq!(best.program().apply(&[Value::Int(x)]), vec![Some(Value::Int(2 * x))]);
        }
    }

    #[test]
    fn test_same_seed_same_result_across_thread_counts() {
        let run = |parallelism| {
            let mut config = doubling();
            config.parallelism = parallelism;
            config.max_generations = 3;
            config.error_threshold = -1.0;
            let mut bests = Vec::new();
            GeneticAlgorithm::new(config)
                .unwrap()
                .run_with(|s| bests.push((s.best_total_error, s.median_total_error, s.unique_error_vectors)))
                .unwrap();
            bests
        };
        assert_eq!(run(0), run(4));
    }

    #[test]
    fn test_annealing_rejects_two_parent_operators() {
        let mut config = doubling();
        config.variation = vec![(VariationOperator::alternation(), 1.0)];
        assert_eq!(
            SimulatedAnnealing::new(config).unwrap_err(),
            ConfigError::TooManyParents {
                operator: "alternation".into(),
                parents: 2
            }
        );
    }

    #[test]
    fn test_annealing_never_loses_best() {
        let mut config = doubling();
        config.max_generations = 300;
        let mut best_so_far = f64::INFINITY;
        let best = SimulatedAnnealing::new(config)
            .unwrap()
            .run_with(|stats| {
                assert!(stats.best_total_error <= best_so_far);
                best_so_far = stats.best_total_error;
            })
            .unwrap();
        assert_eq!(best.total_error(), best_so_far);
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut config = doubling();
        config.cancel = Some(Arc::new(AtomicBool::new(true)));
        let err = GeneticAlgorithm::new(config).unwrap().run().unwrap_err();
        assert!(matches!(err, SearchError::Cancelled { generation: 0 }));
    }
}
