//! Genetic programming over linear Push genomes.
//!
//! Genomes are flat gene sequences that translate deterministically to
//! nested Push code. The search driver evolves a population of genomes
//! against an [`Evaluator`], using lexicase-family selection and
//! size-preserving variation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   GeneticAlgorithm / Annealing      │
//! ├─────────────────────────────────────┤
//! │ Selection │ Variation │ Simplifier  │
//! ├─────────────────────────────────────┤
//! │  Population → Evaluator (parallel)  │
//! ├─────────────────────────────────────┤
//! │  GeneSpawner → Genome → CodeBlock   │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pushgp::gp::{GeneSpawner, GeneticAlgorithm, SearchConfiguration};
//!
//! let config = SearchConfiguration::new(signature, evaluator, spawner);
//! let best = GeneticAlgorithm::new(config)?.run()?;
//! println!("{}", best.program().code);
//! ```

mod evaluation;
mod genome;
mod individual;
mod persistence;
mod search;
mod selection;
mod simplification;
mod spawn;
mod variation;

pub use evaluation::{Case, DatasetEvaluator, Evaluator, FunctionEvaluator, damerau_levenshtein, value_error};
pub use genome::{Gene, Genome};
pub use individual::{Individual, Population, fitness_cmp, total_error};
pub use persistence::{
    CHECKPOINT_VERSION, Checkpoint, ScoredGenome, checkpoint_path, from_json, latest_checkpoint,
    load_checkpoint, load_genome, load_program, save_checkpoint, save_genome, save_program,
};
pub use search::{
    CheckpointConfig, GenerationStats, GeneticAlgorithm, SearchConfiguration, SimulatedAnnealing,
};
pub use selection::{Epsilon, SelectionMethod};
pub use simplification::GenomeSimplifier;
pub use spawn::{DEFAULT_CLOSE_DISTRIBUTION, Erc, GeneSpawner};
pub use variation::VariationOperator;
