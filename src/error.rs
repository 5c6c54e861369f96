//! Error types for configuration, persistence and search.
//!
//! The interpreter itself has no error type: instructions that cannot run
//! are no-ops and resource limits are reported through
//! [`RunStatus`](crate::push::RunStatus).

use thiserror::Error;

/// Invalid search or spawner configuration.
///
/// Raised synchronously, before any search starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Population size must be at least one.
    #[error("population size must be positive")]
    EmptyPopulation,

    /// At least one generation must be run.
    #[error("max generations must be positive")]
    NoGenerations,

    /// The variation list is empty or all weights are zero.
    #[error("no variation operators with positive weight")]
    NoVariation,

    /// A variation weight is negative or not finite.
    #[error("invalid weight {weight} for variation operator {operator}")]
    InvalidWeight {
        /// Operator name.
        operator: String,
        /// Offending weight.
        weight: f64,
    },

    /// A probability parameter lies outside `[0, 1]`.
    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidRate {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A scale parameter is negative or not finite.
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A size range has `min > max`.
    #[error("invalid size range {min}..={max}")]
    InvalidSizeRange {
        /// Lower bound.
        min: usize,
        /// Upper bound.
        max: usize,
    },

    /// Selector name not recognised.
    #[error("unknown selection method: {0}")]
    UnknownSelector(String),

    /// Variation operator name not recognised.
    #[error("unknown variation operator: {0}")]
    UnknownOperator(String),

    /// Stack identifier not recognised.
    #[error("unknown stack: {0}")]
    UnknownStack(String),

    /// Tournament size must be at least one.
    #[error("tournament size must be positive")]
    EmptyTournament,

    /// The close-count distribution is empty or has no positive weight.
    #[error("invalid close distribution: {0}")]
    InvalidCloseDistribution(String),

    /// The spawner has nothing to sample from.
    #[error("gene spawner has an empty alphabet")]
    EmptyAlphabet,

    /// Simulated annealing only supports operators with at most one parent.
    #[error("operator {operator} needs {parents} parents; annealing allows at most 1")]
    TooManyParents {
        /// Operator name.
        operator: String,
        /// Parents the operator requires.
        parents: usize,
    },

    /// The worker thread pool could not be built.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Failure to load or save programs, genomes or checkpoints.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Malformed JSON or an unknown atom kind.
    #[error("malformed data: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An instruction name that is not in the catalog.
    #[error("unknown instruction: {0}")]
    UnknownInstruction(String),

    /// A checkpoint written by an incompatible format version.
    #[error("unsupported checkpoint version: {0}")]
    UnsupportedVersion(u32),
}

/// Failure of a search run.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The run was cancelled before any individual was evaluated.
    #[error("search cancelled at generation {generation}")]
    Cancelled {
        /// Generation being evaluated when cancellation was observed.
        generation: usize,
    },

    /// Reading a checkpoint failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] SerializationError),
}
