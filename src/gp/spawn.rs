//! Random atoms, genes and genomes.

use std::fmt;
use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore};

use crate::error::ConfigError;
use crate::gp::genome::{Gene, Genome};
use crate::push::instructions;
use crate::push::{Atom, Instruction, StackKind, Value};

/// Default probabilities of a gene closing 0, 1, 2 or 3 blocks.
pub const DEFAULT_CLOSE_DISTRIBUTION: [f64; 4] = [0.772, 0.206, 0.021, 0.001];

/// Printable ASCII, the alphabet for random characters and strings.
const PRINTABLE: std::ops::Range<u8> = 32..127;

type CustomErc = dyn Fn(&mut dyn RngCore) -> Value + Send + Sync;

/// Ephemeral random constant: samples a literal when a gene is created.
#[derive(Clone)]
pub enum Erc {
    /// Uniform integer in `min..=max`.
    Int {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
    /// Uniform float in `min..max`.
    Float {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Fair coin.
    Bool,
    /// Printable ASCII character.
    Char,
    /// Printable ASCII string with length in `min_len..=max_len`.
    Str {
        /// Shortest length.
        min_len: usize,
        /// Longest length.
        max_len: usize,
    },
    /// User sampler.
    Custom(Arc<CustomErc>),
}

impl Erc {
    /// Draw one value.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Value {
        match self {
            Erc::Int { min, max } => Value::Int(rng.gen_range(*min.min(max)..=*min.max(max))),
            Erc::Float { min, max } => {
                if min < max {
                    Value::Float(rng.gen_range(*min..*max))
                } else {
                    Value::Float(*min)
                }
            }
            Erc::Bool => Value::Bool(rng.gen_bool(0.5)),
            Erc::Char => Value::Char(random_char(rng)),
            Erc::Str { min_len, max_len } => {
                let len = rng.gen_range(*min_len.min(max_len)..=*min_len.max(max_len));
                Value::Str((0..len).map(|_| random_char(rng)).collect())
            }
            Erc::Custom(f) => (**f)(rng),
        }
    }

    /// Reasonable default generators for the given stacks.
    #[must_use]
    pub fn defaults_for(kinds: &[StackKind]) -> Vec<Erc> {
        kinds
            .iter()
            .filter_map(|kind| match kind {
                StackKind::Int => Some(Erc::Int { min: -10, max: 10 }),
                StackKind::Float => Some(Erc::Float {
                    min: -10.0,
                    max: 10.0,
                }),
                StackKind::Bool => Some(Erc::Bool),
                StackKind::Char => Some(Erc::Char),
                StackKind::Str => Some(Erc::Str {
                    min_len: 0,
                    max_len: 5,
                }),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Debug for Erc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Erc::Int { min, max } => write!(f, "Int({min}..={max})"),
            Erc::Float { min, max } => write!(f, "Float({min}..{max})"),
            Erc::Bool => f.write_str("Bool"),
            Erc::Char => f.write_str("Char"),
            Erc::Str { min_len, max_len } => write!(f, "Str({min_len}..={max_len})"),
            Erc::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A random printable ASCII character.
pub(crate) fn random_char<R: Rng>(rng: &mut R) -> char {
    char::from(rng.gen_range(PRINTABLE))
}

/// Samples atoms uniformly from instructions, literals, ERCs and inputs.
#[derive(Debug, Clone)]
pub struct GeneSpawner {
    instructions: Vec<&'static Instruction>,
    literals: Vec<Value>,
    ercs: Vec<Erc>,
    input_arity: usize,
    close_distribution: Vec<f64>,
    close_index: WeightedIndex<f64>,
    silent_probability: f64,
}

impl GeneSpawner {
    /// Build a spawner with the default close distribution.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyAlphabet`] if there is nothing to sample.
    pub fn new(
        input_arity: usize,
        instructions: Vec<&'static Instruction>,
        literals: Vec<Value>,
        ercs: Vec<Erc>,
    ) -> Result<Self, ConfigError> {
        if instructions.is_empty() && literals.is_empty() && ercs.is_empty() && input_arity == 0 {
            return Err(ConfigError::EmptyAlphabet);
        }
        let close_distribution = DEFAULT_CLOSE_DISTRIBUTION.to_vec();
        let close_index = close_index(&close_distribution)?;
        Ok(Self {
            instructions,
            literals,
            ercs,
            input_arity,
            close_distribution,
            close_index,
            silent_probability: 0.0,
        })
    }

    /// Spawner over every catalog instruction for `kinds`, with default ERCs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyAlphabet`] if `kinds` yields nothing.
    pub fn for_stacks(input_arity: usize, kinds: &[StackKind]) -> Result<Self, ConfigError> {
        Self::new(
            input_arity,
            instructions::for_stacks(kinds),
            Vec::new(),
            Erc::defaults_for(kinds),
        )
    }

    /// Replace the close-count distribution. Index `i` weights closing `i`
    /// blocks.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCloseDistribution`] if the weights are
    /// empty, negative, or all zero.
    pub fn with_close_distribution(mut self, weights: Vec<f64>) -> Result<Self, ConfigError> {
        if weights.len() > usize::from(u8::MAX) + 1 {
            return Err(ConfigError::InvalidCloseDistribution(format!(
                "{} entries; at most 256 allowed",
                weights.len()
            )));
        }
        self.close_index = close_index(&weights)?;
        self.close_distribution = weights;
        Ok(self)
    }

    /// Probability that a new gene is born silent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRate`] outside `[0, 1]`.
    pub fn with_silent_probability(mut self, p: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::InvalidRate {
                name: "silent_probability",
                value: p,
            });
        }
        self.silent_probability = p;
        Ok(self)
    }

    /// Instructions in the alphabet.
    #[must_use]
    pub fn instructions(&self) -> &[&'static Instruction] {
        &self.instructions
    }

    /// Input registers programs may reference.
    #[must_use]
    pub fn input_arity(&self) -> usize {
        self.input_arity
    }

    /// Close-count weights.
    #[must_use]
    pub fn close_distribution(&self) -> &[f64] {
        &self.close_distribution
    }

    /// Draw an atom uniformly from the whole alphabet.
    pub fn random_atom<R: Rng>(&self, rng: &mut R) -> Atom {
        let total = self.instructions.len() + self.literals.len() + self.ercs.len() + self.input_arity;
        let mut i = rng.gen_range(0..total);
        if i < self.instructions.len() {
            return Atom::Instruction(self.instructions[i]);
        }
        i -= self.instructions.len();
        if i < self.literals.len() {
            return Atom::Literal(self.literals[i].clone());
        }
        i -= self.literals.len();
        if i < self.ercs.len() {
            return Atom::Literal(self.ercs[i].sample(rng));
        }
        Atom::Input(i - self.ercs.len())
    }

    /// Draw a close count.
    pub fn random_close<R: Rng>(&self, rng: &mut R) -> u8 {
        u8::try_from(self.close_index.sample(rng)).unwrap_or(u8::MAX)
    }

    /// Draw a gene.
    pub fn random_gene<R: Rng>(&self, rng: &mut R) -> Gene {
        let silent = self.silent_probability > 0.0 && rng.gen_bool(self.silent_probability);
        Gene {
            atom: self.random_atom(rng),
            close: self.random_close(rng),
            silent,
        }
    }

    /// Draw a genome of exactly `len` genes.
    pub fn random_genome<R: Rng>(&self, len: usize, rng: &mut R) -> Genome {
        (0..len).map(|_| self.random_gene(rng)).collect()
    }
}

fn close_index(weights: &[f64]) -> Result<WeightedIndex<f64>, ConfigError> {
    WeightedIndex::new(weights).map_err(|e| ConfigError::InvalidCloseDistribution(e.to_string()))
}
