//! Variation operators: genomes in, one child genome out.
//!
//! Every operator declares how many parents it consumes and clips its
//! child to the maximum genome length.

// Gaussian offsets are rounded to integer shifts
#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use std::str::FromStr;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gp::genome::{Gene, Genome};
use crate::gp::spawn::{GeneSpawner, random_char};
use crate::push::{Atom, Value};

/// A way to produce a child genome from parent genomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum VariationOperator {
    /// Copy genes alternately from two parents, switching source (and
    /// shifting the read position) at random.
    Alternation {
        /// Per-gene probability of switching parent.
        rate: f64,
        /// Standard deviation of the read-position shift on a switch.
        alignment_deviation: f64,
    },
    /// Replace or tweak each gene independently.
    UniformMutation {
        /// Per-gene mutation probability.
        rate: f64,
        /// Probability a mutated literal is perturbed rather than replaced.
        constant_tweak_rate: f64,
        /// Standard deviation of float perturbations.
        float_sd: f64,
        /// Standard deviation of integer perturbations.
        int_sd: f64,
        /// Per-character replacement probability in string tweaks.
        str_char_change_rate: f64,
    },
    /// Nudge close counts up or down.
    UniformCloseMutation {
        /// Per-gene mutation probability.
        rate: f64,
        /// Probability a mutation increments rather than decrements.
        increment_rate: f64,
    },
    /// Uniform addition then length-balancing uniform deletion.
    Umad {
        /// Per-gene insertion probability.
        addition_rate: f64,
    },
    /// Apply operators in sequence, the child of each feeding the next.
    Pipeline {
        /// Stages, first to last.
        operators: Vec<VariationOperator>,
    },
    /// Copy the parent unchanged.
    Cloning,
    /// A fresh random genome.
    Genesis {
        /// Shortest genome.
        min_size: usize,
        /// Longest genome.
        max_size: usize,
    },
}

impl VariationOperator {
    /// Alternation with rate 0.01 and alignment deviation 10.
    #[must_use]
    pub fn alternation() -> Self {
        VariationOperator::Alternation {
            rate: 0.01,
            alignment_deviation: 10.0,
        }
    }

    /// Uniform mutation with the usual tuning.
    #[must_use]
    pub fn uniform_mutation() -> Self {
        VariationOperator::UniformMutation {
            rate: 0.01,
            constant_tweak_rate: 0.5,
            float_sd: 1.0,
            int_sd: 1.0,
            str_char_change_rate: 0.1,
        }
    }

    /// Close mutation with rate 0.01, increments and decrements equally likely.
    #[must_use]
    pub fn close_mutation() -> Self {
        VariationOperator::UniformCloseMutation {
            rate: 0.01,
            increment_rate: 0.5,
        }
    }

    /// UMAD with addition rate 0.09.
    #[must_use]
    pub fn umad() -> Self {
        VariationOperator::Umad {
            addition_rate: 0.09,
        }
    }

    /// Random genomes of 10 to 50 genes.
    #[must_use]
    pub fn genesis() -> Self {
        VariationOperator::Genesis {
            min_size: 10,
            max_size: 50,
        }
    }

    /// Parents consumed by [`VariationOperator::produce`].
    #[must_use]
    pub fn num_parents(&self) -> usize {
        match self {
            VariationOperator::Alternation { .. } => 2,
            VariationOperator::UniformMutation { .. }
            | VariationOperator::UniformCloseMutation { .. }
            | VariationOperator::Umad { .. }
            | VariationOperator::Cloning => 1,
            VariationOperator::Pipeline { operators } => operators
                .iter()
                .map(VariationOperator::num_parents)
                .max()
                .unwrap_or(0),
            VariationOperator::Genesis { .. } => 0,
        }
    }

    /// Operator name, as accepted by `FromStr`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            VariationOperator::Alternation { .. } => "alternation",
            VariationOperator::UniformMutation { .. } => "uniform-mutation",
            VariationOperator::UniformCloseMutation { .. } => "close-mutation",
            VariationOperator::Umad { .. } => "umad",
            VariationOperator::Pipeline { .. } => "pipeline",
            VariationOperator::Cloning => "cloning",
            VariationOperator::Genesis { .. } => "genesis",
        }
    }

    /// Check rates and sizes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRate`] for a probability outside
    /// `[0, 1]`, [`ConfigError::InvalidParameter`] for a bad deviation,
    /// [`ConfigError::InvalidSizeRange`] for inverted genesis bounds and
    /// [`ConfigError::NoVariation`] for an empty pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            VariationOperator::Alternation {
                rate,
                alignment_deviation,
            } => {
                check_rate("alternation_rate", *rate)?;
                check_scale("alignment_deviation", *alignment_deviation)
            }
            VariationOperator::UniformMutation {
                rate,
                constant_tweak_rate,
                float_sd,
                int_sd,
                str_char_change_rate,
            } => {
                check_rate("uniform_mutation_rate", *rate)?;
                check_rate("constant_tweak_rate", *constant_tweak_rate)?;
                check_rate("str_char_change_rate", *str_char_change_rate)?;
                check_scale("float_sd", *float_sd)?;
                check_scale("int_sd", *int_sd)
            }
            VariationOperator::UniformCloseMutation {
                rate,
                increment_rate,
            } => {
                check_rate("close_mutation_rate", *rate)?;
                check_rate("increment_rate", *increment_rate)
            }
            VariationOperator::Umad { addition_rate } => check_rate("addition_rate", *addition_rate),
            VariationOperator::Pipeline { operators } => {
                if operators.is_empty() {
                    return Err(ConfigError::NoVariation);
                }
                operators.iter().try_for_each(VariationOperator::validate)
            }
            VariationOperator::Cloning => Ok(()),
            VariationOperator::Genesis { min_size, max_size } => {
                if min_size > max_size {
                    Err(ConfigError::InvalidSizeRange {
                        min: *min_size,
                        max: *max_size,
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Produce one child no longer than `max_len`.
    ///
    /// Missing parents are treated as empty genomes.
    pub fn produce<R: Rng>(
        &self,
        parents: &[&Genome],
        spawner: &GeneSpawner,
        max_len: usize,
        rng: &mut R,
    ) -> Genome {
        let empty = Genome::default();
        let first = parents.first().copied().unwrap_or(&empty);
        let mut child = match self {
            VariationOperator::Alternation {
                rate,
                alignment_deviation,
            } => {
                let second = parents.get(1).copied().unwrap_or(first);
                alternate(first, second, *rate, *alignment_deviation, max_len, rng)
            }
            VariationOperator::UniformMutation {
                rate,
                constant_tweak_rate,
                float_sd,
                int_sd,
                str_char_change_rate,
            } => {
                let tweak = Tweak {
                    float_sd: *float_sd,
                    int_sd: *int_sd,
                    str_char_change_rate: *str_char_change_rate,
                };
                first
                    .genes()
                    .iter()
                    .map(|gene| {
                        if !chance(rng, *rate) {
                            return gene.clone();
                        }
                        if let Atom::Literal(value) = &gene.atom
                            && chance(rng, *constant_tweak_rate)
                            && let Some(value) = tweak.apply(value, rng)
                        {
                            return Gene {
                                atom: Atom::Literal(value),
                                ..gene.clone()
                            };
                        }
                        spawner.random_gene(rng)
                    })
                    .collect()
            }
            VariationOperator::UniformCloseMutation {
                rate,
                increment_rate,
            } => first
                .genes()
                .iter()
                .map(|gene| {
                    let mut gene = gene.clone();
                    if chance(rng, *rate) {
                        gene.close = if chance(rng, *increment_rate) {
                            gene.close.saturating_add(1)
                        } else {
                            gene.close.saturating_sub(1)
                        };
                    }
                    gene
                })
                .collect(),
            VariationOperator::Umad { addition_rate } => umad(first, *addition_rate, spawner, rng),
            VariationOperator::Pipeline { operators } => {
                let mut child = first.clone();
                for op in operators {
                    let mut stage: Vec<&Genome> = Vec::with_capacity(parents.len().max(1));
                    stage.push(&child);
                    stage.extend(parents.iter().skip(1).copied());
                    child = op.produce(&stage, spawner, max_len, rng);
                }
                child
            }
            VariationOperator::Cloning => first.clone(),
            VariationOperator::Genesis { min_size, max_size } => {
                let len = rng.gen_range(*min_size.min(max_size)..=*min_size.max(max_size));
                spawner.random_genome(len, rng)
            }
        };
        child.truncate(max_len);
        child
    }
}

impl FromStr for VariationOperator {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alternation" => Ok(Self::alternation()),
            "uniform-mutation" => Ok(Self::uniform_mutation()),
            "close-mutation" => Ok(Self::close_mutation()),
            "umad" => Ok(Self::umad()),
            "cloning" => Ok(VariationOperator::Cloning),
            "genesis" => Ok(Self::genesis()),
            _ => Err(ConfigError::UnknownOperator(s.to_string())),
        }
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}

fn check_scale(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

/// Bernoulli trial that tolerates out-of-range probabilities.
fn chance<R: Rng>(rng: &mut R, p: f64) -> bool {
    rng.r#gen::<f64>() < p
}

fn gaussian<R: Rng>(rng: &mut R) -> f64 {
    rng.sample(StandardNormal)
}

fn alternate<R: Rng>(
    a: &Genome,
    b: &Genome,
    rate: f64,
    deviation: f64,
    max_len: usize,
    rng: &mut R,
) -> Genome {
    let limit = a.len().max(b.len()).min(max_len);
    let mut child = Vec::with_capacity(limit);
    let mut from_a = rng.gen_bool(0.5);
    let mut i = 0usize;
    while child.len() < limit {
        let source = if from_a { a } else { b };
        let Some(gene) = source.genes().get(i) else {
            break;
        };
        child.push(gene.clone());
        i += 1;
        if chance(rng, rate) {
            let shift = (deviation * gaussian(rng)).round() as i64;
            let moved = i64::try_from(i).unwrap_or(i64::MAX).saturating_add(shift);
            i = usize::try_from(moved.max(0)).unwrap_or(0);
            from_a = !from_a;
        }
    }
    Genome::new(child)
}

/// Insertion rate `a` is balanced by deletion rate `a / (1 + a)`, so the
/// expected child length equals the parent's.
fn umad<R: Rng>(parent: &Genome, addition_rate: f64, spawner: &GeneSpawner, rng: &mut R) -> Genome {
    let deletion_rate = addition_rate / (1.0 + addition_rate);
    let mut grown = Vec::with_capacity(parent.len() * 2);
    for gene in parent.genes() {
        if chance(rng, addition_rate) {
            let new = spawner.random_gene(rng);
            if rng.gen_bool(0.5) {
                grown.push(new);
                grown.push(gene.clone());
            } else {
                grown.push(gene.clone());
                grown.push(new);
            }
        } else {
            grown.push(gene.clone());
        }
    }
    grown
        .into_iter()
        .filter(|_| !chance(rng, deletion_rate))
        .collect()
}

struct Tweak {
    float_sd: f64,
    int_sd: f64,
    str_char_change_rate: f64,
}

impl Tweak {
    /// Perturbed literal, or `None` for values that have no perturbation.
    fn apply<R: Rng>(&self, value: &Value, rng: &mut R) -> Option<Value> {
        Some(match value {
            Value::Int(i) => Value::Int(self.int(*i, rng)),
            Value::Float(f) => Value::Float(f + self.float_sd * gaussian(rng)),
            Value::Bool(_) => Value::Bool(rng.gen_bool(0.5)),
            Value::Char(_) => Value::Char(random_char(rng)),
            Value::Str(s) => Value::Str(self.string(s, rng)),
            Value::VectorInt(v) => Value::VectorInt(v.iter().map(|i| self.int(*i, rng)).collect()),
            Value::VectorFloat(v) => Value::VectorFloat(
                v.iter()
                    .map(|f| f + self.float_sd * gaussian(rng))
                    .collect(),
            ),
            Value::VectorStr(v) => Value::VectorStr(v.iter().map(|s| self.string(s, rng)).collect()),
            Value::VectorBool(v) => Value::VectorBool(
                v.iter()
                    .map(|b| if chance(rng, self.str_char_change_rate) { !b } else { *b })
                    .collect(),
            ),
            Value::Code(_) => return None,
        })
    }

    fn int<R: Rng>(&self, i: i64, rng: &mut R) -> i64 {
        i.saturating_add((self.int_sd * gaussian(rng)).round() as i64)
    }

    fn string<R: Rng>(&self, s: &str, rng: &mut R) -> String {
        s.chars()
            .map(|c| {
                if chance(rng, self.str_char_change_rate) {
                    random_char(rng)
                } else {
                    c
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::spawn::Erc;
    use crate::push::instructions;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn spawner() -> GeneSpawner {
        GeneSpawner::new(
            1,
            vec![instructions::lookup("int_add").unwrap()],
            vec![],
            vec![Erc::Int { min: 0, max: 9 }],
        )
        .unwrap()
    }

    fn ints(values: impl IntoIterator<Item = i64>) -> Genome {
        values
            .into_iter()
            .map(|v| Gene::new(Atom::Literal(Value::Int(v))))
            .collect()
    }

    fn values(genome: &Genome) -> Vec<i64> {
        genome
            .genes()
            .iter()
            .filter_map(|g| match &g.atom {
                Atom::Literal(Value::Int(i)) => Some(*i),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_num_parents() {
        assert_eq!(VariationOperator::alternation().num_parents(), 2);
        assert_eq!(VariationOperator::umad().num_parents(), 1);
        assert_eq!(VariationOperator::genesis().num_parents(), 0);
        let pipeline = VariationOperator::Pipeline {
            operators: vec![VariationOperator::alternation(), VariationOperator::umad()],
        };
        assert_eq!(pipeline.num_parents(), 2);
    }

    #[test]
    fn test_alternation_without_switching_copies_a_parent() {
        let a = ints(0..10);
        let b = ints(100..105);
        let op = VariationOperator::Alternation {
            rate: 0.0,
            alignment_deviation: 10.0,
        };
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..20 {
            let child = values(&op.produce(&[&a, &b], &spawner(), 500, &mut rng));
            assert!(child == values(&a) || child == values(&b));
        }
    }

    #[test]
    fn test_alternation_mixes_parents_within_bound() {
        let a = ints(0..30);
        let b = ints(100..120);
        let op = VariationOperator::Alternation {
            rate: 0.3,
            alignment_deviation: 2.0,
        };
        let mut rng = SmallRng::seed_from_u64(2);
        let mut mixed = false;
        for _ in 0..100 {
            let child = values(&op.produce(&[&a, &b], &spawner(), 500, &mut rng));
            assert!(child.len() <= 30);
            mixed |= child.iter().any(|v| *v < 100) && child.iter().any(|v| *v >= 100);
        }
        assert!(mixed);
    }

    #[test]
    fn test_children_are_clipped() {
        let parent = ints(0..50);
        let mut rng = SmallRng::seed_from_u64(3);
        for op in [
            VariationOperator::Umad { addition_rate: 1.0 },
            VariationOperator::Cloning,
            VariationOperator::alternation(),
            VariationOperator::genesis(),
        ] {
            let child = op.produce(&[&parent, &parent], &spawner(), 20, &mut rng);
            assert!(child.len() <= 20, "{} produced {}", op.name(), child.len());
        }
    }

    #[test]
    fn test_uniform_mutation_rate_one_changes_literals() {
        let parent = ints([5; 40]);
        let op = VariationOperator::UniformMutation {
            rate: 1.0,
            constant_tweak_rate: 1.0,
            float_sd: 1.0,
            int_sd: 3.0,
            str_char_change_rate: 0.1,
        };
        let mut rng = SmallRng::seed_from_u64(4);
        let child = op.produce(&[&parent], &spawner(), 500, &mut rng);
        assert_eq!(child.len(), 40);
        // every gene was tweaked, so all stay int literals and some moved
        assert_eq!(values(&child).len(), 40);
        assert!(values(&child).iter().any(|v| *v != 5));
    }

    #[test]
    fn test_uniform_mutation_rate_zero_is_identity() {
        let parent = ints(0..10);
        let mut op = VariationOperator::uniform_mutation();
        if let VariationOperator::UniformMutation { rate, .. } = &mut op {
            *rate = 0.0;
        }
        let mut rng = SmallRng::seed_from_u64(5);
        assert_eq!(op.produce(&[&parent], &spawner(), 500, &mut rng), parent);
    }

    #[test]
    fn test_close_mutation_never_underflows() {
        let parent = ints(0..20);
        let op = VariationOperator::UniformCloseMutation {
            rate: 1.0,
            increment_rate: 0.0,
        };
        let mut rng = SmallRng::seed_from_u64(6);
        let child = op.produce(&[&parent], &spawner(), 500, &mut rng);
        assert!(child.genes().iter().all(|g| g.close == 0));

        let op = VariationOperator::UniformCloseMutation {
            rate: 1.0,
            increment_rate: 1.0,
        };
        let child = op.produce(&[&parent], &spawner(), 500, &mut rng);
        assert!(child.genes().iter().all(|g| g.close == 1));
    }

    #[test]
    fn test_tweak_keeps_value_kind() {
        let tweak = Tweak {
            float_sd: 1.0,
            int_sd: 1.0,
            str_char_change_rate: 1.0,
        };
        let mut rng = SmallRng::seed_from_u64(7);
        let s = tweak.apply(&Value::Str("hello".into()), &mut rng).unwrap();
        assert_eq!(s.as_str().map(|s| s.chars().count()), Some(5));
        let v = tweak.apply(&Value::VectorInt(vec![1, 2, 3]), &mut rng).unwrap();
        assert_eq!(v.elements().map(|e| e.len()), Some(3));
        assert!(tweak.apply(&Value::code(Atom::Input(0)), &mut rng).is_none());
    }

    #[test]
    fn test_float_tweak_scales_with_sd() {
        let tweak = Tweak {
            float_sd: 2.0,
            int_sd: 0.0,
            str_char_change_rate: 0.0,
        };
        let mut rng = SmallRng::seed_from_u64(11);
        let n = 4000;
        let offsets: Vec<f64> = (0..n)
            .map(|_| tweak.apply(&Value::Float(10.0), &mut rng).and_then(|v| v.as_float()).unwrap() - 10.0)
            .collect();
        let mean = offsets.iter().sum::<f64>() / f64::from(n);
        let sd = (offsets.iter().map(|o| (o - mean).powi(2)).sum::<f64>() / f64::from(n - 1)).sqrt();
        assert!(mean.abs() < 0.2, "mean {mean}");
        assert!((1.8..2.2).contains(&sd), "sd {sd}");
        assert_eq!(tweak.apply(&Value::Int(5), &mut rng), Some(Value::Int(5)));
    }

    #[test]
    fn test_pipeline_chains_stages() {
        let parent = ints(0..10);
        let op = VariationOperator::Pipeline {
            operators: vec![
                VariationOperator::Cloning,
                VariationOperator::UniformCloseMutation {
                    rate: 1.0,
                    increment_rate: 1.0,
                },
                VariationOperator::UniformCloseMutation {
                    rate: 1.0,
                    increment_rate: 1.0,
                },
            ],
        };
        let mut rng = SmallRng::seed_from_u64(8);
        let child = op.produce(&[&parent], &spawner(), 500, &mut rng);
        assert!(child.genes().iter().all(|g| g.close == 2));
    }

    #[test]
    fn test_validation_and_names() {
        assert!(VariationOperator::Umad { addition_rate: 1.5 }.validate().is_err());
        assert!(
            VariationOperator::Genesis {
                min_size: 5,
                max_size: 1
            }
            .validate()
            .is_err()
        );
        assert_eq!(
            VariationOperator::Pipeline { operators: vec![] }.validate(),
            Err(ConfigError::NoVariation)
        );
        for name in ["alternation", "uniform-mutation", "close-mutation", "umad", "cloning", "genesis"] {
            let op: VariationOperator = name.parse().unwrap();
            assert_eq!(op.name(), name);
            assert!(op.validate().is_ok());
        }
        assert!("crossover".parse::<VariationOperator>().is_err());
    }
}
