//! Parent selection.
//!
//! Every method picks from the evaluated part of a [`Population`] and
//! returns references into it, so the selected individuals are always
//! population members.

// Selection uses intentional casts for statistics
#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;
use std::str::FromStr;

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::{SliceRandom, index};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gp::individual::{Individual, Population};

/// Tolerance around the per-case best in lexicase filtering.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Epsilon {
    /// Exact ties only.
    #[default]
    Zero,
    /// The same tolerance on every case.
    Fixed(f64),
    /// Per-case median absolute deviation of the population's errors.
    Auto,
}

/// How parents are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SelectionMethod {
    /// Probability proportional to `(sum - total) / sum`.
    FitnessProportionate,
    /// Best of `size` distinct random individuals.
    Tournament {
        /// Competitors per tournament.
        size: usize,
    },
    /// The best individuals, cycled if more are requested.
    Elite,
    /// Filter by shuffled cases, keeping those within epsilon of the best.
    Lexicase {
        /// Filtering tolerance.
        #[serde(default)]
        epsilon: Epsilon,
    },
}

impl Default for SelectionMethod {
    fn default() -> Self {
        SelectionMethod::Lexicase {
            epsilon: Epsilon::Zero,
        }
    }
}

impl FromStr for SelectionMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lexicase" => Ok(SelectionMethod::Lexicase {
                epsilon: Epsilon::Zero,
            }),
            "epsilon-lexicase" => Ok(SelectionMethod::Lexicase {
                epsilon: Epsilon::Auto,
            }),
            "tournament" => Ok(SelectionMethod::Tournament { size: 7 }),
            "elite" => Ok(SelectionMethod::Elite),
            "fitness-proportionate" => Ok(SelectionMethod::FitnessProportionate),
            _ => Err(ConfigError::UnknownSelector(s.to_string())),
        }
    }
}

impl SelectionMethod {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SelectionMethod::FitnessProportionate => "fitness-proportionate",
            SelectionMethod::Tournament { .. } => "tournament",
            SelectionMethod::Elite => "elite",
            SelectionMethod::Lexicase {
                epsilon: Epsilon::Zero,
            } => "lexicase",
            SelectionMethod::Lexicase { .. } => "epsilon-lexicase",
        }
    }

    /// Check parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyTournament`] for a zero-size tournament
    /// and [`ConfigError::InvalidParameter`] for a negative or non-finite
    /// fixed epsilon.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            SelectionMethod::Tournament { size: 0 } => Err(ConfigError::EmptyTournament),
            SelectionMethod::Lexicase {
                epsilon: Epsilon::Fixed(e),
            } if !e.is_finite() || *e < 0.0 => Err(ConfigError::InvalidParameter {
                name: "epsilon",
                value: *e,
            }),
            _ => Ok(()),
        }
    }

    /// Select `n` individuals, with replacement.
    ///
    /// Returns fewer only when nothing has been evaluated yet.
    pub fn select<'a, R: Rng>(
        &self,
        population: &'a Population,
        n: usize,
        rng: &mut R,
    ) -> Vec<&'a Individual> {
        let pool = population.evaluated();
        if pool.is_empty() {
            return Vec::new();
        }
        match self {
            SelectionMethod::Elite => (0..n).map(|i| &pool[i % pool.len()]).collect(),
            SelectionMethod::Tournament { size } => (0..n)
                .map(|_| tournament(pool, *size, rng))
                .collect(),
            SelectionMethod::FitnessProportionate => fitness_proportionate(pool, n, rng),
            SelectionMethod::Lexicase { epsilon } => Lexicase::new(pool, *epsilon).select(n, rng),
        }
    }
}

/// `pool` is sorted best-first, so the smallest sampled index wins.
fn tournament<'a, R: Rng>(pool: &'a [Individual], size: usize, rng: &mut R) -> &'a Individual {
    let k = size.clamp(1, pool.len());
    let winner = index::sample(rng, pool.len(), k)
        .into_iter()
        .min()
        .unwrap_or(0);
    &pool[winner]
}

fn fitness_proportionate<'a, R: Rng>(
    pool: &'a [Individual],
    n: usize,
    rng: &mut R,
) -> Vec<&'a Individual> {
    let sum: f64 = pool
        .iter()
        .map(Individual::total_error)
        .filter(|t| t.is_finite())
        .sum();
    let weights: Vec<f64> = pool
        .iter()
        .map(|i| {
            let t = i.total_error();
            if t.is_finite() && sum > 0.0 && sum.is_finite() {
                (sum - t) / sum
            } else {
                0.0
            }
        })
        .collect();
    match WeightedIndex::new(&weights) {
        Ok(dist) => (0..n).map(|_| &pool[dist.sample(rng)]).collect(),
        // all weights zero: every finite individual is equally good
        Err(_) => (0..n).map(|_| &pool[rng.gen_range(0..pool.len())]).collect(),
    }
}

/// Individuals grouped by identical error vectors.
struct Lexicase<'a> {
    groups: Vec<Vec<&'a Individual>>,
    errors: Vec<&'a [f64]>,
    epsilon: Vec<f64>,
    cases: usize,
}

impl<'a> Lexicase<'a> {
    fn new(pool: &'a [Individual], epsilon: Epsilon) -> Self {
        let mut groups: Vec<Vec<&'a Individual>> = Vec::new();
        let mut errors: Vec<&'a [f64]> = Vec::new();
        let mut seen: HashMap<Vec<u64>, usize> = HashMap::new();
        for individual in pool {
            let vector = individual.error_vector().unwrap_or(&[]);
            let key: Vec<u64> = vector.iter().map(|e| e.to_bits()).collect();
            let slot = *seen.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                errors.push(vector);
                groups.len() - 1
            });
            groups[slot].push(individual);
        }

        let cases = errors.iter().map(|e| e.len()).max().unwrap_or(0);
        let epsilon = match epsilon {
            Epsilon::Zero => vec![0.0; cases],
            Epsilon::Fixed(e) => vec![e; cases],
            Epsilon::Auto => (0..cases)
                .map(|case| {
                    let column: Vec<f64> = pool
                        .iter()
                        .map(|i| case_error(i.error_vector().unwrap_or(&[]), case))
                        .collect();
                    median_absolute_deviation(&column)
                })
                .collect(),
        };

        Self {
            groups,
            errors,
            epsilon,
            cases,
        }
    }

    fn select<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<&'a Individual> {
        let mut order: Vec<usize> = (0..self.cases).collect();
        let mut candidates: Vec<usize> = Vec::with_capacity(self.groups.len());
        let mut selected = Vec::with_capacity(n);

        for _ in 0..n {
            order.shuffle(rng);
            candidates.clear();
            candidates.extend(0..self.groups.len());

            for &case in &order {
                if candidates.len() <= 1 {
                    break;
                }
                let best = candidates
                    .iter()
                    .map(|&g| case_error(self.errors[g], case))
                    .fold(f64::INFINITY, f64::min);
                let threshold = best + self.epsilon[case];
                candidates.retain(|&g| case_error(self.errors[g], case) <= threshold);
            }

            let group = &self.groups[candidates[rng.gen_range(0..candidates.len())]];
            selected.push(group[rng.gen_range(0..group.len())]);
        }
        selected
    }
}

fn case_error(errors: &[f64], case: usize) -> f64 {
    errors.get(case).copied().unwrap_or(f64::INFINITY)
}

/// Median absolute deviation of the finite values; 0 if there are none.
fn median_absolute_deviation(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let Some(center) = median(finite.clone()) else {
        return 0.0;
    };
    median(finite.iter().map(|v| (v - center).abs()).collect()).unwrap_or(0.0)
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(f64::midpoint(values[mid - 1], values[mid]))
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::genome::{Gene, Genome};
    use crate::push::{Atom, OutputSpec, ProgramSignature, StackKind, Value};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    /// Each individual carries a one-gene genome tagging its position.
    fn population(errors: &[Vec<f64>]) -> Population {
        let signature = ProgramSignature::new(0, vec![OutputSpec::Stack(StackKind::Int)]);
        errors
            .iter()
            .enumerate()
            .map(|(tag, e)| {
                let genome = Genome::new(vec![Gene::new(Atom::Literal(Value::Int(tag as i64)))]);
                Individual::new(genome, &signature).with_errors(e.clone())
            })
            .collect()
    }

    fn tag(individual: &Individual) -> i64 {
        match &individual.genome().genes()[0].atom {
            Atom::Literal(Value::Int(t)) => *t,
            other => panic!("unexpected atom {other:?}"),
        }
    }

    #[test]
    fn test_lexicase_never_picks_dominated() {
        let population = population(&[vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]]);
        let mut rng = SmallRng::seed_from_u64(42);
        let picks = SelectionMethod::default().select(&population, 500, &mut rng);
        assert_eq!(picks.len(), 500);
        assert!(picks.iter().all(|i| tag(i) != 2));
        assert!(picks.iter().any(|i| tag(i) == 0));
        assert!(picks.iter().any(|i| tag(i) == 1));
    }

    #[test]
    fn test_lexicase_specialist_survives() {
        // only individual 3 solves case 2
        let population = population(&[
            vec![0.0, 0.0, 5.0],
            vec![0.0, 0.0, 5.0],
            vec![0.0, 1.0, 5.0],
            vec![9.0, 9.0, 0.0],
        ]);
        let mut rng = SmallRng::seed_from_u64(7);
        let picks = SelectionMethod::default().select(&population, 300, &mut rng);
        assert!(picks.iter().any(|i| tag(i) == 3));
        assert!(picks.iter().all(|i| tag(i) != 2));
    }

    #[test]
    fn test_epsilon_lexicase_keeps_near_ties() {
        let population = population(&[vec![0.0], vec![0.5], vec![10.0]]);
        let method = SelectionMethod::Lexicase {
            epsilon: Epsilon::Fixed(1.0),
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let picks = method.select(&population, 200, &mut rng);
        assert!(picks.iter().any(|i| tag(i) == 1));
        assert!(picks.iter().all(|i| tag(i) != 2));
    }

    #[test]
    fn test_median_absolute_deviation() {
        assert_eq!(median_absolute_deviation(&[1.0, 2.0, 3.0, 4.0, 100.0]), 1.0);
        assert_eq!(median_absolute_deviation(&[f64::INFINITY]), 0.0);
        assert_eq!(median_absolute_deviation(&[2.0, 4.0, f64::INFINITY]), 1.0);
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let population = population(&[vec![0.1], vec![0.5], vec![0.9], vec![0.2], vec![0.8]]);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut counts = [0usize; 5];
        for pick in (SelectionMethod::Tournament { size: 3 }).select(&population, 1000, &mut rng) {
            counts[usize::try_from(tag(pick)).unwrap()] += 1;
        }
        let max_idx = counts.iter().enumerate().max_by_key(|(_, c)| *c).unwrap().0;
        assert_eq!(max_idx, 0);
        // a full-size tournament always returns the best
        let picks = SelectionMethod::Tournament { size: 5 }.select(&population, 20, &mut rng);
        assert!(picks.iter().all(|i| tag(i) == 0));
    }

    #[test]
    fn test_elite_cycles_best() {
        let population = population(&[vec![3.0], vec![1.0], vec![2.0]]);
        let mut rng = SmallRng::seed_from_u64(0);
        let picks = SelectionMethod::Elite.select(&population, 4, &mut rng);
        let tags: Vec<i64> = picks.iter().map(|i| tag(i)).collect();
        assert_eq!(tags, vec![1, 2, 0, 1]);
    }

    #[test]
    fn test_fitness_proportionate_handles_infinite() {
        let population = population(&[vec![1.0], vec![9.0], vec![f64::INFINITY]]);
        let mut rng = SmallRng::seed_from_u64(5);
        let picks = SelectionMethod::FitnessProportionate.select(&population, 400, &mut rng);
        let zero = picks.iter().filter(|i| tag(i) == 0).count();
        assert!(picks.iter().all(|i| tag(i) != 2));
        assert!(zero > 300);

        let all_inf = population_all_inf();
        let picks = SelectionMethod::FitnessProportionate.select(&all_inf, 10, &mut rng);
        assert_eq!(picks.len(), 10);
    }

    fn population_all_inf() -> Population {
        population(&[vec![f64::INFINITY], vec![f64::INFINITY]])
    }

    #[test]
    fn test_empty_population_selects_nothing() {
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(SelectionMethod::default().select(&Population::new(), 3, &mut rng).is_empty());
    }

    #[test]
    fn test_names_and_validation() {
        for name in ["lexicase", "epsilon-lexicase", "tournament", "elite", "fitness-proportionate"] {
            assert_eq!(name.parse::<SelectionMethod>().unwrap().name(), name);
        }
        assert_eq!(
            "roulette".parse::<SelectionMethod>().unwrap_err(),
            ConfigError::UnknownSelector("roulette".into())
        );
        assert!(SelectionMethod::Tournament { size: 0 }.validate().is_err());
        assert!(SelectionMethod::Lexicase { epsilon: Epsilon::Fixed(-1.0) }.validate().is_err());
        assert!(SelectionMethod::default().validate().is_ok());
    }

    #[test]
    fn test_serde_form() {
        let json = serde_json::to_value(SelectionMethod::Tournament { size: 4 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "tournament", "size": 4}));
        let back: SelectionMethod =
            serde_json::from_value(serde_json::json!({"kind": "lexicase", "epsilon": "auto"}))
                .unwrap();
        assert_eq!(back, SelectionMethod::Lexicase { epsilon: Epsilon::Auto });
    }
}
