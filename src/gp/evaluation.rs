//! Fitness evaluation: programs in, error vectors out.

// Integer distances are reported as f64 errors
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};

use crate::push::{Program, Value};

/// Scores a program. One error per fitness case; lower is better.
///
/// Implementations are shared across worker threads and must be pure: the
/// same program always yields the same error vector.
pub trait Evaluator: Send + Sync {
    /// Error vector for `program`.
    fn evaluate(&self, program: &Program) -> Vec<f64>;

    /// Length of every error vector this evaluator produces.
    fn error_vector_len(&self) -> usize;
}

/// One fitness case: inputs and expected outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Input register contents.
    pub inputs: Vec<Value>,
    /// Expected value for each declared output.
    pub expected: Vec<Value>,
}

impl Case {
    /// Build a case.
    #[must_use]
    pub fn new(inputs: Vec<Value>, expected: Vec<Value>) -> Self {
        Self { inputs, expected }
    }
}

/// Runs the program on every case and compares outputs with [`value_error`].
#[derive(Debug, Clone)]
pub struct DatasetEvaluator {
    cases: Vec<Case>,
    penalty: f64,
}

impl DatasetEvaluator {
    /// Evaluator with an infinite penalty for missing outputs.
    #[must_use]
    pub fn new(cases: Vec<Case>) -> Self {
        Self {
            cases,
            penalty: f64::INFINITY,
        }
    }

    /// Use a finite penalty for missing or mistyped outputs.
    #[must_use]
    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = penalty;
        self
    }

    /// Fitness cases.
    #[must_use]
    pub fn cases(&self) -> &[Case] {
        &self.cases
    }
}

impl Evaluator for DatasetEvaluator {
    fn evaluate(&self, program: &Program) -> Vec<f64> {
        let mut interpreter = program.interpreter();
        let mut errors = Vec::with_capacity(self.error_vector_len());
        for case in &self.cases {
            let outputs = program.apply_with(&mut interpreter, &case.inputs);
            for (i, expected) in case.expected.iter().enumerate() {
                let actual = outputs.get(i).and_then(Option::as_ref);
                errors.push(value_error(actual, expected, self.penalty));
            }
        }
        errors
    }

    fn error_vector_len(&self) -> usize {
        self.cases.iter().map(|c| c.expected.len()).sum()
    }
}

type ErrorFn = dyn Fn(&Program) -> Vec<f64> + Send + Sync;

/// Delegates scoring to a user function.
pub struct FunctionEvaluator {
    f: Box<ErrorFn>,
    len: usize,
}

impl FunctionEvaluator {
    /// Wrap `f`, which must always return `len` errors.
    pub fn new<F>(len: usize, f: F) -> Self
    where
        F: Fn(&Program) -> Vec<f64> + Send + Sync + 'static,
    {
        Self { f: Box::new(f), len }
    }
}

impl std::fmt::Debug for FunctionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionEvaluator")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl Evaluator for FunctionEvaluator {
    fn evaluate(&self, program: &Program) -> Vec<f64> {
        (self.f)(program)
            .into_iter()
            .map(|e| if e.is_nan() { f64::INFINITY } else { e })
            .collect()
    }

    fn error_vector_len(&self) -> usize {
        self.len
    }
}

/// Default error between an output and its expected value.
///
/// - missing output or mismatched type: `penalty`
/// - bool, char and code: 0 if equal, else 1
/// - numbers: absolute difference (ints and floats compare as f64)
/// - strings: Damerau-Levenshtein distance
/// - vectors: sum of element errors, plus `penalty` per missing or extra
///   element
///
/// Never returns NaN.
#[must_use]
pub fn value_error(actual: Option<&Value>, expected: &Value, penalty: f64) -> f64 {
    let Some(actual) = actual else {
        return penalty;
    };
    let error = match (actual, expected) {
        (Value::Bool(a), Value::Bool(b)) => mismatch(a == b),
        (Value::Char(a), Value::Char(b)) => mismatch(a == b),
        (Value::Code(a), Value::Code(b)) => mismatch(a == b),
        (Value::Int(a), Value::Int(b)) => (i128::from(*a) - i128::from(*b)).unsigned_abs() as f64,
        (Value::Int(a), Value::Float(b)) => (*a as f64 - b).abs(),
        (Value::Float(a), Value::Int(b)) => (a - *b as f64).abs(),
        (Value::Float(a), Value::Float(b)) => (a - b).abs(),
        (Value::Str(a), Value::Str(b)) => damerau_levenshtein(a, b) as f64,
        _ => match (actual.elements(), expected.elements()) {
            (Some(a), Some(b)) if actual.kind() == expected.kind() => {
                let shared: f64 = a
                    .iter()
                    .zip(&b)
                    .map(|(x, y)| value_error(Some(x), y, penalty))
                    .sum();
                let extra = a.len().abs_diff(b.len());
                if extra == 0 {
                    shared
                } else {
                    shared + penalty * extra as f64
                }
            }
            _ => penalty,
        },
    };
    if error.is_nan() { f64::INFINITY } else { error }
}

fn mismatch(equal: bool) -> f64 {
    if equal { 0.0 } else { 1.0 }
}

/// Edit distance with adjacent transpositions (optimal string alignment).
#[must_use]
pub fn damerau_levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }
    let width = m + 1;
    let mut d = vec![0usize; (n + 1) * width];
    for i in 0..=n {
        d[i * width] = i;
    }
    for (j, cell) in d.iter_mut().enumerate().take(width) {
        *cell = j;
    }
    for i in 1..=n {
        for j in 1..=m {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[(i - 1) * width + j] + 1)
                .min(d[i * width + j - 1] + 1)
                .min(d[(i - 1) * width + j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[(i - 2) * width + j - 2] + 1);
            }
            d[i * width + j] = best;
        }
    }
    d[n * width + m]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::{Atom, CodeBlock, OutputSpec, ProgramSignature, StackKind, instructions};

    #[test]
    fn test_damerau_levenshtein() {
        assert_eq!(damerau_levenshtein("", "abc"), 3);
        assert_eq!(damerau_levenshtein("kitten", "sitting"), 3);
        assert_eq!(damerau_levenshtein("ab", "ba"), 1);
        assert_eq!(damerau_levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_value_error_rules() {
        let inf = f64::INFINITY;
        assert_eq!(value_error(None, &Value::Int(1), inf), inf);
        assert_eq!(value_error(Some(&Value::Int(3)), &Value::Int(-2), inf), 5.0);
        assert_eq!(value_error(Some(&Value::Float(1.5)), &Value::Int(1), inf), 0.5);
        assert_eq!(value_error(Some(&Value::Bool(true)), &Value::Bool(false), inf), 1.0);
        assert_eq!(value_error(Some(&Value::Str("ab".into())), &Value::Str("b".into()), inf), 1.0);
        assert_eq!(value_error(Some(&Value::Bool(true)), &Value::Int(1), 100.0), 100.0);
        assert_eq!(
            value_error(Some(&Value::Int(i64::MIN)), &Value::Int(i64::MAX), inf),
            18_446_744_073_709_551_615.0
        );
    }

    #[test]
    fn test_vector_errors() {
        let expected = Value::VectorInt(vec![1, 2, 3]);
        assert_eq!(value_error(Some(&Value::VectorInt(vec![1, 2, 5])), &expected, 10.0), 2.0);
        assert_eq!(value_error(Some(&Value::VectorInt(vec![1, 2])), &expected, 10.0), 10.0);
        assert_eq!(
            value_error(Some(&Value::VectorFloat(vec![1.0, 2.0, 3.0])), &expected, 10.0),
            10.0
        );
    }

    #[test]
    fn test_dataset_evaluator() {
        let signature = ProgramSignature::new(1, vec![OutputSpec::Stack(StackKind::Int)]);
        let code = CodeBlock::new(vec![
            Atom::Input(0),
            Atom::Instruction(instructions::lookup("int_inc").unwrap()),
        ]);
        let program = Program::new(signature, code);
        let evaluator = DatasetEvaluator::new(vec![
            Case::new(vec![Value::Int(1)], vec![Value::Int(2)]),
            Case::new(vec![Value::Int(5)], vec![Value::Int(4)]),
            Case::new(vec![Value::Bool(true)], vec![Value::Int(0)]),
        ]);
        assert_eq!(evaluator.error_vector_len(), 3);
        assert_eq!(evaluator.evaluate(&program), vec![0.0, 2.0, f64::INFINITY]);
    }

    #[test]
    fn test_function_evaluator_sanitises_nan() {
        let evaluator = FunctionEvaluator::new(2, |_| vec![f64::NAN, 1.0]);
        let program = Program::new(ProgramSignature::new(0, vec![]), CodeBlock::default());
        assert_eq!(evaluator.evaluate(&program), vec![f64::INFINITY, 1.0]);
    }
}
