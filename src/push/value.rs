//! Value variants and the stack registry.
//!
//! Every value the VM handles is a [`Value`]; every value maps to exactly one
//! [`StackKind`]. The set of kinds is closed.

// Magnitude clamping converts between f64 limits and i64 values on purpose
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::push::atom::Atom;
use crate::push::stack::StackLimits;

/// Identifier of a typed stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackKind {
    /// Execution queue.
    Exec,
    /// Quoted code.
    Code,
    /// Booleans.
    Bool,
    /// Signed 64-bit integers.
    Int,
    /// IEEE-754 doubles.
    Float,
    /// Single code points.
    Char,
    /// Strings.
    Str,
    /// Vectors of booleans.
    VectorBool,
    /// Vectors of integers.
    VectorInt,
    /// Vectors of floats.
    VectorFloat,
    /// Vectors of strings.
    VectorStr,
}

impl StackKind {
    /// Number of stack kinds.
    pub const COUNT: usize = 11;

    /// Every stack kind, in registry order.
    pub const ALL: [StackKind; Self::COUNT] = [
        StackKind::Exec,
        StackKind::Code,
        StackKind::Bool,
        StackKind::Int,
        StackKind::Float,
        StackKind::Char,
        StackKind::Str,
        StackKind::VectorBool,
        StackKind::VectorInt,
        StackKind::VectorFloat,
        StackKind::VectorStr,
    ];

    /// The vector kinds.
    pub const VECTORS: [StackKind; 4] = [
        StackKind::VectorBool,
        StackKind::VectorInt,
        StackKind::VectorFloat,
        StackKind::VectorStr,
    ];

    /// Canonical stack identifier, used in instruction names.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            StackKind::Exec => "exec",
            StackKind::Code => "code",
            StackKind::Bool => "bool",
            StackKind::Int => "int",
            StackKind::Float => "float",
            StackKind::Char => "char",
            StackKind::Str => "str",
            StackKind::VectorBool => "vector_bool",
            StackKind::VectorInt => "vector_int",
            StackKind::VectorFloat => "vector_float",
            StackKind::VectorStr => "vector_str",
        }
    }

    /// Position of this kind in [`StackKind::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Element kind of a vector kind.
    #[must_use]
    pub fn element(self) -> Option<StackKind> {
        match self {
            StackKind::VectorBool => Some(StackKind::Bool),
            StackKind::VectorInt => Some(StackKind::Int),
            StackKind::VectorFloat => Some(StackKind::Float),
            StackKind::VectorStr => Some(StackKind::Str),
            _ => None,
        }
    }

    /// Whether values of this kind hold code.
    #[must_use]
    pub fn holds_code(self) -> bool {
        matches!(self, StackKind::Exec | StackKind::Code)
    }

    /// Whether a value may be pushed onto a stack of this kind.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match value {
            Value::Code(_) => self.holds_code(),
            other => other.kind() == self,
        }
    }
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for StackKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StackKind::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| ConfigError::UnknownStack(s.to_string()))
    }
}

/// A value the VM can hold on a stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Single character.
    Char(char),
    /// String.
    Str(String),
    /// A piece of code (exec and code stacks).
    Code(Box<Atom>),
    /// Vector of booleans.
    VectorBool(Vec<bool>),
    /// Vector of integers.
    VectorInt(Vec<i64>),
    /// Vector of floats.
    VectorFloat(Vec<f64>),
    /// Vector of strings.
    VectorStr(Vec<String>),
}

impl Value {
    /// The stack this value is routed to when executed as a literal.
    #[must_use]
    pub fn kind(&self) -> StackKind {
        match self {
            Value::Bool(_) => StackKind::Bool,
            Value::Int(_) => StackKind::Int,
            Value::Float(_) => StackKind::Float,
            Value::Char(_) => StackKind::Char,
            Value::Str(_) => StackKind::Str,
            Value::Code(_) => StackKind::Code,
            Value::VectorBool(_) => StackKind::VectorBool,
            Value::VectorInt(_) => StackKind::VectorInt,
            Value::VectorFloat(_) => StackKind::VectorFloat,
            Value::VectorStr(_) => StackKind::VectorStr,
        }
    }

    /// Wrap an atom as a code value.
    #[must_use]
    pub fn code(atom: Atom) -> Self {
        Value::Code(Box::new(atom))
    }

    /// Integer payload, if any.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float payload, if any.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean payload, if any.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Code payload, if any.
    #[must_use]
    pub fn as_code(&self) -> Option<&Atom> {
        match self {
            Value::Code(atom) => Some(atom),
            _ => None,
        }
    }

    /// Split a vector value into its elements.
    #[must_use]
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::VectorBool(v) => Some(v.iter().copied().map(Value::Bool).collect()),
            Value::VectorInt(v) => Some(v.iter().copied().map(Value::Int).collect()),
            Value::VectorFloat(v) => Some(v.iter().copied().map(Value::Float).collect()),
            Value::VectorStr(v) => Some(v.iter().cloned().map(Value::Str).collect()),
            _ => None,
        }
    }

    /// Build a vector value of `kind` from elements.
    ///
    /// Returns `None` if `kind` is not a vector kind or any element has the
    /// wrong type.
    #[must_use]
    pub fn vector(kind: StackKind, elements: Vec<Value>) -> Option<Value> {
        match kind {
            StackKind::VectorBool => elements
                .into_iter()
                .map(|e| e.as_bool())
                .collect::<Option<Vec<_>>>()
                .map(Value::VectorBool),
            StackKind::VectorInt => elements
                .into_iter()
                .map(|e| e.as_int())
                .collect::<Option<Vec<_>>>()
                .map(Value::VectorInt),
            StackKind::VectorFloat => elements
                .into_iter()
                .map(|e| e.as_float())
                .collect::<Option<Vec<_>>>()
                .map(Value::VectorFloat),
            StackKind::VectorStr => elements
                .into_iter()
                .map(|e| match e {
                    Value::Str(s) => Some(s),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(Value::VectorStr),
            _ => None,
        }
    }

    /// Apply per-value limits before the value lands on a stack.
    ///
    /// Numbers are clamped to the magnitude limit, collections are truncated
    /// to the collection limit. Returns `None` for NaN, which no stack holds.
    #[must_use]
    pub fn limited(self, limits: &StackLimits) -> Option<Value> {
        let magnitude = limits.number_magnitude;
        let size = limits.collection_size;
        match self {
            Value::Int(i) => Some(Value::Int(clamp_int(i, magnitude))),
            Value::Float(f) => clamp_float(f, magnitude).map(Value::Float),
            Value::Str(s) => Some(Value::Str(truncate_chars(s, size))),
            Value::Code(atom) => match *atom {
                Atom::Block(mut block) => {
                    block.truncate_points(size);
                    Some(Value::code(Atom::Block(block)))
                }
                other => Some(Value::code(other)),
            },
            Value::VectorBool(mut v) => {
                v.truncate(size);
                Some(Value::VectorBool(v))
            }
            Value::VectorInt(mut v) => {
                v.truncate(size);
                Some(Value::VectorInt(
                    v.into_iter().map(|i| clamp_int(i, magnitude)).collect(),
                ))
            }
            Value::VectorFloat(mut v) => {
                v.truncate(size);
                v.into_iter()
                    .map(|f| clamp_float(f, magnitude))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::VectorFloat)
            }
            Value::VectorStr(mut v) => {
                v.truncate(size);
                Some(Value::VectorStr(
                    v.into_iter().map(|s| truncate_chars(s, size)).collect(),
                ))
            }
            other @ (Value::Bool(_) | Value::Char(_)) => Some(other),
        }
    }
}

fn clamp_int(i: i64, magnitude: f64) -> i64 {
    // `as` saturates for out-of-range floats
    let limit = magnitude.abs() as i64;
    i.clamp(-limit, limit)
}

fn clamp_float(f: f64, magnitude: f64) -> Option<f64> {
    if f.is_nan() {
        None
    } else {
        Some(f.clamp(-magnitude.abs(), magnitude.abs()))
    }
}

fn truncate_chars(s: String, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((byte_index, _)) => s[..byte_index].to_string(),
        None => s,
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

/// Printed form, as produced by the `print_*` instructions.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => f.write_str(s),
            Value::Code(atom) => write!(f, "{atom}"),
            Value::VectorBool(v) => write_joined(f, v),
            Value::VectorInt(v) => write_joined(f, v),
            Value::VectorFloat(v) => {
                let printed: Vec<String> = v.iter().map(|x| format!("{x:?}")).collect();
                write_joined(f, &printed)
            }
            Value::VectorStr(v) => write_joined(f, v),
        }
    }
}
