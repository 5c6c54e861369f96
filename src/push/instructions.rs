//! The process-wide instruction catalog.
//!
//! Built once on first use and read-only afterwards. Atoms refer to
//! instructions by `&'static Instruction`, so programs are cheap to clone
//! and compare.

mod code;
mod common;
mod exec;
mod io;
mod logical;
mod numeric;
mod text;
mod vector;

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::push::instruction::Instruction;
use crate::push::value::StackKind;

static CATALOG: LazyLock<InstructionSet> = LazyLock::new(InstructionSet::standard);

/// A named collection of instructions.
#[derive(Debug)]
pub struct InstructionSet {
    instructions: Vec<Instruction>,
    index: HashMap<String, usize>,
}

impl InstructionSet {
    fn standard() -> Self {
        let mut instructions = Vec::new();
        numeric::register(&mut instructions);
        logical::register(&mut instructions);
        text::register(&mut instructions);
        vector::register(&mut instructions);
        common::register(&mut instructions);
        exec::register(&mut instructions);
        code::register(&mut instructions);
        io::register(&mut instructions);

        let mut index = HashMap::with_capacity(instructions.len());
        for (i, instr) in instructions.iter().enumerate() {
            let previous = index.insert(instr.name().to_string(), i);
            debug_assert!(previous.is_none(), "duplicate instruction {}", instr.name());
        }
        Self {
            instructions,
            index,
        }
    }

    /// Instruction by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Instruction> {
        self.index.get(name).map(|&i| &self.instructions[i])
    }

    /// Every instruction, in registration order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// The standard catalog.
#[must_use]
pub fn catalog() -> &'static InstructionSet {
    &CATALOG
}

/// Look up a catalog instruction by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static Instruction> {
    CATALOG.get(name)
}

/// Every catalog instruction.
#[must_use]
pub fn all() -> Vec<&'static Instruction> {
    CATALOG.instructions.iter().collect()
}

/// Instructions whose stacks are all in `kinds` (exec is always allowed).
///
/// Used to build spawner alphabets for a problem's types.
#[must_use]
pub fn for_stacks(kinds: &[StackKind]) -> Vec<&'static Instruction> {
    CATALOG
        .instructions
        .iter()
        .filter(|instr| {
            instr
                .stacks()
                .iter()
                .all(|kind| *kind == StackKind::Exec || kinds.contains(kind))
        })
        .collect()
}

// ==================== Shared helpers ====================

/// Map a possibly negative index onto `0..len` by wrapping.
///
/// `len` must be positive.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub(crate) fn wrap_index(index: i64, len: usize) -> usize {
    index.rem_euclid(len as i64) as usize
}

/// Clamp an index into `0..=max`.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub(crate) fn clamp_index(index: i64, max: usize) -> usize {
    index.clamp(0, max as i64) as usize
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_core_families() {
        for name in [
            "int_add",
            "float_sin",
            "bool_xor",
            "str_concat",
            "vector_int_length",
            "exec_dup",
            "exec_do*range",
            "code_quote",
            "print_int",
            "print_newline",
        ] {
            assert!(lookup(name).is_some(), "{name} missing");
        }
        assert!(lookup("int_frobnicate").is_none());
        assert!(catalog().len() > 200);
    }

    #[test]
    fn test_for_stacks_filters() {
        let int_only = for_stacks(&[StackKind::Int]);
        assert!(int_only.iter().any(|i| i.name() == "int_add"));
        assert!(int_only.iter().any(|i| i.name() == "exec_dup"));
        assert!(!int_only.iter().any(|i| i.name() == "int_lt"));
        assert!(!int_only.iter().any(|i| i.name() == "str_length"));
        assert!(
            int_only
                .iter()
                .all(|i| i.stacks().iter().all(|k| matches!(k, StackKind::Int | StackKind::Exec)))
        );
    }

    #[test]
    fn test_index_helpers() {
        assert_eq!(wrap_index(-1, 3), 2);
        assert_eq!(wrap_index(7, 3), 1);
        assert_eq!(clamp_index(-5, 3), 0);
        assert_eq!(clamp_index(9, 3), 3);
    }
}
