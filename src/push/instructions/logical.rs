//! Boolean logic.

use crate::push::instruction::{Instruction, Outputs};
use crate::push::value::{StackKind, Value};

pub(super) fn register(set: &mut Vec<Instruction>) {
    set.push(bool_binary("bool_and", |a, b| a && b));
    set.push(bool_binary("bool_or", |a, b| a || b));
    set.push(bool_binary("bool_xor", |a, b| a != b));
    set.push(Instruction::simple(
        "bool_not",
        vec![StackKind::Bool],
        Outputs::Fixed(vec![StackKind::Bool]),
        |args| Some(vec![Value::Bool(!args[0].as_bool()?)]),
    ));
}

fn bool_binary(name: &str, op: fn(bool, bool) -> bool) -> Instruction {
    Instruction::simple(
        name,
        vec![StackKind::Bool, StackKind::Bool],
        Outputs::Fixed(vec![StackKind::Bool]),
        move |args| {
            let top = args[0].as_bool()?;
            let second = args[1].as_bool()?;
            Some(vec![Value::Bool(op(second, top))])
        },
    )
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{items, run, state_with};
    use super::*;

    #[test]
    fn test_truth_tables() {
        for (name, expected) in [
            ("bool_and", [false, false, false, true]),
            ("bool_or", [false, true, true, true]),
            ("bool_xor", [false, true, true, false]),
        ] {
            for (i, (a, b)) in [(false, false), (false, true), (true, false), (true, true)]
                .into_iter()
                .enumerate()
            {
                let mut state = state_with(&[Value::Bool(a), Value::Bool(b)]);
                assert!(run(name, &mut state));
                assert_eq!(items(&state, StackKind::Bool), vec![Value::Bool(expected[i])]);
            }
        }
    }

    #[test]
    fn test_not_missing_arg() {
        let mut state = state_with(&[]);
        assert!(!run("bool_not", &mut state));
        assert!(state.is_empty());
    }
}
