//! Printing to the stdout buffer.

use crate::push::instruction::Instruction;
use crate::push::value::StackKind;

pub(super) fn register(set: &mut Vec<Instruction>) {
    for kind in StackKind::ALL {
        if kind == StackKind::Exec {
            continue;
        }
        set.push(
            Instruction::state_to_state(format!("print_{}", kind.id()), vec![kind], move |state| {
                let Some(value) = state.stack_mut(kind).pop() else {
                    return false;
                };
                state.print(&value.to_string());
                true
            })
            .with_doc("Pop the top item and append its printed form to stdout."),
        );
    }
    set.push(Instruction::state_to_state("print_newline", vec![], |state| {
        state.print("\n")
    }));
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run, state_with};
    use crate::push::value::Value;

    #[test]
    fn test_print_values() {
        let mut state = state_with(&[Value::Float(2.0), Value::Int(1)]);
        assert!(run("print_int", &mut state));
        assert!(run("print_newline", &mut state));
        assert!(run("print_float", &mut state));
        assert_eq!(state.stdout(), "1\n2.0");
        assert!(!run("print_bool", &mut state));
    }

    #[test]
    fn test_print_vector() {
        let mut state = state_with(&[Value::VectorStr(vec!["a".into(), "b".into()])]);
        assert!(run("print_vector_str", &mut state));
        assert_eq!(state.stdout(), "[a b]");
    }
}
