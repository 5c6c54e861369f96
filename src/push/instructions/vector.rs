//! Instructions shared by every vector stack.

use crate::push::instruction::{Instruction, Outputs};
use crate::push::value::{StackKind, Value};

use super::wrap_index;
use StackKind::{Bool, Int};

pub(super) fn register(set: &mut Vec<Instruction>) {
    for kind in StackKind::VECTORS {
        let Some(element) = kind.element() else {
            continue;
        };
        register_vector(set, kind, element);
    }
}

fn register_vector(set: &mut Vec<Instruction>, kind: StackKind, element: StackKind) {
    let id = kind.id();
    let fixed = |outputs: Vec<StackKind>| Outputs::Fixed(outputs);

    set.push(Instruction::simple(
        format!("{id}_length"),
        vec![kind],
        fixed(vec![Int]),
        |args| {
            let n = args[0].elements()?.len();
            Some(vec![Value::Int(i64::try_from(n).ok()?)])
        },
    ));
    set.push(Instruction::simple(
        format!("{id}_concat"),
        vec![kind, kind],
        fixed(vec![kind]),
        move |args| {
            let mut joined = args[1].elements()?;
            joined.extend(args[0].elements()?);
            Value::vector(kind, joined).map(|v| vec![v])
        },
    ));
    set.push(Instruction::simple(
        format!("{id}_first"),
        vec![kind],
        fixed(vec![element]),
        |args| args[0].elements()?.into_iter().next().map(|v| vec![v]),
    ));
    set.push(Instruction::simple(
        format!("{id}_last"),
        vec![kind],
        fixed(vec![element]),
        |args| args[0].elements()?.pop().map(|v| vec![v]),
    ));
    set.push(Instruction::simple(
        format!("{id}_nth"),
        vec![kind, Int],
        fixed(vec![element]),
        |args| {
            let mut items = args[0].elements()?;
            if items.is_empty() {
                return None;
            }
            let i = wrap_index(args[1].as_int()?, items.len());
            Some(vec![items.swap_remove(i)])
        },
    ));
    set.push(Instruction::simple(
        format!("{id}_rest"),
        vec![kind],
        fixed(vec![kind]),
        move |args| {
            let items = args[0].elements()?;
            let rest = items.into_iter().skip(1).collect();
            Value::vector(kind, rest).map(|v| vec![v])
        },
    ));
    set.push(Instruction::simple(
        format!("{id}_butlast"),
        vec![kind],
        fixed(vec![kind]),
        move |args| {
            let mut items = args[0].elements()?;
            items.pop();
            Value::vector(kind, items).map(|v| vec![v])
        },
    ));
    set.push(Instruction::simple(
        format!("{id}_append"),
        vec![kind, element],
        fixed(vec![kind]),
        move |args| {
            let mut items = args[0].elements()?;
            items.push(args[1].clone());
            Value::vector(kind, items).map(|v| vec![v])
        },
    ));
    set.push(Instruction::simple(
        format!("{id}_reverse"),
        vec![kind],
        fixed(vec![kind]),
        move |args| {
            let mut items = args[0].elements()?;
            items.reverse();
            Value::vector(kind, items).map(|v| vec![v])
        },
    ));
    set.push(Instruction::simple(
        format!("{id}_contains"),
        vec![kind, element],
        fixed(vec![Bool]),
        |args| {
            let items = args[0].elements()?;
            Some(vec![Value::Bool(items.contains(&args[1]))])
        },
    ));
    set.push(Instruction::simple(
        format!("{id}_take"),
        vec![kind, Int],
        fixed(vec![kind]),
        move |args| {
            let mut items = args[0].elements()?;
            let n = wrap_index(args[1].as_int()?, items.len() + 1);
            items.truncate(n);
            Value::vector(kind, items).map(|v| vec![v])
        },
    ));
    set.push(
        Instruction::simple(format!("{id}_push_all"), vec![kind], Outputs::Many(element), |args| {
            let mut items = args[0].elements()?;
            items.reverse();
            Some(items)
        })
        .with_doc("Push every element so the first element ends on top."),
    );
    set.push(Instruction::simple(
        format!("{id}_empty_vector"),
        vec![],
        fixed(vec![kind]),
        move |_| Value::vector(kind, Vec::new()).map(|v| vec![v]),
    ));
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{items, run, state_with};
    use super::*;
    use StackKind::VectorInt;

    #[test]
    fn test_concat_and_length() {
        let mut state = state_with(&[Value::VectorInt(vec![1, 2]), Value::VectorInt(vec![3])]);
        assert!(run("vector_int_concat", &mut state));
        assert_eq!(items(&state, VectorInt), vec![Value::VectorInt(vec![1, 2, 3])]);
        assert!(run("vector_int_length", &mut state));
        assert_eq!(items(&state, Int), vec![Value::Int(3)]);
    }

    #[test]
    fn test_first_of_empty_is_noop() {
        let mut state = state_with(&[Value::VectorStr(vec![])]);
        assert!(!run("vector_str_first", &mut state));
        assert_eq!(state.depth(StackKind::VectorStr), 1);
    }

    #[test]
    fn test_nth_wraps() {
        let mut state = state_with(&[Value::VectorFloat(vec![1.5, 2.5]), Value::Int(-1)]);
        assert!(run("vector_float_nth", &mut state));
        assert_eq!(items(&state, StackKind::Float), vec![Value::Float(2.5)]);
    }

    #[test]
    fn test_push_all_order() {
        let mut state = state_with(&[Value::VectorBool(vec![true, false])]);
        assert!(run("vector_bool_push_all", &mut state));
        assert_eq!(items(&state, Bool), vec![Value::Bool(false), Value::Bool(true)]);
    }

    #[test]
    fn test_append_and_contains() {
        let mut state = state_with(&[Value::VectorInt(vec![1]), Value::Int(7)]);
        assert!(run("vector_int_append", &mut state));
        assert_eq!(items(&state, VectorInt), vec![Value::VectorInt(vec![1, 7])]);
        state.push(Value::Int(7));
        assert!(run("vector_int_contains", &mut state));
        assert_eq!(items(&state, Bool), vec![Value::Bool(true)]);
    }
}
