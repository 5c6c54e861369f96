//! Stack manipulation available on every stack.
//!
//! On the exec stack these instructions also open blocks in translation,
//! one per exec item they consume.

use crate::push::instruction::{Instruction, Outputs};
use crate::push::state::State;
use crate::push::value::{StackKind, Value};

use super::clamp_index;
use StackKind::{Bool, Exec, Int};

pub(super) fn register(set: &mut Vec<Instruction>) {
    for kind in StackKind::ALL {
        register_stack(set, kind);
    }
}

fn exec_blocks(kind: StackKind, blocks: u8) -> u8 {
    if kind == Exec { blocks } else { 0 }
}

fn register_stack(set: &mut Vec<Instruction>, kind: StackKind) {
    let id = kind.id();

    set.push(
        Instruction::simple(format!("{id}_pop"), vec![kind], Outputs::Fixed(vec![]), |_| {
            Some(vec![])
        })
        .with_code_blocks(exec_blocks(kind, 1)),
    );
    set.push(
        Instruction::simple(
            format!("{id}_dup"),
            vec![kind],
            Outputs::Fixed(vec![kind, kind]),
            |args| Some(vec![args[0].clone(), args[0].clone()]),
        )
        .with_code_blocks(exec_blocks(kind, 1)),
    );
    set.push(
        Instruction::simple(
            format!("{id}_swap"),
            vec![kind, kind],
            Outputs::Fixed(vec![kind, kind]),
            |args| Some(vec![args[0].clone(), args[1].clone()]),
        )
        .with_code_blocks(exec_blocks(kind, 2)),
    );
    set.push(
        Instruction::simple(
            format!("{id}_rot"),
            vec![kind, kind, kind],
            Outputs::Fixed(vec![kind, kind, kind]),
            // third item moves to the top
            |args| Some(vec![args[1].clone(), args[0].clone(), args[2].clone()]),
        )
        .with_code_blocks(exec_blocks(kind, 3)),
    );
    set.push(Instruction::state_to_state(
        format!("{id}_flush"),
        vec![kind],
        move |state| {
            state.stack_mut(kind).flush();
            true
        },
    ));
    set.push(Instruction::takes_state(
        format!("{id}_stack_depth"),
        vec![],
        Outputs::Fixed(vec![Int]),
        move |state, _| {
            let depth = i64::try_from(state.depth(kind)).ok()?;
            Some(vec![Value::Int(depth)])
        },
    ));
    set.push(Instruction::simple(
        format!("{id}_eq"),
        vec![kind, kind],
        Outputs::Fixed(vec![Bool]),
        |args| Some(vec![Value::Bool(args[0] == args[1])]),
    ));
    set.push(Instruction::takes_state(
        format!("{id}_is_empty"),
        vec![],
        Outputs::Fixed(vec![Bool]),
        move |state, _| Some(vec![Value::Bool(state.depth(kind) == 0)]),
    ));
    set.push(
        Instruction::state_to_state(format!("{id}_yank"), vec![kind, Int], move |state| {
            move_to_top(state, kind, false)
        })
        .with_doc("Move the item at the popped int's depth to the top."),
    );
    set.push(
        Instruction::state_to_state(format!("{id}_yankdup"), vec![kind, Int], move |state| {
            move_to_top(state, kind, true)
        })
        .with_doc("Copy the item at the popped int's depth to the top."),
    );
    set.push(
        Instruction::state_to_state(format!("{id}_shove"), vec![kind, Int], move |state| {
            shove(state, kind)
        })
        .with_doc("Move the top item down to the popped int's depth.")
        .with_code_blocks(exec_blocks(kind, 1)),
    );
}

/// Items available below an int index argument.
fn depth_after_index(state: &State, kind: StackKind) -> Option<(i64, usize)> {
    let index = state.stack(Int).top()?.as_int()?;
    let depth = state.depth(kind) - usize::from(kind == Int);
    Some((index, depth))
}

fn move_to_top(state: &mut State, kind: StackKind, keep: bool) -> bool {
    let Some((index, depth)) = depth_after_index(state, kind) else {
        return false;
    };
    if depth == 0 {
        return false;
    }
    // popping the index frees the slot a duplicate needs
    state.stack_mut(Int).pop();
    let k = clamp_index(index, depth - 1);
    let stack = state.stack_mut(kind);
    let value = if keep {
        stack.nth(k).cloned()
    } else {
        stack.remove_nth(k)
    };
    match value {
        Some(value) => stack.push(value),
        None => false,
    }
}

fn shove(state: &mut State, kind: StackKind) -> bool {
    let Some((index, depth)) = depth_after_index(state, kind) else {
        return false;
    };
    if depth == 0 {
        return false;
    }
    state.stack_mut(Int).pop();
    let stack = state.stack_mut(kind);
    let Some(value) = stack.pop() else {
        return false;
    };
    let k = clamp_index(index, depth - 1);
    stack.insert(k, value)
}
