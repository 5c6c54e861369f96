//! Control flow on the exec stack.
//!
//! Nothing here recurses into the interpreter. Loops and combinators push
//! partially built blocks back onto exec and the main loop re-enters them.

use crate::push::atom::{Atom, CodeBlock};
use crate::push::instruction::{Instruction, Outputs};
use crate::push::state::State;
use crate::push::value::{StackKind, Value};

use StackKind::{Bool, Code, Exec, Int};

pub(super) fn register(set: &mut Vec<Instruction>) {
    set.push(Instruction::simple("exec_noop", vec![], Outputs::Fixed(vec![]), |_| {
        Some(vec![])
    }));

    // ==================== Loops ====================
    set.push(
        Instruction::state_to_state("exec_do*range", vec![Exec, Int], |state| {
            do_range(state, Exec)
        })
        .with_code_blocks(1)
        .with_doc(
            "Count from the second int to the top int inclusive. Each iteration pushes \
             the counter, then runs the body.",
        ),
    );
    set.push(
        Instruction::simple(
            "exec_do*count",
            vec![Exec, Int],
            Outputs::Fixed(vec![Exec]),
            |args| {
                let body = code(&args[0])?;
                counted_loop(body, args[1].as_int()?).map(|v| vec![v])
            },
        )
        .with_code_blocks(1),
    );
    set.push(
        Instruction::simple(
            "exec_do*times",
            vec![Exec, Int],
            Outputs::Fixed(vec![Exec]),
            |args| {
                let body = code(&args[0])?;
                let quiet = Atom::Block(CodeBlock::new(vec![Atom::instruction("int_pop")?, body]));
                counted_loop(quiet, args[1].as_int()?).map(|v| vec![v])
            },
        )
        .with_code_blocks(1)
        .with_doc("Run the body n times without leaving counters on the int stack."),
    );
    set.push(
        Instruction::simple("exec_while", vec![Exec, Bool], Outputs::Many(Exec), |args| {
            let body = code(&args[0])?;
            if !args[1].as_bool()? {
                return Some(vec![]);
            }
            let again = Atom::instruction("exec_while")?;
            Some(vec![block(vec![body.clone(), again, body])])
        })
        .with_code_blocks(1),
    );
    set.push(
        Instruction::simple("exec_do*while", vec![Exec], Outputs::Fixed(vec![Exec]), |args| {
            let body = code(&args[0])?;
            let again = Atom::instruction("exec_while")?;
            Some(vec![block(vec![body.clone(), again, body])])
        })
        .with_code_blocks(1),
    );

    // ==================== Conditionals ====================
    set.push(
        Instruction::simple(
            "exec_if",
            vec![Bool, Exec, Exec],
            Outputs::Fixed(vec![Exec]),
            |args| {
                let chosen = if args[0].as_bool()? { &args[1] } else { &args[2] };
                Some(vec![chosen.clone()])
            },
        )
        .with_code_blocks(2),
    );
    set.push(
        Instruction::simple("exec_when", vec![Bool, Exec], Outputs::Many(Exec), |args| {
            if args[0].as_bool()? {
                Some(vec![args[1].clone()])
            } else {
                Some(vec![])
            }
        })
        .with_code_blocks(1),
    );

    // ==================== Combinators ====================
    set.push(
        Instruction::simple("exec_k", vec![Exec, Exec], Outputs::Fixed(vec![Exec]), |args| {
            Some(vec![args[0].clone()])
        })
        .with_code_blocks(2),
    );
    set.push(
        Instruction::simple(
            "exec_s",
            vec![Exec, Exec, Exec],
            Outputs::Fixed(vec![Exec, Exec, Exec]),
            |args| {
                let (a, b, c) = (code(&args[0])?, code(&args[1])?, code(&args[2])?);
                Some(vec![block(vec![b, c.clone()]), Value::code(c), Value::code(a)])
            },
        )
        .with_code_blocks(3),
    );
    set.push(
        Instruction::simple("exec_y", vec![Exec], Outputs::Fixed(vec![Exec, Exec]), |args| {
            let body = code(&args[0])?;
            let again = Atom::instruction("exec_y")?;
            Some(vec![block(vec![again, body.clone()]), Value::code(body)])
        })
        .with_code_blocks(1),
    );
}

pub(super) fn code(value: &Value) -> Option<Atom> {
    value.as_code().cloned()
}

pub(super) fn block(atoms: Vec<Atom>) -> Value {
    Value::code(Atom::Block(CodeBlock::new(atoms)))
}

fn counted_loop(body: Atom, n: i64) -> Option<Value> {
    if n <= 0 {
        return None;
    }
    Some(block(vec![
        Atom::Literal(Value::Int(0)),
        Atom::Literal(Value::Int(n - 1)),
        Atom::instruction("exec_do*range")?,
        body,
    ]))
}

/// One iteration of a range loop whose body is on `body_kind`.
pub(super) fn do_range(state: &mut State, body_kind: StackKind) -> bool {
    debug_assert!(matches!(body_kind, Exec | Code));
    let kinds = [body_kind, Int, Int];
    let Some(args) = state.pop_many(&kinds) else {
        return false;
    };
    if let Some((values, out)) = range_step(&args)
        && state.push_many(values, &out)
    {
        return true;
    }
    state.restore(&kinds, args);
    false
}

fn range_step(args: &[Value]) -> Option<(Vec<Value>, Vec<StackKind>)> {
    let body = code(&args[0])?;
    let end = args[1].as_int()?;
    let start = args[2].as_int()?;
    if start == end {
        return Some((vec![Value::Int(start), Value::code(body)], vec![Int, Exec]));
    }
    let next = if start < end { start + 1 } else { start - 1 };
    let rest = block(vec![
        Atom::Literal(Value::Int(next)),
        Atom::Literal(Value::Int(end)),
        Atom::instruction("exec_do*range")?,
        body.clone(),
    ]);
    Some((
        vec![Value::Int(start), rest, Value::code(body)],
        vec![Int, Exec, Exec],
    ))
}
