//! Code quoting and list primitives over the code stack.

use crate::push::atom::{Atom, CodeBlock};
use crate::push::instruction::{Instruction, Outputs};
use crate::push::value::{StackKind, Value};

use super::exec::{block, code, do_range};
use StackKind::{Bool, Char, Code, Exec, Float, Int, Str};

pub(super) fn register(set: &mut Vec<Instruction>) {
    set.push(
        Instruction::simple("code_quote", vec![Exec], Outputs::Fixed(vec![Code]), |args| {
            Some(vec![args[0].clone()])
        })
        .with_code_blocks(1)
        .with_doc("Move the next exec item onto the code stack."),
    );

    // ==================== Execution ====================
    set.push(Instruction::simple(
        "code_do*",
        vec![Code],
        Outputs::Fixed(vec![Exec]),
        |args| Some(vec![args[0].clone()]),
    ));
    set.push(
        Instruction::simple(
            "code_do",
            vec![Code],
            Outputs::Fixed(vec![Code, Exec]),
            |args| {
                let body = code(&args[0])?;
                let pop = Atom::instruction("code_pop")?;
                Some(vec![args[0].clone(), block(vec![body, pop])])
            },
        )
        .with_doc("Run the top code item, then pop it from the code stack."),
    );
    set.push(Instruction::state_to_state(
        "code_do*range",
        vec![Code, Int, Exec],
        |state| do_range(state, Code),
    ));

    // ==================== List primitives ====================
    set.push(code_binary("code_append", |top, second| {
        let mut atoms = as_list(top);
        atoms.extend(as_list(second));
        Atom::Block(CodeBlock::new(atoms))
    }));
    set.push(code_binary("code_cons", |top, second| {
        let mut atoms = vec![second];
        atoms.extend(as_list(top));
        Atom::Block(CodeBlock::new(atoms))
    }));
    set.push(code_binary("code_list", |top, second| {
        Atom::Block(CodeBlock::new(vec![second, top]))
    }));
    set.push(code_unary("code_wrap", |c| Atom::Block(CodeBlock::new(vec![c]))));
    set.push(code_unary("code_car", |c| match c {
        Atom::Block(b) => b
            .into_atoms()
            .into_iter()
            .next()
            .unwrap_or_else(|| Atom::Block(CodeBlock::default())),
        other => other,
    }));
    set.push(code_unary("code_cdr", |c| match c {
        Atom::Block(b) => Atom::Block(CodeBlock::new(b.into_atoms().into_iter().skip(1).collect())),
        _ => Atom::Block(CodeBlock::default()),
    }));
    set.push(Instruction::simple(
        "code_atom",
        vec![Code],
        Outputs::Fixed(vec![Bool]),
        |args| {
            let c = args[0].as_code()?;
            Some(vec![Value::Bool(!matches!(c, Atom::Block(_)))])
        },
    ));
    set.push(Instruction::simple(
        "code_length",
        vec![Code],
        Outputs::Fixed(vec![Int]),
        |args| {
            let n = match args[0].as_code()? {
                Atom::Block(b) => b.len(),
                _ => 1,
            };
            Some(vec![Value::Int(i64::try_from(n).ok()?)])
        },
    ));

    // ==================== Quoting literals ====================
    for kind in [Bool, Int, Float, Char, Str] {
        set.push(Instruction::simple(
            format!("code_from_{}", kind.id()),
            vec![kind],
            Outputs::Fixed(vec![Code]),
            |args| Some(vec![Value::code(Atom::Literal(args[0].clone()))]),
        ));
    }
}

fn as_list(atom: Atom) -> Vec<Atom> {
    match atom {
        Atom::Block(b) => b.into_atoms(),
        other => vec![other],
    }
}

fn code_unary(name: &str, op: fn(Atom) -> Atom) -> Instruction {
    Instruction::simple(name, vec![Code], Outputs::Fixed(vec![Code]), move |args| {
        Some(vec![Value::code(op(code(&args[0])?))])
    })
}

fn code_binary(name: &str, op: fn(Atom, Atom) -> Atom) -> Instruction {
    Instruction::simple(
        name,
        vec![Code, Code],
        Outputs::Fixed(vec![Code]),
        move |args| Some(vec![Value::code(op(code(&args[0])?, code(&args[1])?))]),
    )
}
