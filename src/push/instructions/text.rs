//! String and character instructions.
//!
//! Lengths and positions are measured in characters. Indices taken from the
//! int stack wrap around the string length, so no index is ever out of range.

use crate::push::instruction::{Instruction, Outputs};
use crate::push::value::{StackKind, Value};

use super::{clamp_index, wrap_index};
use StackKind::{Bool, Char, Int, Str};

pub(super) fn register(set: &mut Vec<Instruction>) {
    // ==================== Queries ====================
    set.push(str_op("str_length", vec![Str], vec![Int], |args| {
        let s = chars(&args[0])?;
        Some(vec![Value::Int(i64::try_from(s.len()).ok()?)])
    }));
    set.push(str_op("str_contains", vec![Str, Str], vec![Bool], |args| {
        let needle = args[0].as_str()?;
        let haystack = args[1].as_str()?;
        Some(vec![Value::Bool(haystack.contains(needle))])
    }));
    set.push(str_op("str_contains_char", vec![Str, Char], vec![Bool], |args| {
        let s = args[0].as_str()?;
        let Value::Char(c) = args[1] else { return None };
        Some(vec![Value::Bool(s.contains(c))])
    }));
    set.push(str_op("str_first", vec![Str], vec![Char], |args| {
        chars(&args[0])?.first().map(|c| vec![Value::Char(*c)])
    }));
    set.push(str_op("str_last", vec![Str], vec![Char], |args| {
        chars(&args[0])?.last().map(|c| vec![Value::Char(*c)])
    }));
    set.push(str_op("str_nth", vec![Str, Int], vec![Char], |args| {
        let s = chars(&args[0])?;
        if s.is_empty() {
            return None;
        }
        let i = wrap_index(args[1].as_int()?, s.len());
        Some(vec![Value::Char(s[i])])
    }));

    // ==================== Construction ====================
    set.push(str_op("str_concat", vec![Str, Str], vec![Str], |args| {
        let top = args[0].as_str()?;
        let second = args[1].as_str()?;
        Some(vec![Value::Str(format!("{second}{top}"))])
    }));
    set.push(str_op("str_append_char", vec![Str, Char], vec![Str], |args| {
        let mut s = args[0].as_str()?.to_string();
        let Value::Char(c) = args[1] else { return None };
        s.push(c);
        Some(vec![Value::Str(s)])
    }));
    set.push(str_op("str_head", vec![Str, Int], vec![Str], |args| {
        let s = chars(&args[0])?;
        let n = wrap_index(args[1].as_int()?, s.len() + 1);
        Some(vec![Value::Str(s[..n].iter().collect())])
    }));
    set.push(str_op("str_tail", vec![Str, Int], vec![Str], |args| {
        let s = chars(&args[0])?;
        let n = wrap_index(args[1].as_int()?, s.len() + 1);
        Some(vec![Value::Str(s[s.len() - n..].iter().collect())])
    }));
    set.push(str_op("str_substring", vec![Str, Int, Int], vec![Str], |args| {
        let s = chars(&args[0])?;
        let end = clamp_index(args[1].as_int()?, s.len());
        let start = clamp_index(args[2].as_int()?, s.len());
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Some(vec![Value::Str(s[start..end].iter().collect())])
    }));
    set.push(str_op("str_reverse", vec![Str], vec![Str], |args| {
        Some(vec![Value::Str(args[0].as_str()?.chars().rev().collect())])
    }));
    set.push(
        str_op("str_replace", vec![Str, Str, Str], vec![Str], |args| {
            let replacement = args[0].as_str()?;
            let pattern = args[1].as_str()?;
            let s = args[2].as_str()?;
            if pattern.is_empty() {
                return None;
            }
            Some(vec![Value::Str(s.replace(pattern, replacement))])
        })
        .with_doc("Replace every occurrence of the second string in the third with the top string."),
    );
    set.push(str_op("str_remove_char", vec![Str, Char], vec![Str], |args| {
        let s = args[0].as_str()?;
        let Value::Char(c) = args[1] else { return None };
        Some(vec![Value::Str(s.chars().filter(|x| *x != c).collect())])
    }));

    // ==================== Splitting ====================
    set.push(split("str_split_at_index", vec![Str, Int], |args| {
        let s = chars(&args[0])?;
        let i = wrap_index(args[1].as_int()?, s.len() + 1);
        Some(vec![s[..i].iter().collect(), s[i..].iter().collect()])
    }));
    set.push(split("str_split_on_char", vec![Str, Char], |args| {
        let s = args[0].as_str()?;
        let Value::Char(c) = args[1] else { return None };
        Some(s.split(c).map(str::to_string).collect())
    }));
    set.push(split("str_split_on_space", vec![Str], |args| {
        Some(
            args[0]
                .as_str()?
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        )
    }));

    // ==================== Comparison ====================
    set.push(str_compare("str_lt", |a, b| a < b));
    set.push(str_compare("str_lte", |a, b| a <= b));
    set.push(str_compare("str_gt", |a, b| a > b));
    set.push(str_compare("str_gte", |a, b| a >= b));

    // ==================== Characters ====================
    set.push(char_predicate("char_is_letter", char::is_alphabetic));
    set.push(char_predicate("char_is_digit", |c| c.is_ascii_digit()));
    set.push(char_predicate("char_is_whitespace", char::is_whitespace));
    set.push(Instruction::simple(
        "char_all_from_str",
        vec![Str],
        Outputs::Many(Char),
        |args| Some(args[0].as_str()?.chars().rev().map(Value::Char).collect()),
    ));
}

fn chars(value: &Value) -> Option<Vec<char>> {
    value.as_str().map(|s| s.chars().collect())
}

fn str_op(
    name: &str,
    inputs: Vec<StackKind>,
    outputs: Vec<StackKind>,
    f: impl Fn(&[Value]) -> Option<Vec<Value>> + Send + Sync + 'static,
) -> Instruction {
    Instruction::simple(name, inputs, Outputs::Fixed(outputs), f)
}

/// Pushes the parts so the first part ends on top.
fn split(
    name: &str,
    inputs: Vec<StackKind>,
    f: impl Fn(&[Value]) -> Option<Vec<String>> + Send + Sync + 'static,
) -> Instruction {
    Instruction::simple(name, inputs, Outputs::Many(Str), move |args| {
        let parts = f(args)?;
        Some(parts.into_iter().rev().map(Value::Str).collect())
    })
}

fn str_compare(name: &str, op: fn(&str, &str) -> bool) -> Instruction {
    str_op(name, vec![Str, Str], vec![Bool], move |args| {
        let top = args[0].as_str()?;
        let second = args[1].as_str()?;
        Some(vec![Value::Bool(op(second, top))])
    })
}

fn char_predicate(name: &str, op: fn(char) -> bool) -> Instruction {
    Instruction::simple(name, vec![Char], Outputs::Fixed(vec![Bool]), move |args| {
        let Value::Char(c) = args[0] else { return None };
        Some(vec![Value::Bool(op(c))])
    })
}
