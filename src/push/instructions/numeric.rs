//! Integer and float arithmetic, comparisons and conversions.

// Conversions between i64, f64, u32 and char are intentional here
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use crate::push::instruction::{Instruction, Outputs};
use crate::push::value::{StackKind, Value};

use StackKind::{Bool, Char, Float, Int, Str};

pub(super) fn register(set: &mut Vec<Instruction>) {
    // ==================== Integer arithmetic ====================
    set.push(int_binary("int_add", |a, b| Some(a.saturating_add(b))));
    set.push(int_binary("int_sub", |a, b| Some(a.saturating_sub(b))));
    set.push(int_binary("int_mult", |a, b| Some(a.saturating_mul(b))));
    set.push(int_binary("int_div", i64::checked_div).with_doc("Truncating division; zero divisor is a no-op."));
    set.push(int_binary("int_mod", floored_mod).with_doc("Floored modulo; zero divisor is a no-op."));
    set.push(int_binary("int_min", |a, b| Some(a.min(b))));
    set.push(int_binary("int_max", |a, b| Some(a.max(b))));
    set.push(int_unary("int_inc", |a| a.saturating_add(1)));
    set.push(int_unary("int_dec", |a| a.saturating_sub(1)));
    set.push(int_unary("int_abs", i64::saturating_abs));
    set.push(int_unary("int_neg", i64::saturating_neg));

    // ==================== Float arithmetic ====================
    set.push(float_binary("float_add", |a, b| Some(a + b)));
    set.push(float_binary("float_sub", |a, b| Some(a - b)));
    set.push(float_binary("float_mult", |a, b| Some(a * b)));
    set.push(float_binary("float_div", |a, b| (b != 0.0).then(|| a / b)));
    set.push(float_binary("float_mod", |a, b| {
        (b != 0.0).then(|| a - b * (a / b).floor())
    }));
    set.push(float_binary("float_min", |a, b| Some(a.min(b))));
    set.push(float_binary("float_max", |a, b| Some(a.max(b))));
    set.push(float_unary("float_inc", |a| Some(a + 1.0)));
    set.push(float_unary("float_dec", |a| Some(a - 1.0)));
    set.push(float_unary("float_abs", |a| Some(a.abs())));
    set.push(float_unary("float_neg", |a| Some(-a)));

    // ==================== Transcendental ====================
    set.push(float_unary("float_sin", |a| Some(a.sin())));
    set.push(float_unary("float_cos", |a| Some(a.cos())));
    set.push(float_unary("float_tan", |a| Some(a.tan())));
    set.push(float_unary("float_log", |a| (a > 0.0).then(|| a.ln())));
    set.push(float_unary("float_exp", |a| Some(a.exp())));
    set.push(float_unary("float_sqrt", |a| (a >= 0.0).then(|| a.sqrt())));

    // ==================== Comparison ====================
    set.push(int_compare("int_lt", |a, b| a < b));
    set.push(int_compare("int_lte", |a, b| a <= b));
    set.push(int_compare("int_gt", |a, b| a > b));
    set.push(int_compare("int_gte", |a, b| a >= b));
    set.push(float_compare("float_lt", |a, b| a < b));
    set.push(float_compare("float_lte", |a, b| a <= b));
    set.push(float_compare("float_gt", |a, b| a > b));
    set.push(float_compare("float_gte", |a, b| a >= b));

    // ==================== Conversion ====================
    set.push(convert("int_from_float", Float, Int, |v| {
        v.as_float().map(|f| Value::Int(f.trunc() as i64))
    }));
    set.push(convert("int_from_bool", Bool, Int, |v| {
        v.as_bool().map(|b| Value::Int(i64::from(b)))
    }));
    set.push(convert("int_from_char", Char, Int, |v| match v {
        Value::Char(c) => Some(Value::Int(i64::from(u32::from(*c)))),
        _ => None,
    }));
    set.push(convert("int_from_str", Str, Int, |v| {
        v.as_str()?.trim().parse::<i64>().ok().map(Value::Int)
    }));
    set.push(convert("float_from_int", Int, Float, |v| {
        v.as_int().map(|i| Value::Float(i as f64))
    }));
    set.push(convert("float_from_bool", Bool, Float, |v| {
        v.as_bool().map(|b| Value::Float(if b { 1.0 } else { 0.0 }))
    }));
    set.push(convert("float_from_char", Char, Float, |v| match v {
        Value::Char(c) => Some(Value::Float(f64::from(u32::from(*c)))),
        _ => None,
    }));
    set.push(convert("float_from_str", Str, Float, |v| {
        let f = v.as_str()?.trim().parse::<f64>().ok()?;
        f.is_finite().then_some(Value::Float(f))
    }));
    set.push(convert("bool_from_int", Int, Bool, |v| {
        v.as_int().map(|i| Value::Bool(i != 0))
    }));
    set.push(convert("bool_from_float", Float, Bool, |v| {
        v.as_float().map(|f| Value::Bool(f != 0.0))
    }));
    set.push(convert("char_from_int", Int, Char, |v| {
        // ASCII only, so every integer maps to some character
        v.as_int()
            .map(|i| Value::Char(char::from(i.rem_euclid(128) as u8)))
    }));
    set.push(convert("char_from_float", Float, Char, |v| {
        v.as_float()
            .map(|f| Value::Char(char::from((f.trunc() as i64).rem_euclid(128) as u8)))
    }));
    set.push(convert("str_from_int", Int, Str, |v| Some(Value::Str(v.to_string()))));
    set.push(convert("str_from_float", Float, Str, |v| Some(Value::Str(v.to_string()))));
    set.push(convert("str_from_bool", Bool, Str, |v| Some(Value::Str(v.to_string()))));
    set.push(convert("str_from_char", Char, Str, |v| Some(Value::Str(v.to_string()))));
}

fn floored_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

/// `second op top` on the int stack.
fn int_binary(name: &str, op: impl Fn(i64, i64) -> Option<i64> + Send + Sync + 'static) -> Instruction {
    Instruction::simple(name, vec![Int, Int], Outputs::Fixed(vec![Int]), move |args| {
        let top = args[0].as_int()?;
        let second = args[1].as_int()?;
        op(second, top).map(|r| vec![Value::Int(r)])
    })
}

fn int_unary(name: &str, op: impl Fn(i64) -> i64 + Send + Sync + 'static) -> Instruction {
    Instruction::simple(name, vec![Int], Outputs::Fixed(vec![Int]), move |args| {
        Some(vec![Value::Int(op(args[0].as_int()?))])
    })
}

/// `second op top` on the float stack. NaN results are no-ops; infinities
/// are clamped when pushed.
fn float_binary(name: &str, op: impl Fn(f64, f64) -> Option<f64> + Send + Sync + 'static) -> Instruction {
    Instruction::simple(name, vec![Float, Float], Outputs::Fixed(vec![Float]), move |args| {
        let top = args[0].as_float()?;
        let second = args[1].as_float()?;
        op(second, top)
            .filter(|r| !r.is_nan())
            .map(|r| vec![Value::Float(r)])
    })
}

fn float_unary(name: &str, op: impl Fn(f64) -> Option<f64> + Send + Sync + 'static) -> Instruction {
    Instruction::simple(name, vec![Float], Outputs::Fixed(vec![Float]), move |args| {
        op(args[0].as_float()?)
            .filter(|r| !r.is_nan())
            .map(|r| vec![Value::Float(r)])
    })
}

fn int_compare(name: &str, op: impl Fn(i64, i64) -> bool + Send + Sync + 'static) -> Instruction {
    Instruction::simple(name, vec![Int, Int], Outputs::Fixed(vec![Bool]), move |args| {
        let top = args[0].as_int()?;
        let second = args[1].as_int()?;
        Some(vec![Value::Bool(op(second, top))])
    })
}

fn float_compare(name: &str, op: impl Fn(f64, f64) -> bool + Send + Sync + 'static) -> Instruction {
    Instruction::simple(name, vec![Float, Float], Outputs::Fixed(vec![Bool]), move |args| {
        let top = args[0].as_float()?;
        let second = args[1].as_float()?;
        Some(vec![Value::Bool(op(second, top))])
    })
}

pub(super) fn convert(
    name: &str,
    from: StackKind,
    to: StackKind,
    op: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
) -> Instruction {
    Instruction::simple(name, vec![from], Outputs::Fixed(vec![to]), move |args| {
        op(&args[0]).map(|v| vec![v])
    })
}
