//! Arithmetic over JSON numbers.
//!
//! Integer operands stay integers while the result is exact and fits in an
//! `i64`; otherwise the computation falls back to `f64`. Non-finite results fail.

use crate::expression::value::{expect_array, expect_number, expect_pair, float_value, type_name};
use crate::expression::{ExpressionDef, ExpressionEngine, ExpressionError, ExpressionKind, ExpressionResult};
use serde_json::Value;

pub fn definitions() -> Vec<ExpressionDef> {
    vec![
        ExpressionDef::pure("$add", ExpressionKind::Arithmetic, add),
        ExpressionDef::pure("$subtract", ExpressionKind::Arithmetic, subtract),
        ExpressionDef::pure("$multiply", ExpressionKind::Arithmetic, multiply),
        ExpressionDef::pure("$divide", ExpressionKind::Arithmetic, divide),
        ExpressionDef::pure("$modulo", ExpressionKind::Arithmetic, modulo),
        ExpressionDef::pure("$pow", ExpressionKind::Arithmetic, pow),
        ExpressionDef::pure("$abs", ExpressionKind::Arithmetic, abs),
    ]
}

fn numbers<'a>(name: &str, operand: &'a Value) -> ExpressionResult<&'a Vec<Value>> {
    let items = expect_array(name, operand)?;
    if let Some(bad) = items.iter().find(|v| !v.is_number()) {
        return Err(ExpressionError::invalid_operand(name, "number", type_name(bad)));
    }
    Ok(items)
}

fn fold(
    name: &str,
    operand: &Value,
    identity: i64,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> ExpressionResult<Value> {
    let items = numbers(name, operand)?;

    let ints: Option<Vec<i64>> = items.iter().map(Value::as_i64).collect();
    if let Some(ints) = ints {
        let exact = ints
            .iter()
            .try_fold(identity, |acc, n| int_op(acc, *n));
        if let Some(result) = exact {
            return Ok(Value::from(result));
        }
    }

    let mut acc = identity as f64;
    for item in items {
        acc = float_op(acc, expect_number(name, item)?);
    }
    float_value(name, acc)
}

fn add(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    fold("$add", operand, 0, i64::checked_add, |a, b| a + b)
}

fn multiply(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    fold("$multiply", operand, 1, i64::checked_mul, |a, b| a * b)
}

fn binary(name: &str, operand: &Value) -> ExpressionResult<(Value, Value)> {
    let (left, right) = expect_pair(name, operand)?;
    for side in [left, right] {
        if !side.is_number() {
            return Err(ExpressionError::invalid_operand(name, "number", type_name(side)));
        }
    }
    Ok((left.clone(), right.clone()))
}

fn subtract(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let (left, right) = binary("$subtract", operand)?;
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        if let Some(result) = l.checked_sub(r) {
            return Ok(Value::from(result));
        }
    }
    let l = expect_number("$subtract", &left)?;
    let r = expect_number("$subtract", &right)?;
    float_value("$subtract", l - r)
}

fn divide(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let (left, right) = binary("$divide", operand)?;
    let r = expect_number("$divide", &right)?;
    if r == 0.0 {
        return Err(ExpressionError::division_by_zero("$divide"));
    }
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        if l.checked_rem(r) == Some(0) {
            if let Some(result) = l.checked_div(r) {
                return Ok(Value::from(result));
            }
        }
    }
    let l = expect_number("$divide", &left)?;
    float_value("$divide", l / r)
}

fn modulo(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let (left, right) = binary("$modulo", operand)?;
    let r = expect_number("$modulo", &right)?;
    if r == 0.0 {
        return Err(ExpressionError::division_by_zero("$modulo"));
    }
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        if let Some(result) = l.checked_rem(r) {
            return Ok(Value::from(result));
        }
    }
    let l = expect_number("$modulo", &left)?;
    float_value("$modulo", l % r)
}

fn pow(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let (base, exponent) = binary("$pow", operand)?;
    if let (Some(b), Some(e)) = (base.as_i64(), exponent.as_u64()) {
        if let Some(result) = u32::try_from(e).ok().and_then(|e| b.checked_pow(e)) {
            return Ok(Value::from(result));
        }
    }
    let b = expect_number("$pow", &base)?;
    let e = expect_number("$pow", &exponent)?;
    float_value("$pow", b.powf(e))
}

fn abs(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    if let Some(n) = operand.as_i64() {
        if let Some(result) = n.checked_abs() {
            return Ok(Value::from(result));
        }
    }
    let n = expect_number("$abs", operand)?;
    float_value("$abs", n.abs())
}
