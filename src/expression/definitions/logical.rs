//! `$and`, `$or` and `$not`. The first two short-circuit.

use crate::expression::value::{expect_array, expect_bool};
use crate::expression::{ExpressionDef, ExpressionEngine, ExpressionKind, ExpressionResult};
use serde_json::Value;

pub fn definitions() -> Vec<ExpressionDef> {
    vec![
        ExpressionDef::new("$and", ExpressionKind::Logical, apply_and)
            .with_evaluate(evaluate_and)
            .controlling(),
        ExpressionDef::new("$or", ExpressionKind::Logical, apply_or)
            .with_evaluate(evaluate_or)
            .controlling(),
        ExpressionDef::pure("$not", ExpressionKind::Logical, not),
    ]
}

/// Fold `operands` until one produces `stop_on`
fn short_circuit(
    name: &str,
    operand: &Value,
    stop_on: bool,
    mut eval: impl FnMut(&Value) -> ExpressionResult<Value>,
) -> ExpressionResult<Value> {
    for item in expect_array(name, operand)? {
        if expect_bool(name, &eval(item)?)? == stop_on {
            return Ok(Value::Bool(stop_on));
        }
    }
    Ok(Value::Bool(!stop_on))
}

fn apply_and(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    short_circuit("$and", operand, false, |item| engine.apply(item, input))
}

fn evaluate_and(operand: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    short_circuit("$and", operand, false, |item| engine.evaluate_unchecked(item))
}

fn apply_or(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    short_circuit("$or", operand, true, |item| engine.apply(item, input))
}

fn evaluate_or(operand: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    short_circuit("$or", operand, true, |item| engine.evaluate_unchecked(item))
}

fn not(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    expect_bool("$not", operand).map(|b| Value::Bool(!b))
}
