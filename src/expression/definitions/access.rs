//! `$literal`, `$get` and `$echo`

use crate::expression::value::{expect_str, get_path};
use crate::expression::{ExpressionDef, ExpressionEngine, ExpressionKind, ExpressionResult};
use serde_json::Value;

pub fn definitions() -> Vec<ExpressionDef> {
    vec![
        ExpressionDef::new("$literal", ExpressionKind::Access, apply_literal)
            .with_evaluate(evaluate_literal)
            .controlling(),
        ExpressionDef::new("$get", ExpressionKind::Access, apply_get),
        ExpressionDef::new("$echo", ExpressionKind::Access, apply_echo),
    ]
}

fn apply_literal(operand: &Value, _input: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    Ok(operand.clone())
}

fn evaluate_literal(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    Ok(operand.clone())
}

fn apply_get(operand: &Value, input: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let path = expect_str("$get", operand)?;
    Ok(get_path(input, path))
}

fn apply_echo(_operand: &Value, input: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    Ok(input.clone())
}
