//! String expressions. Null operands pass through as null.

use crate::expression::value::{expect_pair, expect_str, type_name};
use crate::expression::{ExpressionDef, ExpressionEngine, ExpressionError, ExpressionKind, ExpressionResult};
use serde_json::Value;

pub fn definitions() -> Vec<ExpressionDef> {
    vec![
        ExpressionDef::pure("$lowercase", ExpressionKind::String, lowercase),
        ExpressionDef::pure("$uppercase", ExpressionKind::String, uppercase),
        ExpressionDef::pure("$trim", ExpressionKind::String, trim),
        ExpressionDef::pure("$split", ExpressionKind::String, split),
    ]
}

fn map_str(name: &str, operand: &Value, f: fn(&str) -> String) -> ExpressionResult<Value> {
    match operand {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::String(f(s))),
        other => Err(ExpressionError::invalid_operand(name, "string", type_name(other))),
    }
}

fn lowercase(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    map_str("$lowercase", operand, str::to_lowercase)
}

fn uppercase(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    map_str("$uppercase", operand, str::to_uppercase)
}

fn trim(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    map_str("$trim", operand, |s| s.trim().to_string())
}

/// `[string, separator]`
fn split(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let (subject, separator) = expect_pair("$split", operand)?;
    if subject.is_null() {
        return Ok(Value::Null);
    }
    let subject = expect_str("$split", subject)?;
    let separator = expect_str("$split", separator)?;
    Ok(Value::Array(
        subject
            .split(separator)
            .map(|part| Value::String(part.to_string()))
            .collect(),
    ))
}
