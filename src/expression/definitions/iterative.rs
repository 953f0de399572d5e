//! Iteration over array inputs.
//!
//! `$map`, `$filter`, `$flatMap`, `$any`, `$all` and `$find` apply their
//! operand to each item of the input array and need input data. `$concat`,
//! `$join` and `$reverse` work on their operand alone.

use crate::expression::value::{expect_array, expect_bool, expect_pair, expect_str, type_name};
use crate::expression::{ExpressionDef, ExpressionEngine, ExpressionError, ExpressionKind, ExpressionResult};
use serde_json::Value;

pub fn definitions() -> Vec<ExpressionDef> {
    vec![
        ExpressionDef::new("$map", ExpressionKind::Iterative, map).controlling(),
        ExpressionDef::new("$filter", ExpressionKind::Iterative, filter).controlling(),
        ExpressionDef::new("$flatMap", ExpressionKind::Iterative, flat_map).controlling(),
        ExpressionDef::new("$any", ExpressionKind::Iterative, any).controlling(),
        ExpressionDef::new("$all", ExpressionKind::Iterative, all).controlling(),
        ExpressionDef::new("$find", ExpressionKind::Iterative, find).controlling(),
        ExpressionDef::pure("$concat", ExpressionKind::Iterative, concat),
        ExpressionDef::pure("$join", ExpressionKind::Iterative, join),
        ExpressionDef::pure("$reverse", ExpressionKind::Iterative, reverse),
    ]
}

fn predicate(
    name: &str,
    engine: &ExpressionEngine,
    operand: &Value,
    item: &Value,
) -> ExpressionResult<bool> {
    expect_bool(name, &engine.apply(operand, item)?)
}

fn map(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    expect_array("$map", input)?
        .iter()
        .map(|item| engine.apply(operand, item))
        .collect::<ExpressionResult<Vec<_>>>()
        .map(Value::Array)
}

fn filter(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let mut kept = Vec::new();
    for item in expect_array("$filter", input)? {
        if predicate("$filter", engine, operand, item)? {
            kept.push(item.clone());
        }
    }
    Ok(Value::Array(kept))
}

fn flat_map(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let mut out = Vec::new();
    for item in expect_array("$flatMap", input)? {
        match engine.apply(operand, item)? {
            Value::Array(items) => out.extend(items),
            other => {
                return Err(ExpressionError::expected_array("$flatMap", type_name(&other)));
            }
        }
    }
    Ok(Value::Array(out))
}

fn any(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    for item in expect_array("$any", input)? {
        if predicate("$any", engine, operand, item)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn all(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    for item in expect_array("$all", input)? {
        if !predicate("$all", engine, operand, item)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn find(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    for item in expect_array("$find", input)? {
        if predicate("$find", engine, operand, item)? {
            return Ok(item.clone());
        }
    }
    Ok(Value::Null)
}

fn concat(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let mut out = Vec::new();
    for part in expect_array("$concat", operand)? {
        out.extend(expect_array("$concat", part)?.iter().cloned());
    }
    Ok(Value::Array(out))
}

fn join(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let (items, separator) = expect_pair("$join", operand)?;
    let separator = expect_str("$join", separator)?;

    let mut parts = Vec::new();
    for item in expect_array("$join", items)? {
        let part = match item {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(ExpressionError::invalid_operand(
                    "$join",
                    "string, number or boolean",
                    type_name(other),
                ))
            }
        };
        parts.push(part);
    }
    Ok(Value::String(parts.join(separator)))
}

fn reverse(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let mut items = expect_array("$reverse", operand)?.clone();
    items.reverse();
    Ok(Value::Array(items))
}
