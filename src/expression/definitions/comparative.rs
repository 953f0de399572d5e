//! Comparisons. Each takes a `[left, right]` operand.
//!
//! Ordering comparisons are false when either side is null and fail when the
//! two sides have different types.

use crate::expression::value::{compare_values, expect_array, expect_pair, type_name, values_equal};
use crate::expression::{ExpressionDef, ExpressionEngine, ExpressionError, ExpressionKind, ExpressionResult};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

pub fn definitions() -> Vec<ExpressionDef> {
    vec![
        ExpressionDef::pure("$eq", ExpressionKind::Comparative, eq),
        ExpressionDef::pure("$ne", ExpressionKind::Comparative, ne),
        ExpressionDef::pure("$gt", ExpressionKind::Comparative, gt),
        ExpressionDef::pure("$gte", ExpressionKind::Comparative, gte),
        ExpressionDef::pure("$lt", ExpressionKind::Comparative, lt),
        ExpressionDef::pure("$lte", ExpressionKind::Comparative, lte),
        ExpressionDef::pure("$in", ExpressionKind::Comparative, is_in),
        ExpressionDef::pure("$nin", ExpressionKind::Comparative, not_in),
        ExpressionDef::pure("$matchesRegex", ExpressionKind::Comparative, matches_regex),
    ]
}

fn eq(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let (left, right) = expect_pair("$eq", operand)?;
    Ok(Value::Bool(values_equal(left, right)))
}

fn ne(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let (left, right) = expect_pair("$ne", operand)?;
    Ok(Value::Bool(!values_equal(left, right)))
}

fn ordered(
    name: &str,
    operand: &Value,
    accept: fn(Ordering) -> bool,
) -> ExpressionResult<Value> {
    let (left, right) = expect_pair(name, operand)?;
    if left.is_null() || right.is_null() {
        return Ok(Value::Bool(false));
    }
    if type_name(left) != type_name(right) {
        return Err(ExpressionError::invalid_operand(
            name,
            type_name(left),
            type_name(right),
        ));
    }
    Ok(Value::Bool(accept(compare_values(left, right))))
}

fn gt(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    ordered("$gt", operand, |o| o == Ordering::Greater)
}

fn gte(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    ordered("$gte", operand, |o| o != Ordering::Less)
}

fn lt(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    ordered("$lt", operand, |o| o == Ordering::Less)
}

fn lte(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    ordered("$lte", operand, |o| o != Ordering::Greater)
}

fn membership(name: &str, operand: &Value) -> ExpressionResult<bool> {
    let (needle, haystack) = expect_pair(name, operand)?;
    let items = expect_array(name, haystack)?;
    Ok(items.iter().any(|item| values_equal(item, needle)))
}

fn is_in(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    membership("$in", operand).map(Value::Bool)
}

fn not_in(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    membership("$nin", operand).map(|found| Value::Bool(!found))
}

fn matches_regex(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let (subject, pattern) = expect_pair("$matchesRegex", operand)?;
    let pattern = pattern.as_str().ok_or_else(|| {
        ExpressionError::invalid_operand("$matchesRegex", "string pattern", type_name(pattern))
    })?;
    let regex = Regex::new(pattern)
        .map_err(|e| ExpressionError::invalid_pattern("$matchesRegex", pattern, e.to_string()))?;

    match subject {
        Value::Null => Ok(Value::Bool(false)),
        Value::String(s) => Ok(Value::Bool(regex.is_match(s))),
        other => Err(ExpressionError::invalid_operand(
            "$matchesRegex",
            "string",
            type_name(other),
        )),
    }
}
