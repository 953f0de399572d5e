//! JSON value helpers shared by expression definitions and the query engine

use super::error::{ExpressionError, ExpressionResult};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Short type name used in error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: null < boolean < number < string < array < object.
///
/// Numbers compare numerically regardless of integer/float representation.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(_), Value::Object(_)) => {
            if a == b {
                Ordering::Equal
            } else {
                a.to_string().cmp(&b.to_string())
            }
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(l), Some(r)) = (x.as_i64(), y.as_i64()) {
        return l.cmp(&r);
    }
    let l = x.as_f64().unwrap_or(0.0);
    let r = y.as_f64().unwrap_or(0.0);
    l.partial_cmp(&r).unwrap_or(Ordering::Equal)
}

/// Equality that treats `1` and `1.0` as the same number
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal
}

/// Follow a dotted path into a value.
///
/// A `$` segment maps the rest of the path over an array, a numeric segment indexes
/// an array, and any other segment applied to an array maps over its items.
pub fn get_path(value: &Value, path: &str) -> Value {
    if path.is_empty() {
        return value.clone();
    }
    let segments: Vec<&str> = path.split('.').collect();
    walk(value, &segments)
}

fn walk(value: &Value, segments: &[&str]) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return value.clone();
    };

    match value {
        Value::Array(items) => {
            if *head == "$" {
                return Value::Array(items.iter().map(|item| walk(item, rest)).collect());
            }
            if let Ok(index) = head.parse::<usize>() {
                return items
                    .get(index)
                    .map(|item| walk(item, rest))
                    .unwrap_or(Value::Null);
            }
            Value::Array(items.iter().map(|item| walk(item, segments)).collect())
        }
        Value::Object(map) => map
            .get(*head)
            .map(|child| walk(child, rest))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

pub fn expect_array<'a>(expression: &str, operand: &'a Value) -> ExpressionResult<&'a Vec<Value>> {
    operand
        .as_array()
        .ok_or_else(|| ExpressionError::expected_array(expression, type_name(operand)))
}

/// Destructure a two-element array operand
pub fn expect_pair<'a>(expression: &str, operand: &'a Value) -> ExpressionResult<(&'a Value, &'a Value)> {
    let items = expect_array(expression, operand)?;
    match items.as_slice() {
        [left, right] => Ok((left, right)),
        _ => Err(ExpressionError::invalid_arity(expression, "2", items.len())),
    }
}

pub fn expect_bool(expression: &str, value: &Value) -> ExpressionResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| ExpressionError::invalid_operand(expression, "boolean", type_name(value)))
}

pub fn expect_number(expression: &str, value: &Value) -> ExpressionResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| ExpressionError::invalid_operand(expression, "number", type_name(value)))
}

pub fn expect_str<'a>(expression: &str, value: &'a Value) -> ExpressionResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ExpressionError::invalid_operand(expression, "string", type_name(value)))
}

/// Convert a float result to a JSON number, rejecting NaN and infinities
pub fn float_value(expression: &str, value: f64) -> ExpressionResult<Value> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| ExpressionError::non_finite(expression))
}
