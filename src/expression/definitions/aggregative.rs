//! Aggregates over an array operand.
//!
//! Empty arrays give 0 for `$count` and `$sum` and null for the others.

use crate::expression::value::{compare_values, expect_array, expect_number, float_value, type_name};
use crate::expression::{ExpressionDef, ExpressionEngine, ExpressionError, ExpressionKind, ExpressionResult};
use serde_json::Value;
use std::cmp::Ordering;

pub fn definitions() -> Vec<ExpressionDef> {
    vec![
        ExpressionDef::pure("$count", ExpressionKind::Aggregative, count),
        ExpressionDef::pure("$sum", ExpressionKind::Aggregative, sum),
        ExpressionDef::pure("$min", ExpressionKind::Aggregative, min),
        ExpressionDef::pure("$max", ExpressionKind::Aggregative, max),
        ExpressionDef::pure("$mean", ExpressionKind::Aggregative, mean),
        ExpressionDef::pure("$median", ExpressionKind::Aggregative, median),
    ]
}

fn count(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    Ok(Value::from(expect_array("$count", operand)?.len()))
}

fn floats(name: &str, operand: &Value) -> ExpressionResult<Vec<f64>> {
    expect_array(name, operand)?
        .iter()
        .map(|v| expect_number(name, v))
        .collect()
}

/// Exact total when every item is an integer and the sum fits in an `i64`
fn integer_total(items: &[Value]) -> Option<i64> {
    items
        .iter()
        .try_fold(0i64, |acc, item| acc.checked_add(item.as_i64()?))
}

fn sum(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    if let Some(total) = integer_total(expect_array("$sum", operand)?) {
        return Ok(Value::from(total));
    }
    // mixed or overflowing input is summed as floats
    let total: f64 = floats("$sum", operand)?.iter().sum();
    float_value("$sum", total)
}

fn extreme(name: &str, operand: &Value, wanted: Ordering) -> ExpressionResult<Value> {
    let items = expect_array(name, operand)?;
    let Some(first) = items.first() else {
        return Ok(Value::Null);
    };

    let mut best = first;
    for item in &items[1..] {
        if type_name(item) != type_name(best) {
            return Err(ExpressionError::invalid_operand(
                name,
                type_name(best),
                type_name(item),
            ));
        }
        if compare_values(item, best) == wanted {
            best = item;
        }
    }
    Ok(best.clone())
}

fn min(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    extreme("$min", operand, Ordering::Less)
}

fn max(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    extreme("$max", operand, Ordering::Greater)
}

fn mean(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let items = expect_array("$mean", operand)?;
    if !items.is_empty() {
        if let Some(total) = integer_total(items) {
            return float_value("$mean", total as f64 / items.len() as f64);
        }
    }
    let values = floats("$mean", operand)?;
    if values.is_empty() {
        return Ok(Value::Null);
    }
    float_value("$mean", values.iter().sum::<f64>() / values.len() as f64)
}

fn median(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let mut values = floats("$median", operand)?;
    if values.is_empty() {
        return Ok(Value::Null);
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mid = values.len() / 2;
    let result = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    float_value("$median", result)
}
