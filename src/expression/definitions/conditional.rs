//! Branching and composition: `$if`, `$case`, `$pipe`, `$compose`

use crate::expression::value::{expect_array, expect_bool, type_name, values_equal};
use crate::expression::{ExpressionDef, ExpressionEngine, ExpressionError, ExpressionKind, ExpressionResult};
use serde_json::{Map, Value};

pub fn definitions() -> Vec<ExpressionDef> {
    vec![
        ExpressionDef::new("$if", ExpressionKind::Conditional, apply_if)
            .with_evaluate(evaluate_if)
            .controlling(),
        ExpressionDef::new("$case", ExpressionKind::Conditional, apply_case)
            .with_evaluate(evaluate_case)
            .controlling(),
        ExpressionDef::new("$pipe", ExpressionKind::Conditional, pipe).controlling(),
        ExpressionDef::new("$compose", ExpressionKind::Conditional, compose).controlling(),
    ]
}

fn expect_object<'a>(name: &str, operand: &'a Value) -> ExpressionResult<&'a Map<String, Value>> {
    operand
        .as_object()
        .ok_or_else(|| ExpressionError::invalid_operand(name, "object", type_name(operand)))
}

fn branch(
    operand: &Value,
    mut eval: impl FnMut(&Value) -> ExpressionResult<Value>,
) -> ExpressionResult<Value> {
    let clauses = expect_object("$if", operand)?;
    let condition = clauses
        .get("if")
        .ok_or_else(|| ExpressionError::invalid_operand("$if", "an 'if' clause", "none"))?;

    let key = if expect_bool("$if", &eval(condition)?)? {
        "then"
    } else {
        "else"
    };
    match clauses.get(key) {
        Some(chosen) => eval(chosen),
        None => Ok(Value::Null),
    }
}

fn apply_if(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    branch(operand, |v| engine.apply(v, input))
}

fn evaluate_if(operand: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    branch(operand, |v| engine.evaluate_unchecked(v))
}

/// `{value, cases: [{when, then}], default}`: the first `when` equal to `value` wins
fn select_case(
    operand: &Value,
    mut eval: impl FnMut(&Value) -> ExpressionResult<Value>,
) -> ExpressionResult<Value> {
    let clauses = expect_object("$case", operand)?;
    let subject = eval(clauses.get("value").unwrap_or(&Value::Null))?;
    let cases: &[Value] = match clauses.get("cases") {
        Some(cases) => expect_array("$case", cases)?.as_slice(),
        None => &[],
    };

    for case in cases {
        let case = expect_object("$case", case)?;
        let when = eval(case.get("when").unwrap_or(&Value::Null))?;
        if values_equal(&subject, &when) {
            return eval(case.get("then").unwrap_or(&Value::Null));
        }
    }

    match clauses.get("default") {
        Some(default) => eval(default),
        None => Ok(Value::Null),
    }
}

fn apply_case(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    select_case(operand, |v| engine.apply(v, input))
}

fn evaluate_case(operand: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    select_case(operand, |v| engine.evaluate_unchecked(v))
}

fn pipe(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    expect_array("$pipe", operand)?
        .iter()
        .try_fold(input.clone(), |acc, stage| engine.apply(stage, &acc))
}

fn compose(operand: &Value, input: &Value, engine: &ExpressionEngine) -> ExpressionResult<Value> {
    expect_array("$compose", operand)?
        .iter()
        .rev()
        .try_fold(input.clone(), |acc, stage| engine.apply(stage, &acc))
}
