//! Expression engine properties checked across a corpus of expressions

use resgraph::expression::{ExpressionDef, ExpressionEngine, ExpressionError, ExpressionKind};
use serde_json::{json, Value};

fn evaluable_corpus() -> Vec<Value> {
    vec![
        json!({"$eq": [3, 3]}),
        json!({"$gt": [{"$add": [1, 2]}, 2]}),
        json!({"$and": [true, {"$not": false}]}),
        json!({"$or": [false, {"$in": ["b", ["a", "b"]]}]}),
        json!({"$subtract": [{"$multiply": [4, 5]}, {"$abs": -3}]}),
        json!({"$if": {"if": {"$lt": [1, 2]}, "then": "yes", "else": "no"}}),
        json!({"$case": {"value": 2, "cases": [{"when": 1, "then": "one"}, {"when": 2, "then": "two"}], "default": "many"}}),
        json!({"$sum": {"$concat": [[1, 2], [3]]}}),
        json!({"$join": [{"$reverse": ["c", "b", "a"]}, "-"]}),
        json!({"$lowercase": {"$trim": "  LOUD  "}}),
        json!({"$split": ["a,b,c", ","]}),
        json!({"$literal": {"$get": "not.applied"}}),
        json!({"$timestamp": "1970-01-01T00:00:01Z"}),
        json!({"$matchesRegex": ["Grumpy Bear", "Bear$"]}),
        json!([{"$add": [1, 1]}, {"nested": {"$max": [1, 9, 4]}}]),
    ]
}

#[test]
fn test_evaluable_expressions_ignore_input() {
    let engine = ExpressionEngine::new();
    let inputs = [json!(null), json!({"name": "Cheer Bear"}), json!([1, 2, 3])];

    for expression in evaluable_corpus() {
        assert!(engine.is_evaluable(&expression), "{} should be evaluable", expression);
        let evaluated = engine.evaluate(&expression).unwrap();
        for input in &inputs {
            assert_eq!(
                engine.apply(&expression, input).unwrap(),
                evaluated,
                "apply and evaluate disagree on {}",
                expression
            );
        }
    }
}

#[test]
fn test_literal_is_not_looked_into() {
    let engine = ExpressionEngine::new();
    assert_eq!(
        engine.evaluate(&json!({"$literal": {"$get": "not.applied"}})).unwrap(),
        json!({"$get": "not.applied"})
    );
}

#[test]
fn test_input_dependent_expressions_are_not_evaluable() {
    let engine = ExpressionEngine::new();
    let dependent = [
        json!({"$get": "name"}),
        json!({"$eq": [{"$get": "name"}, "x"]}),
        json!({"$map": {"$get": "name"}}),
        json!({"$pipe": [{"$get": "powers"}, {"$count": {"$echo": null}}]}),
        json!({"$if": {"if": true, "then": {"$echo": null}, "else": 0}}),
    ];

    for expression in dependent {
        assert!(!engine.is_evaluable(&expression), "{} needs input", expression);
        assert!(matches!(
            engine.evaluate(&expression),
            Err(ExpressionError::NotEvaluable { .. })
        ));
    }
}

#[test]
fn test_non_expressions_are_plain_data() {
    let engine = ExpressionEngine::new();
    assert!(!engine.is_expression(&json!({"name": "x"})));
    assert!(!engine.is_expression(&json!({"$get": "a", "$eq": 1})));
    assert!(!engine.is_expression(&json!({"$unknown": 1})));
    assert_eq!(engine.evaluate(&json!({"name": "x"})).unwrap(), json!({"name": "x"}));
}

#[test]
fn test_failures_are_discriminable() {
    let engine = ExpressionEngine::new();

    assert!(matches!(
        engine.evaluate(&json!({"$divide": [1, 0]})),
        Err(ExpressionError::DivisionByZero { .. })
    ));
    assert!(matches!(
        engine.evaluate(&json!({"$modulo": [1, 0]})),
        Err(ExpressionError::DivisionByZero { .. })
    ));
    assert!(matches!(
        engine.apply(&json!({"$filter": {"$gt": [{"$echo": null}, 1]}}), &json!(3)),
        Err(ExpressionError::ExpectedArray { .. })
    ));
    assert!(matches!(
        engine.evaluate(&json!({"$timestamp": "yesterday"})),
        Err(ExpressionError::InvalidDate { .. })
    ));
    assert!(matches!(
        engine.evaluate(&json!({"$and": [true, 1]})),
        Err(ExpressionError::InvalidOperand { .. })
    ));
}

#[test]
fn test_where_clause_runs_against_a_resource_view() {
    let engine = ExpressionEngine::new();
    let clause = engine
        .normalize_where(
            &json!({
                "yearIntroduced": {"$lt": 2000},
                "home": {"name": "Care-a-Lot"},
                "powers": {"$any": {"name": "Make a Wish"}}
            }),
            None,
        )
        .unwrap();

    let wish = json!({
        "name": "Wish Bear",
        "yearIntroduced": 1982,
        "home": {"name": "Care-a-Lot"},
        "powers": [{"name": "Care Bear Stare"}, {"name": "Make a Wish"}]
    });
    let cheer = json!({
        "name": "Cheer Bear",
        "yearIntroduced": 1982,
        "home": {"name": "Care-a-Lot"},
        "powers": [{"name": "Care Bear Stare"}]
    });

    assert_eq!(engine.apply(&clause, &wish).unwrap(), json!(true));
    assert_eq!(engine.apply(&clause, &cheer).unwrap(), json!(false));
}

fn shout(operand: &Value, _engine: &ExpressionEngine) -> resgraph::ExpressionResult<Value> {
    match operand {
        Value::String(s) => Ok(Value::String(format!("{}!", s.to_uppercase()))),
        other => Err(ExpressionError::invalid_operand("$shout", "string", other.to_string())),
    }
}

#[test]
fn test_custom_definitions_join_the_registry() {
    let mut engine = ExpressionEngine::new();
    let before = engine.len();
    engine.register(ExpressionDef::pure("$shout", ExpressionKind::String, shout));
    assert_eq!(engine.len(), before + 1);

    assert_eq!(engine.evaluate(&json!({"$shout": "hi"})).unwrap(), json!("HI!"));
    assert_eq!(
        engine
            .apply(&json!({"$shout": {"$get": "name"}}), &json!({"name": "cheer"}))
            .unwrap(),
        json!("CHEER!")
    );
}
