//! Query engine integration tests over the Care Bears graph

mod common;

use common::{care_bear_graph, care_bear_graph_value, care_bear_schema, names};
use resgraph::{ExecutionError, Graph, QueryEngine, Violation};
use serde_json::{json, Value};

async fn run(query: Value) -> Result<Value, ExecutionError> {
    let schema = care_bear_schema();
    let graph = care_bear_graph();
    QueryEngine::new().execute(&schema, &graph, &query).await
}

#[tokio::test]
async fn test_sort_then_paginate() {
    let result = run(json!({
        "type": "bears",
        "select": ["name"],
        "order": {"name": "asc"},
        "limit": 2,
        "offset": 1
    }))
    .await
    .unwrap();

    assert_eq!(names(&result), vec!["Smart Heart Bear", "Tenderheart Bear"]);
}

#[tokio::test]
async fn test_multi_key_order_breaks_ties_left_to_right() {
    let result = run(json!({
        "type": "bears",
        "select": ["name"],
        "order": [{"yearIntroduced": "desc"}, {"name": "asc"}]
    }))
    .await
    .unwrap();

    assert_eq!(
        names(&result),
        vec!["Smart Heart Bear", "Cheer Bear", "Tenderheart Bear", "Wish Bear"]
    );
}

#[tokio::test]
async fn test_star_selects_declared_attributes() {
    let result = run(json!({"type": "bears", "id": "1", "select": "*"}))
        .await
        .unwrap();

    let keys: Vec<_> = result.as_object().unwrap().keys().cloned().collect();
    assert_eq!(
        keys,
        vec!["id", "name", "yearIntroduced", "bellyBadge", "furColor"]
    );
    assert_eq!(result["id"], json!("1"));
    assert_eq!(result["furColor"], json!("tan"));
}

#[tokio::test]
async fn test_bad_limit_and_offset_fail_before_execution() {
    let err = run(json!({"type": "bears", "select": "name", "limit": 0}))
        .await
        .unwrap_err();
    assert_eq!(err.violations(), &[Violation::InvalidLimit(json!(0))]);

    let err = run(json!({"type": "bears", "select": "name", "offset": -1}))
        .await
        .unwrap_err();
    assert_eq!(err.violations(), &[Violation::InvalidOffset(json!(-1))]);
}

#[tokio::test]
async fn test_offset_past_the_end_is_empty() {
    let result = run(json!({"type": "bears", "select": "name", "offset": 10}))
        .await
        .unwrap();
    assert_eq!(result, json!([]));
}

#[tokio::test]
async fn test_missing_id_yields_null() {
    let result = run(json!({"type": "bears", "id": "404", "select": "name"}))
        .await
        .unwrap();
    assert_eq!(result, Value::Null);
}

#[tokio::test]
async fn test_where_with_comparison() {
    let result = run(json!({
        "type": "bears",
        "select": ["name"],
        "where": {"yearIntroduced": {"$gt": 2000}}
    }))
    .await
    .unwrap();
    assert_eq!(names(&result), vec!["Smart Heart Bear"]);
}

#[tokio::test]
async fn test_where_across_to_many_relationship() {
    let result = run(json!({
        "type": "bears",
        "select": ["name"],
        "where": {"powers": {"$any": {"name": "Make a Wish"}}}
    }))
    .await
    .unwrap();
    assert_eq!(names(&result), vec!["Wish Bear"]);
}

#[tokio::test]
async fn test_where_with_logical_combinators() {
    let result = run(json!({
        "type": "bears",
        "select": ["name"],
        "where": {"$or": [{"furColor": "tan"}, {"bellyBadge": "rainbow"}]},
        "order": {"name": "asc"}
    }))
    .await
    .unwrap();
    assert_eq!(names(&result), vec!["Cheer Bear", "Tenderheart Bear"]);
}

#[tokio::test]
async fn test_paths_and_expressions_in_select() {
    let result = run(json!({
        "type": "bears",
        "id": "2",
        "select": {
            "name": "name",
            "friend": "bestFriend.name",
            "home": "home",
            "shout": {"$uppercase": {"$get": "name"}},
            "powerNames": {"$get": "powers.$.name"}
        }
    }))
    .await
    .unwrap();

    assert_eq!(
        result,
        json!({
            "name": "Cheer Bear",
            "friend": "Wish Bear",
            "home": {"type": "homes", "id": "1"},
            "shout": "CHEER BEAR",
            "powerNames": ["Care Bear Stare"]
        })
    );
}

#[tokio::test]
async fn test_nested_sub_queries() {
    let result = run(json!({
        "type": "bears",
        "id": "1",
        "select": [
            "name",
            {
                "home": {"select": ["name", "isInClouds"]},
                "powers": {"select": {"title": "name"}}
            }
        ]
    }))
    .await
    .unwrap();

    assert_eq!(
        result,
        json!({
            "name": "Tenderheart Bear",
            "home": {"name": "Care-a-Lot", "isInClouds": true},
            "powers": [{"title": "Care Bear Stare"}]
        })
    );
}

#[tokio::test]
async fn test_empty_to_one_sub_query_is_null() {
    let result = run(json!({
        "type": "bears",
        "id": "5",
        "select": {"name": "name", "home": {"select": "name"}, "powers": {"select": "name"}}
    }))
    .await
    .unwrap();

    assert_eq!(
        result,
        json!({"name": "Smart Heart Bear", "home": null, "powers": []})
    );
}

#[tokio::test]
async fn test_to_many_sub_query_orders_and_limits_the_whole_set() {
    let result = run(json!({
        "type": "homes",
        "id": "1",
        "select": {
            "residents": {
                "select": ["name"],
                "order": {"name": "desc"},
                "limit": 2
            }
        }
    }))
    .await
    .unwrap();

    assert_eq!(
        result,
        json!({"residents": [{"name": "Wish Bear"}, {"name": "Tenderheart Bear"}]})
    );
}

#[tokio::test]
async fn test_sub_query_where() {
    let result = run(json!({
        "type": "homes",
        "id": "1",
        "select": {"residents": {"select": "name", "where": {"furColor": "tan"}}}
    }))
    .await
    .unwrap();

    assert_eq!(result, json!({"residents": [{"name": "Tenderheart Bear"}]}));
}

#[tokio::test]
async fn test_dangling_reference_fails() {
    let schema = care_bear_schema();
    let mut document = care_bear_graph_value();
    document["bears"]["5"]["relationships"]["home"] = json!({"type": "homes", "id": "99"});
    let graph = Graph::from_value(&schema, document).unwrap();

    let err = QueryEngine::new()
        .execute(
            &schema,
            &graph,
            &json!({"type": "bears", "id": "5", "select": ["home.name"]}),
        )
        .await
        .unwrap_err();

    match err {
        ExecutionError::DanglingReference { target, .. } => assert_eq!(target.id, "99"),
        other => panic!("expected a dangling reference, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_names_are_all_reported() {
    let err = run(json!({
        "type": "bears",
        "select": {"name": "name", "den": {"select": "name"}, "wings": "wings"}
    }))
    .await
    .unwrap_err();

    let violations = err.violations();
    assert_eq!(violations.len(), 2);
    assert!(violations.contains(&Violation::UnknownRelationship {
        resource_type: "bears".to_string(),
        relationship: "den".to_string(),
    }));
    assert!(violations.contains(&Violation::UnknownAttribute {
        resource_type: "bears".to_string(),
        attribute: "wings".to_string(),
    }));
}

#[tokio::test]
async fn test_expression_errors_surface() {
    let err = run(json!({
        "type": "bears",
        "select": {"ratio": {"$divide": [{"$get": "yearIntroduced"}, 0]}}
    }))
    .await
    .unwrap_err();

    assert!(matches!(err, ExecutionError::Expression(_)));
}

#[tokio::test]
async fn test_unknown_names_inside_expressions_are_reported() {
    let unknown = |resource_type: &str, attribute: &str| Violation::UnknownAttribute {
        resource_type: resource_type.to_string(),
        attribute: attribute.to_string(),
    };

    let err = run(json!({
        "type": "bears",
        "select": "name",
        "where": {"$eq": [{"$get": "wingspan"}, 3]}
    }))
    .await
    .unwrap_err();
    assert_eq!(err.violations(), &[unknown("bears", "wingspan")]);

    let err = run(json!({
        "type": "bears",
        "select": "name",
        "where": {"powers": {"$any": {"bogus": 1}}}
    }))
    .await
    .unwrap_err();
    assert_eq!(err.violations(), &[unknown("powers", "bogus")]);

    let err = run(json!({"type": "bears", "select": {"w": {"$get": "wingspan"}}}))
        .await
        .unwrap_err();
    assert_eq!(err.violations(), &[unknown("bears", "wingspan")]);
}

fn graph_with_ghost_power() -> Graph {
    let schema = care_bear_schema();
    let mut document = care_bear_graph_value();
    document["bears"]["1"]["relationships"]["powers"] =
        json!([{"type": "powers", "id": "ghost"}]);
    Graph::from_value(&schema, document).unwrap()
}

#[tokio::test]
async fn test_dangling_reference_in_untraversed_relationship_is_ignored() {
    let schema = care_bear_schema();
    let graph = graph_with_ghost_power();
    let engine = QueryEngine::new();

    let tenderheart = engine
        .execute(
            &schema,
            &graph,
            &json!({"type": "bears", "id": "1", "select": ["home.name", "powers"]}),
        )
        .await
        .unwrap();
    assert_eq!(
        tenderheart,
        json!({
            "home.name": "Care-a-Lot",
            "powers": [{"type": "powers", "id": "ghost"}]
        })
    );

    let residents = engine
        .execute(
            &schema,
            &graph,
            &json!({
                "type": "bears",
                "select": ["name"],
                "where": {"home": {"name": "Care-a-Lot"}},
                "order": {"name": "asc"}
            }),
        )
        .await
        .unwrap();
    assert_eq!(
        names(&residents),
        vec!["Cheer Bear", "Tenderheart Bear", "Wish Bear"]
    );

    let err = engine
        .execute(
            &schema,
            &graph,
            &json!({"type": "bears", "id": "1", "select": ["powers.name"]}),
        )
        .await
        .unwrap_err();
    match err {
        ExecutionError::DanglingReference { relationship, target, .. } => {
            assert_eq!(relationship, "powers");
            assert_eq!(target.id, "ghost");
        }
        other => panic!("expected a dangling reference, got {:?}", other),
    }
}
