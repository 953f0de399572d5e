//! Query processing module
//!
//! - Normalization: caller JSON to canonical [`Query`], validated against the schema
//! - Planning: scan, filter, sort and slice as physical operators
//! - Execution: projection with sub-query fan-out over a borrowed graph
//!
//! Architecture follows the Volcano iterator model.

pub mod ast;
pub mod executor;
pub mod normalize;

// Re-export main types
pub use ast::{Direction, OrderBy, Query, Selector};
pub use executor::{
    ExecutionContext, ExecutionError, ExecutionResult, QueryExecutor, Record, Violation,
};
pub use normalize::normalize_query;

use crate::config::EngineConfig;
use crate::expression::ExpressionEngine;
use crate::graph::Graph;
use crate::schema::Schema;
use serde_json::Value;

/// Query engine - high-level interface for executing queries
pub struct QueryEngine {
    engine: ExpressionEngine,
    config: EngineConfig,
}

impl QueryEngine {
    /// Create a query engine with the built-in expressions and default limits
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            engine: ExpressionEngine::new(),
            config,
        }
    }

    /// Use a custom expression registry
    pub fn with_expressions(mut self, engine: ExpressionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn expressions(&self) -> &ExpressionEngine {
        &self.engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate and canonicalize a caller-facing query
    pub fn normalize(&self, schema: &Schema, query: &Value) -> ExecutionResult<Query> {
        normalize_query(schema, &self.engine, &self.config, query)
    }

    /// Normalize and execute a query against a graph
    pub async fn execute(&self, schema: &Schema, graph: &Graph, query: &Value) -> ExecutionResult<Value> {
        let query = self.normalize(schema, query)?;
        self.execute_normalized(schema, graph, &query).await
    }

    /// Execute an already normalized query
    pub async fn execute_normalized(
        &self,
        schema: &Schema,
        graph: &Graph,
        query: &Query,
    ) -> ExecutionResult<Value> {
        let executor = QueryExecutor::new(schema, graph, &self.engine);
        executor.execute(query).await
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{care_bear_graph, care_bear_schema};
    use serde_json::json;

    #[tokio::test]
    async fn test_execute_by_id() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let engine = QueryEngine::new();

        let result = engine
            .execute(
                &schema,
                &graph,
                &json!({"type": "bears", "id": "2", "select": ["name", "home.name"]}),
            )
            .await
            .unwrap();
        assert_eq!(
            result,
            json!({"name": "Cheer Bear", "home.name": "Care-a-Lot"})
        );
    }

    #[tokio::test]
    async fn test_execute_missing_id_is_null() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let engine = QueryEngine::new();

        let result = engine
            .execute(&schema, &graph, &json!({"type": "bears", "id": "9", "select": "name"}))
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_where_order_and_expression_select() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let engine = QueryEngine::new();

        let result = engine
            .execute(
                &schema,
                &graph,
                &json!({
                    "type": "bears",
                    "select": {
                        "name": "name",
                        "powerCount": {"$count": {"$get": "powers"}}
                    },
                    "where": {"home": {"name": "Care-a-Lot"}},
                    "order": [{"name": "desc"}]
                }),
            )
            .await
            .unwrap();

        assert_eq!(
            result,
            json!([
                {"name": "Wish Bear", "powerCount": 2},
                {"name": "Tenderheart Bear", "powerCount": 1},
                {"name": "Cheer Bear", "powerCount": 1}
            ])
        );
    }

    #[tokio::test]
    async fn test_validation_happens_before_execution() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let engine = QueryEngine::new();

        let err = engine
            .execute(&schema, &graph, &json!({"type": "bears", "select": "name", "limit": 0}))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Validation(_)));
    }
}
