//! Query execution engine using the Volcano iterator model
//!
//! Filtering, ordering and pagination run as a pipeline of physical operators
//! pulling records from a candidate scan. Projection is the final stage: each
//! surviving resource is projected concurrently, and nested sub-queries fan out
//! as independent futures joined before the parent completes.

pub mod operator;
pub mod planner;
pub mod record;

pub use operator::{
    FilterOperator, OperatorBox, PhysicalOperator, ScanOperator, SliceOperator, SortOperator,
};
pub use planner::{ExecutionPlan, QueryPlanner};
pub use record::Record;

use crate::expression::{get_path, ExpressionEngine, ExpressionError};
use crate::graph::{
    materialize, Graph, GraphError, Reference, RelationshipValue, Resource, ViewShape,
};
use crate::query::ast::{Query, Selector};
use crate::schema::Schema;
use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

static NULL: Value = Value::Null;

/// A single violated query constraint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("unknown resource type '{0}'")]
    UnknownResourceType(String),

    #[error("missing clause '{0}'")]
    MissingClause(String),

    #[error("unknown clause '{0}'")]
    UnknownClause(String),

    #[error("unknown attribute '{attribute}' on type {resource_type}")]
    UnknownAttribute {
        resource_type: String,
        attribute: String,
    },

    #[error("unknown relationship '{relationship}' on type {resource_type}")]
    UnknownRelationship {
        resource_type: String,
        relationship: String,
    },

    #[error("invalid id {0}")]
    InvalidId(Value),

    #[error("limit must be an integer of at least 1, got {0}")]
    InvalidLimit(Value),

    #[error("offset must be a non-negative integer, got {0}")]
    InvalidOffset(Value),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("malformed select: {0}")]
    MalformedSelect(String),

    #[error("malformed where: {0}")]
    MalformedWhere(String),

    #[error("sub-queries nest deeper than {max}")]
    QueryTooDeep { max: usize },

    #[error("'{path}' follows more than {max} relationships")]
    PathTooDeep { path: String, max: usize },
}

fn list_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Every constraint the query violates
    #[error("Invalid query: {}", list_violations(.0))]
    Validation(Vec<Violation>),

    #[error("Dangling reference: {source_ref}.{relationship} points at missing {target}")]
    DanglingReference {
        source_ref: Reference,
        relationship: String,
        target: Reference,
    },

    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("Graph error: {0}")]
    Graph(GraphError),
}

impl ExecutionError {
    pub fn violations(&self) -> &[Violation] {
        match self {
            ExecutionError::Validation(violations) => violations,
            _ => &[],
        }
    }
}

impl From<GraphError> for ExecutionError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::DanglingReference {
                source_ref,
                relationship,
                target,
            } => ExecutionError::DanglingReference {
                source_ref,
                relationship,
                target,
            },
            other => ExecutionError::Graph(other),
        }
    }
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Read-only state shared by every operator of one query
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub schema: &'a Schema,
    pub graph: &'a Graph,
    pub engine: &'a ExpressionEngine,
}

/// Query executor over a borrowed graph
pub struct QueryExecutor<'a> {
    ctx: ExecutionContext<'a>,
    planner: QueryPlanner,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(schema: &'a Schema, graph: &'a Graph, engine: &'a ExpressionEngine) -> Self {
        Self {
            ctx: ExecutionContext {
                schema,
                graph,
                engine,
            },
            planner: QueryPlanner::new(),
        }
    }

    /// Execute a canonical query.
    ///
    /// With an id the result is the projected resource or null; otherwise an array.
    pub async fn execute(&self, query: &Query) -> ExecutionResult<Value> {
        let candidates: Vec<&'a Resource> = match &query.id {
            Some(id) => self
                .ctx
                .graph
                .find_one(&Reference::new(&query.resource_type, id))
                .into_iter()
                .collect(),
            None => self.ctx.graph.find(&query.resource_type).collect(),
        };

        let rows = self.run(query, candidates)?;
        if query.is_single() {
            return match rows.first() {
                Some(resource) => self.project(query, resource).await,
                None => Ok(Value::Null),
            };
        }
        self.project_all(query, &rows).await
    }

    /// Run the operator pipeline, returning surviving resources in order
    fn run(&self, query: &Query, candidates: Vec<&'a Resource>) -> ExecutionResult<Vec<&'a Resource>> {
        let candidate_count = candidates.len();
        let mut plan = self.planner.plan(&self.ctx, query, candidates);

        let mut rows = Vec::new();
        while let Some(record) = plan.root.next(&self.ctx)? {
            rows.push(record.resource);
        }

        debug!(
            "Query on {}: {} candidates, {} rows",
            query.resource_type,
            candidate_count,
            rows.len()
        );
        Ok(rows)
    }

    async fn project_all(&self, query: &Query, rows: &[&'a Resource]) -> ExecutionResult<Value> {
        let projected = join_all(rows.iter().map(|resource| self.project(query, resource))).await;
        projected
            .into_iter()
            .collect::<ExecutionResult<Vec<_>>>()
            .map(Value::Array)
    }

    /// Project one resource through the select map
    fn project<'b>(&'b self, query: &'b Query, resource: &'b Resource) -> BoxFuture<'b, ExecutionResult<Value>> {
        async move {
            let id_attribute = self
                .ctx
                .schema
                .resource(&resource.resource_type)
                .map(|def| def.id_attribute.as_str())
                .unwrap_or("id");

            // one materialized view per distinct shape the selectors read
            let mut views: Vec<(ViewShape, Value)> = Vec::new();
            let mut view_of: Vec<Option<usize>> = Vec::with_capacity(query.select.len());
            for selector in query.select.values() {
                let shape = self.planner.selector_shape(
                    self.ctx.schema,
                    self.ctx.engine,
                    &resource.resource_type,
                    selector,
                );
                let index = match shape {
                    Some(shape) => match views.iter().position(|(known, _)| *known == shape) {
                        Some(index) => Some(index),
                        None => {
                            let view = materialize(self.ctx.schema, self.ctx.graph, resource, &shape)?;
                            views.push((shape, view));
                            Some(views.len() - 1)
                        }
                    },
                    None => None,
                };
                view_of.push(index);
            }
            let view_at = |position: usize| {
                view_of[position]
                    .and_then(|index| views.get(index))
                    .map(|(_, view)| view)
                    .unwrap_or(&NULL)
            };

            let mut slots: Vec<(String, Option<Value>)> = Vec::with_capacity(query.select.len());
            let mut pending = Vec::new();
            for (position, (key, selector)) in query.select.iter().enumerate() {
                let value = match selector {
                    Selector::Attribute(name) => Some(resource.attribute(id_attribute, name)),
                    Selector::Path(path) => Some(get_path(view_at(position), path)),
                    Selector::Expression(expression) => {
                        Some(self.ctx.engine.apply(expression, view_at(position))?)
                    }
                    Selector::SubQuery {
                        relationship,
                        query: sub,
                    } => {
                        pending.push(self.sub_query(resource, relationship, sub));
                        None
                    }
                };
                slots.push((key.clone(), value));
            }

            // all siblings finish before the first failure is reported
            let mut nested = join_all(pending).await.into_iter();
            let mut output = Map::with_capacity(slots.len());
            for (key, value) in slots {
                let value = match value {
                    Some(value) => value,
                    None => nested.next().unwrap_or(Ok(Value::Null))?,
                };
                output.insert(key, value);
            }
            Ok(Value::Object(output))
        }
        .boxed()
    }

    /// Run a sub-query over a relationship's targets.
    ///
    /// A to-many relationship is queried as one set so order and limit apply
    /// across all of its members.
    fn sub_query<'b>(
        &'b self,
        resource: &'b Resource,
        relationship: &'b str,
        query: &'b Query,
    ) -> BoxFuture<'b, ExecutionResult<Value>> {
        async move {
            match resource.relationship(relationship) {
                None | Some(RelationshipValue::One(None)) => Ok(Value::Null),
                Some(RelationshipValue::One(Some(target))) => {
                    let target = self.ctx.graph.dereference(resource, relationship, target)?;
                    let rows = self.run(query, vec![target])?;
                    match rows.first() {
                        Some(row) => self.project(query, row).await,
                        None => Ok(Value::Null),
                    }
                }
                Some(RelationshipValue::Many(targets)) => {
                    let mut members = Vec::with_capacity(targets.len());
                    for target in targets {
                        members.push(self.ctx.graph.dereference(resource, relationship, target)?);
                    }
                    let rows = self.run(query, members)?;
                    self.project_all(query, &rows).await
                }
            }
        }
        .boxed()
    }
}
