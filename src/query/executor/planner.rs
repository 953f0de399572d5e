//! Query planner - converts a canonical query into a physical operator tree
//!
//! The pipeline is always `Scan -> Filter? -> Sort? -> Slice?`. The only real
//! decision is which relationships the scan must dereference so the later
//! stages can see what they reference.

use super::operator::{
    FilterOperator, OperatorBox, ScanOperator, SliceOperator, SortOperator,
};
use super::ExecutionContext;
use crate::expression::ExpressionEngine;
use crate::graph::{Resource, ViewShape};
use crate::query::ast::{Query, Selector};
use crate::schema::Schema;

/// Execution plan - tree of physical operators
pub struct ExecutionPlan<'a> {
    /// Root operator
    pub root: OperatorBox<'a>,
}

/// Query planner
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryPlanner;

impl QueryPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Build the operator pipeline over a candidate set
    pub fn plan<'a>(
        &self,
        ctx: &ExecutionContext<'a>,
        query: &Query,
        candidates: Vec<&'a Resource>,
    ) -> ExecutionPlan<'a> {
        let shape = self.filter_shape(ctx.schema, ctx.engine, query);
        let mut root: OperatorBox<'a> = Box::new(ScanOperator::new(candidates, shape));

        if let Some(predicate) = &query.where_clause {
            root = Box::new(FilterOperator::new(root, predicate.clone()));
        }

        if !query.order.is_empty() {
            root = Box::new(SortOperator::new(root, query.order.clone()));
        }

        if query.offset > 0 || query.limit.is_some() {
            root = Box::new(SliceOperator::new(root, query.offset, query.limit));
        }

        ExecutionPlan { root }
    }

    /// View the filter and sort stages read, `None` when neither runs
    fn filter_shape(
        &self,
        schema: &Schema,
        engine: &ExpressionEngine,
        query: &Query,
    ) -> Option<ViewShape> {
        if query.where_clause.is_none() && query.order.is_empty() {
            return None;
        }

        let mut paths = query
            .where_clause
            .as_ref()
            .map(|clause| engine.input_paths(clause))
            .unwrap_or_default();
        paths.extend(query.order.iter().map(|key| key.path.clone()));

        Some(ViewShape::from_paths(
            schema,
            &query.resource_type,
            paths.iter().map(String::as_str),
        ))
    }

    /// View one selector reads, `None` when it reads the raw resource
    pub fn selector_shape(
        &self,
        schema: &Schema,
        engine: &ExpressionEngine,
        resource_type: &str,
        selector: &Selector,
    ) -> Option<ViewShape> {
        match selector {
            Selector::Path(path) => Some(ViewShape::from_paths(
                schema,
                resource_type,
                [path.as_str()],
            )),
            Selector::Expression(expression) => {
                let paths = engine.input_paths(expression);
                Some(ViewShape::from_paths(
                    schema,
                    resource_type,
                    paths.iter().map(String::as_str),
                ))
            }
            Selector::Attribute(_) | Selector::SubQuery { .. } => None,
        }
    }
}
