//! Physical operators
//!
//! Each operator pulls records from its input one at a time. Sort is the only
//! blocking operator: it drains its input before yielding.

use super::record::Record;
use super::{ExecutionContext, ExecutionResult};
use crate::expression::{compare_values, get_path, type_name, ExpressionError};
use crate::graph::{materialize, Resource, ViewShape};
use crate::query::ast::{Direction, OrderBy};
use serde_json::Value;
use std::cmp::Ordering;

/// Physical operator trait (Volcano iterator model)
pub trait PhysicalOperator<'a> {
    /// Get the next record from this operator
    fn next(&mut self, ctx: &ExecutionContext<'a>) -> ExecutionResult<Option<Record<'a>>>;

    /// Reset the operator to start from the beginning
    fn reset(&mut self);
}

/// Type alias for boxed operators
pub type OperatorBox<'a> = Box<dyn PhysicalOperator<'a> + 'a>;

/// Scan over a fixed candidate set
pub struct ScanOperator<'a> {
    candidates: Vec<&'a Resource>,
    /// View to build per candidate; `None` when no later stage reads it
    shape: Option<ViewShape>,
    current: usize,
}

impl<'a> ScanOperator<'a> {
    pub fn new(candidates: Vec<&'a Resource>, shape: Option<ViewShape>) -> Self {
        Self {
            candidates,
            shape,
            current: 0,
        }
    }
}

impl<'a> PhysicalOperator<'a> for ScanOperator<'a> {
    fn next(&mut self, ctx: &ExecutionContext<'a>) -> ExecutionResult<Option<Record<'a>>> {
        let Some(resource) = self.candidates.get(self.current).copied() else {
            return Ok(None);
        };
        self.current += 1;

        let view = match &self.shape {
            Some(shape) => materialize(ctx.schema, ctx.graph, resource, shape)?,
            None => Value::Null,
        };
        Ok(Some(Record::new(resource, view)))
    }

    fn reset(&mut self) {
        self.current = 0;
    }
}

/// Filter operator: keeps records whose predicate applies to `true`
pub struct FilterOperator<'a> {
    input: OperatorBox<'a>,
    predicate: Value,
}

impl<'a> FilterOperator<'a> {
    pub fn new(input: OperatorBox<'a>, predicate: Value) -> Self {
        Self { input, predicate }
    }

    fn matches(&self, record: &Record<'a>, ctx: &ExecutionContext<'a>) -> ExecutionResult<bool> {
        match ctx.engine.apply(&self.predicate, &record.view)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(ExpressionError::invalid_operand("where", "boolean", type_name(&other)).into()),
        }
    }
}

impl<'a> PhysicalOperator<'a> for FilterOperator<'a> {
    fn next(&mut self, ctx: &ExecutionContext<'a>) -> ExecutionResult<Option<Record<'a>>> {
        while let Some(record) = self.input.next(ctx)? {
            if self.matches(&record, ctx)? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.input.reset();
    }
}

/// Sort operator: stable multi-key sort, ties broken left to right
pub struct SortOperator<'a> {
    input: OperatorBox<'a>,
    order: Vec<OrderBy>,
    records: Vec<Record<'a>>,
    current: usize,
    executed: bool,
}

impl<'a> SortOperator<'a> {
    pub fn new(input: OperatorBox<'a>, order: Vec<OrderBy>) -> Self {
        Self {
            input,
            order,
            records: Vec::new(),
            current: 0,
            executed: false,
        }
    }

    fn compare(order: &[OrderBy], a: &Record<'a>, b: &Record<'a>) -> Ordering {
        for key in order {
            let ord = compare_values(&get_path(&a.view, &key.path), &get_path(&b.view, &key.path));
            if ord != Ordering::Equal {
                return match key.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                };
            }
        }
        Ordering::Equal
    }
}

impl<'a> PhysicalOperator<'a> for SortOperator<'a> {
    fn next(&mut self, ctx: &ExecutionContext<'a>) -> ExecutionResult<Option<Record<'a>>> {
        if !self.executed {
            while let Some(record) = self.input.next(ctx)? {
                self.records.push(record);
            }
            let order = &self.order;
            self.records.sort_by(|a, b| Self::compare(order, a, b));
            self.executed = true;
        }

        let Some(record) = self.records.get(self.current).cloned() else {
            return Ok(None);
        };
        self.current += 1;
        Ok(Some(record))
    }

    fn reset(&mut self) {
        self.input.reset();
        self.executed = false;
        self.records.clear();
        self.current = 0;
    }
}

/// Slice operator: OFFSET then LIMIT
pub struct SliceOperator<'a> {
    input: OperatorBox<'a>,
    offset: usize,
    limit: Option<usize>,
    skipped: usize,
    count: usize,
}

impl<'a> SliceOperator<'a> {
    pub fn new(input: OperatorBox<'a>, offset: usize, limit: Option<usize>) -> Self {
        Self {
            input,
            offset,
            limit,
            skipped: 0,
            count: 0,
        }
    }
}

impl<'a> PhysicalOperator<'a> for SliceOperator<'a> {
    fn next(&mut self, ctx: &ExecutionContext<'a>) -> ExecutionResult<Option<Record<'a>>> {
        if self.limit.is_some_and(|limit| self.count >= limit) {
            return Ok(None);
        }

        while self.skipped < self.offset {
            if self.input.next(ctx)?.is_none() {
                return Ok(None);
            }
            self.skipped += 1;
        }

        match self.input.next(ctx)? {
            Some(record) => {
                self.count += 1;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn reset(&mut self) {
        self.input.reset();
        self.skipped = 0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionEngine;
    use crate::test_fixtures::{care_bear_graph, care_bear_schema};
    use serde_json::json;

    fn drain<'a>(op: &mut OperatorBox<'a>, ctx: &ExecutionContext<'a>) -> Vec<String> {
        let mut ids = Vec::new();
        while let Some(record) = op.next(ctx).unwrap() {
            ids.push(record.resource.id.clone());
        }
        ids
    }

    #[test]
    fn test_scan_filter_sort_slice() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let engine = ExpressionEngine::new();
        let ctx = ExecutionContext {
            schema: &schema,
            graph: &graph,
            engine: &engine,
        };

        let scan: OperatorBox = Box::new(ScanOperator::new(
            graph.find("bears").collect(),
            Some(ViewShape::new()),
        ));
        let filter: OperatorBox = Box::new(FilterOperator::new(
            scan,
            json!({"$eq": [{"$get": "yearIntroduced"}, 1982]}),
        ));
        let sort: OperatorBox = Box::new(SortOperator::new(filter, vec![OrderBy::desc("name")]));
        let mut slice: OperatorBox = Box::new(SliceOperator::new(sort, 1, Some(1)));

        // Wish, Tenderheart, Cheer -> skip one, take one
        assert_eq!(drain(&mut slice, &ctx), vec!["1"]);

        slice.reset();
        assert_eq!(drain(&mut slice, &ctx), vec!["1"]);
    }

    #[test]
    fn test_slice_offset_past_end() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let engine = ExpressionEngine::new();
        let ctx = ExecutionContext {
            schema: &schema,
            graph: &graph,
            engine: &engine,
        };

        let scan: OperatorBox = Box::new(ScanOperator::new(graph.find("bears").collect(), None));
        let mut slice: OperatorBox = Box::new(SliceOperator::new(scan, 10, None));
        assert!(drain(&mut slice, &ctx).is_empty());
    }

    #[test]
    fn test_non_boolean_predicate_fails() {
        let schema = care_bear_schema();
        let graph = care_bear_graph();
        let engine = ExpressionEngine::new();
        let ctx = ExecutionContext {
            schema: &schema,
            graph: &graph,
            engine: &engine,
        };

        let scan: OperatorBox = Box::new(ScanOperator::new(
            graph.find("bears").collect(),
            Some(ViewShape::new()),
        ));
        let mut filter: OperatorBox = Box::new(FilterOperator::new(scan, json!({"$get": "name"})));
        assert!(filter.next(&ctx).is_err());
    }
}
