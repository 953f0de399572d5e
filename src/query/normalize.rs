//! Query normalization
//!
//! Turns the caller-facing JSON query into a canonical [`Query`]. Every
//! shorthand is expanded and every name is checked against the schema before
//! any data is touched. Violations are collected rather than reported one at a
//! time so a caller sees everything wrong with a query in one pass.

use super::ast::{Direction, OrderBy, Query, Selector};
use super::executor::{ExecutionError, ExecutionResult, Violation};
use crate::config::EngineConfig;
use crate::expression::ExpressionEngine;
use crate::graph::id_from_value;
use crate::schema::{ResourceDef, Schema};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

const ROOT_CLAUSES: &[&str] = &["type", "id", "select", "where", "order", "limit", "offset"];
const SUB_QUERY_CLAUSES: &[&str] = &["select", "where", "order", "limit", "offset"];

/// Validate and canonicalize a query.
pub fn normalize_query(
    schema: &Schema,
    engine: &ExpressionEngine,
    config: &EngineConfig,
    query: &Value,
) -> ExecutionResult<Query> {
    let mut normalizer = Normalizer {
        schema,
        engine,
        config,
        violations: Vec::new(),
    };

    let normalized = normalizer.root(query);
    match normalized {
        Some(query) if normalizer.violations.is_empty() => {
            debug!(
                "Normalized query on {} with {} selectors",
                query.resource_type,
                query.select.len()
            );
            Ok(query)
        }
        _ => Err(ExecutionError::Validation(normalizer.violations)),
    }
}

struct Normalizer<'s> {
    schema: &'s Schema,
    engine: &'s ExpressionEngine,
    config: &'s EngineConfig,
    violations: Vec<Violation>,
}

impl<'s> Normalizer<'s> {
    fn root(&mut self, query: &Value) -> Option<Query> {
        let Value::Object(clauses) = query else {
            self.violations
                .push(Violation::MalformedSelect("query must be an object".to_string()));
            return None;
        };

        let resource_type = match clauses.get("type") {
            Some(Value::String(t)) => t.clone(),
            Some(other) => {
                self.violations.push(Violation::UnknownResourceType(other.to_string()));
                return None;
            }
            None => {
                self.violations.push(Violation::MissingClause("type".to_string()));
                return None;
            }
        };
        let Some(def) = self.schema.resource(&resource_type) else {
            self.violations.push(Violation::UnknownResourceType(resource_type));
            return None;
        };

        let mut query = self.clause(&resource_type, def, clauses, ROOT_CLAUSES, 0);
        if let Some(id) = clauses.get("id") {
            match id_from_value(id) {
                Some(id) => query.id = Some(id),
                None => self.violations.push(Violation::InvalidId(id.clone())),
            }
        }
        Some(query)
    }

    /// Shared handling of a root clause or a sub-query clause
    fn clause(
        &mut self,
        resource_type: &str,
        def: &'s ResourceDef,
        clauses: &Map<String, Value>,
        allowed: &[&str],
        depth: usize,
    ) -> Query {
        let mut query = Query::new(resource_type);

        for key in clauses.keys() {
            if !allowed.contains(&key.as_str()) {
                self.violations.push(Violation::UnknownClause(key.clone()));
            }
        }

        match clauses.get("select") {
            Some(select) => query.select = self.select(resource_type, def, select, depth),
            None => self.violations.push(Violation::MissingClause("select".to_string())),
        }

        if let Some(clause) = clauses.get("where") {
            query.where_clause = self.where_clause(resource_type, clause);
        }

        if let Some(order) = clauses.get("order") {
            query.order = self.order(resource_type, order);
        }

        if let Some(limit) = clauses.get("limit") {
            match limit.as_u64() {
                Some(n) if n >= 1 => query.limit = Some(n as usize),
                _ => self.violations.push(Violation::InvalidLimit(limit.clone())),
            }
        }

        if let Some(offset) = clauses.get("offset") {
            match offset.as_u64() {
                Some(n) => query.offset = n as usize,
                None => self.violations.push(Violation::InvalidOffset(offset.clone())),
            }
        }

        query
    }

    fn select(
        &mut self,
        resource_type: &str,
        def: &'s ResourceDef,
        select: &Value,
        depth: usize,
    ) -> IndexMap<String, Selector> {
        let mut selectors = IndexMap::new();
        match select {
            Value::String(_) => self.select_item(resource_type, def, select, depth, &mut selectors),
            Value::Array(items) => {
                for item in items {
                    self.select_item(resource_type, def, item, depth, &mut selectors);
                }
            }
            Value::Object(entries) => {
                for (key, value) in entries {
                    if let Some(selector) = self.selector(resource_type, def, key, value, depth) {
                        selectors.insert(key.clone(), selector);
                    }
                }
            }
            other => self.violations.push(Violation::MalformedSelect(format!(
                "expected a string, array or object, got {}",
                other
            ))),
        }
        selectors
    }

    fn select_item(
        &mut self,
        resource_type: &str,
        def: &'s ResourceDef,
        item: &Value,
        depth: usize,
        selectors: &mut IndexMap<String, Selector>,
    ) {
        match item {
            Value::String(name) if name == "*" => {
                for attribute in def.attribute_names() {
                    selectors.insert(
                        attribute.to_string(),
                        Selector::Attribute(attribute.to_string()),
                    );
                }
            }
            Value::String(name) => {
                if let Some(selector) = self.path_selector(resource_type, name) {
                    selectors.insert(name.clone(), selector);
                }
            }
            Value::Object(entries) => {
                for (key, value) in entries {
                    if let Some(selector) = self.selector(resource_type, def, key, value, depth) {
                        selectors.insert(key.clone(), selector);
                    }
                }
            }
            other => self.violations.push(Violation::MalformedSelect(format!(
                "select entries must be strings or objects, got {}",
                other
            ))),
        }
    }

    /// Selector for one `output key -> value` entry
    fn selector(
        &mut self,
        resource_type: &str,
        def: &'s ResourceDef,
        key: &str,
        value: &Value,
        depth: usize,
    ) -> Option<Selector> {
        match value {
            Value::String(path) => self.path_selector(resource_type, path),
            Value::Object(_) if self.engine.is_expression(value) => self
                .check_input_paths(resource_type, value)
                .then(|| Selector::Expression(value.clone())),
            Value::Object(clauses) => {
                let Some(relationship) = def.relationship(key) else {
                    self.violations.push(Violation::UnknownRelationship {
                        resource_type: resource_type.to_string(),
                        relationship: key.to_string(),
                    });
                    return None;
                };
                if depth + 1 > self.config.max_query_depth {
                    self.violations.push(Violation::QueryTooDeep {
                        max: self.config.max_query_depth,
                    });
                    return None;
                }
                let target_type = relationship.target_type.as_str();
                let target_def = self.schema.resource(target_type)?;
                let query =
                    self.clause(target_type, target_def, clauses, SUB_QUERY_CLAUSES, depth + 1);
                Some(Selector::SubQuery {
                    relationship: key.to_string(),
                    query: Box::new(query),
                })
            }
            other => {
                self.violations.push(Violation::MalformedSelect(format!(
                    "'{}' must select a path, an expression or a sub-query, got {}",
                    key, other
                )));
                None
            }
        }
    }

    fn path_selector(&mut self, resource_type: &str, path: &str) -> Option<Selector> {
        let def = self.schema.resource(resource_type)?;
        if def.has_attribute(path) {
            return Some(Selector::Attribute(path.to_string()));
        }
        self.check_path(resource_type, path)
            .then(|| Selector::Path(path.to_string()))
    }

    /// Walk a dotted path through the schema, recording what is wrong with it.
    ///
    /// Segments after an attribute address the inside of its value and are not
    /// checked further.
    fn check_path(&mut self, resource_type: &str, path: &str) -> bool {
        let mut current = resource_type.to_string();
        let mut hops: usize = 0;
        let mut ends_in_attribute = false;

        for segment in path.split('.') {
            if segment == "$" || segment.parse::<usize>().is_ok() {
                continue;
            }
            let Some(def) = self.schema.resource(&current) else {
                return false;
            };
            if def.has_attribute(segment) {
                ends_in_attribute = true;
                break;
            }
            match def.relationship(segment) {
                Some(relationship) => {
                    hops += 1;
                    current = relationship.target_type.clone();
                }
                None => {
                    self.violations.push(Violation::UnknownAttribute {
                        resource_type: current,
                        attribute: segment.to_string(),
                    });
                    return false;
                }
            }
        }

        // a trailing relationship renders as references
        let dereferences = if ends_in_attribute {
            hops
        } else {
            hops.saturating_sub(1)
        };
        if dereferences > self.config.max_path_depth {
            self.violations.push(Violation::PathTooDeep {
                path: path.to_string(),
                max: self.config.max_path_depth,
            });
            return false;
        }
        true
    }

    fn where_clause(&mut self, resource_type: &str, clause: &Value) -> Option<Value> {
        match self.engine.normalize_where(clause, None) {
            Ok(normalized) => self
                .check_input_paths(resource_type, &normalized)
                .then_some(normalized),
            Err(err) => {
                self.violations.push(Violation::MalformedWhere(err.to_string()));
                None
            }
        }
    }

    /// Check every path an expression reads from the resource it runs against
    fn check_input_paths(&mut self, resource_type: &str, expression: &Value) -> bool {
        let mut valid = true;
        for path in self.engine.input_paths(expression) {
            valid &= self.check_path(resource_type, &path);
        }
        valid
    }

    fn order(&mut self, resource_type: &str, order: &Value) -> Vec<OrderBy> {
        let mut keys = Vec::new();
        match order {
            Value::Object(_) => self.order_entry(resource_type, order, &mut keys),
            Value::Array(entries) => {
                for entry in entries {
                    self.order_entry(resource_type, entry, &mut keys);
                }
            }
            other => self.violations.push(Violation::InvalidOrder(format!(
                "expected an object or array, got {}",
                other
            ))),
        }
        keys
    }

    fn order_entry(&mut self, resource_type: &str, entry: &Value, keys: &mut Vec<OrderBy>) {
        let Value::Object(entries) = entry else {
            self.violations.push(Violation::InvalidOrder(format!(
                "order entries must be objects, got {}",
                entry
            )));
            return;
        };

        for (path, direction) in entries {
            let direction = match direction.as_str().and_then(Direction::parse) {
                Some(direction) => direction,
                None => {
                    self.violations.push(Violation::InvalidOrder(format!(
                        "'{}' must be \"asc\" or \"desc\", got {}",
                        path, direction
                    )));
                    continue;
                }
            };
            if self.check_path(resource_type, path) {
                keys.push(OrderBy {
                    path: path.clone(),
                    direction,
                });
            }
        }
    }
}
