//! Where-clause normalization
//!
//! Rewrites the terse where syntax into a single boolean expression over a
//! materialized resource:
//!
//! - `{name: "x"}` becomes `{$eq: [{$get: "name"}, "x"]}`
//! - `{home: {name: "x"}}` extends the path to `home.name`
//! - `{age: {$gt: 4}}` becomes `{$gt: [{$get: "age"}, 4]}`
//! - `{tags: {$any: "red"}}` pipes the attribute into the iteration
//! - several keys are joined with `$and`

use super::{ExpressionDef, ExpressionEngine, ExpressionError, ExpressionKind, ExpressionResult};
use super::value::type_name;
use serde_json::{json, Map, Value};

fn single(name: &str, operand: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(name.to_string(), operand);
    Value::Object(map)
}

fn get(path: &str) -> Value {
    json!({ "$get": path })
}

fn conjunction(mut parts: Vec<Value>) -> Value {
    if parts.len() == 1 {
        return parts.remove(0);
    }
    single("$and", Value::Array(parts))
}

impl ExpressionEngine {
    /// Normalize a where clause, optionally rooted at an attribute path
    pub fn normalize_where(
        &self,
        clause: &Value,
        attribute_path: Option<&str>,
    ) -> ExpressionResult<Value> {
        if let Some((def, operand)) = self.split(clause) {
            return match attribute_path {
                Some(path) => self.normalize_at_path(def, operand, path),
                None if def.kind() == ExpressionKind::Logical => {
                    self.normalize_logical(def, operand, None)
                }
                None => Ok(clause.clone()),
            };
        }

        match clause {
            Value::Object(entries) => {
                let mut parts = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    if key.starts_with('$') {
                        if self.definition(key).is_none() {
                            return Err(ExpressionError::malformed_where(format!(
                                "unknown expression '{}'",
                                key
                            )));
                        }
                        let expression = single(key, value.clone());
                        parts.push(self.normalize_where(&expression, attribute_path)?);
                        continue;
                    }

                    let path = match attribute_path {
                        Some(prefix) => format!("{}.{}", prefix, key),
                        None => key.clone(),
                    };
                    parts.push(self.normalize_where(value, Some(&path))?);
                }
                Ok(conjunction(parts))
            }
            other => match attribute_path {
                Some(path) => Ok(single("$eq", json!([get(path), other]))),
                None if other.is_boolean() => Ok(other.clone()),
                None => Err(ExpressionError::malformed_where(format!(
                    "expected an object, got {}",
                    type_name(other)
                ))),
            },
        }
    }

    fn normalize_logical(
        &self,
        def: &ExpressionDef,
        operand: &Value,
        attribute_path: Option<&str>,
    ) -> ExpressionResult<Value> {
        let normalized = match operand {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.normalize_where(item, attribute_path))
                    .collect::<ExpressionResult<Vec<_>>>()?,
            ),
            other => self.normalize_where(other, attribute_path)?,
        };
        Ok(single(def.name(), normalized))
    }

    fn normalize_at_path(
        &self,
        def: &ExpressionDef,
        operand: &Value,
        path: &str,
    ) -> ExpressionResult<Value> {
        match def.kind() {
            ExpressionKind::Logical => self.normalize_logical(def, operand, Some(path)),
            ExpressionKind::Comparative => Ok(single(def.name(), json!([get(path), operand]))),
            ExpressionKind::Iterative if def.controls_evaluation() => {
                let per_item = self.normalize_item(operand)?;
                Ok(single(
                    "$pipe",
                    json!([get(path), single(def.name(), per_item)]),
                ))
            }
            // any other expression computes the value the attribute must equal
            _ => Ok(single(
                "$eq",
                json!([get(path), single(def.name(), operand.clone())]),
            )),
        }
    }

    /// Clause applied to each item of an array attribute
    fn normalize_item(&self, operand: &Value) -> ExpressionResult<Value> {
        if operand.is_object() {
            return self.normalize_where(operand, None);
        }
        Ok(single("$eq", json!([{ "$echo": null }, operand])))
    }
}
