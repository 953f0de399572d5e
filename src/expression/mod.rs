//! Expression engine
//!
//! Expressions are JSON objects with exactly one key naming a registered
//! expression (for example `{"$gt": [{"$get": "age"}, 4]}`). An expression can
//! be *applied* to an input value, or *evaluated* without input when every
//! expression inside it supports input-free evaluation.
//!
//! The registry is flat: every definition lives in one map keyed by name.
//! Definitions are grouped by [`ExpressionKind`], which the where-clause
//! normalizer uses to decide how to rewrite a terse clause.

pub mod definitions;
pub mod error;
mod input_paths;
pub mod value;
pub mod where_clause;

pub use error::{ExpressionError, ExpressionResult};
pub use value::{compare_values, get_path, type_name, values_equal};

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

/// Name of the expression whose operand is never looked into
pub const LITERAL: &str = "$literal";

/// Apply an expression's operand against an input value
pub type ApplyFn = fn(&Value, &Value, &ExpressionEngine) -> ExpressionResult<Value>;

/// Evaluate an expression's operand without input
pub type EvaluateFn = fn(&Value, &ExpressionEngine) -> ExpressionResult<Value>;

/// Expression family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    Access,
    Comparative,
    Logical,
    Arithmetic,
    Iterative,
    Conditional,
    Aggregative,
    Generative,
    Temporal,
    String,
}

/// A registered expression.
///
/// Either `apply` or `evaluate` is always present. A definition built with
/// [`ExpressionDef::pure`] has no input-aware form: applying it evaluates its
/// resolved operand. A definition built with [`ExpressionDef::new`] needs input
/// and is not evaluable unless [`ExpressionDef::with_evaluate`] adds a form.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionDef {
    name: &'static str,
    kind: ExpressionKind,
    controls_evaluation: bool,
    apply: Option<ApplyFn>,
    evaluate: Option<EvaluateFn>,
}

impl ExpressionDef {
    /// Input-aware expression
    pub fn new(name: &'static str, kind: ExpressionKind, apply: ApplyFn) -> Self {
        Self {
            name,
            kind,
            controls_evaluation: false,
            apply: Some(apply),
            evaluate: None,
        }
    }

    /// Expression computed purely from its operand
    pub fn pure(name: &'static str, kind: ExpressionKind, evaluate: EvaluateFn) -> Self {
        Self {
            name,
            kind,
            controls_evaluation: false,
            apply: None,
            evaluate: Some(evaluate),
        }
    }

    pub fn with_evaluate(mut self, evaluate: EvaluateFn) -> Self {
        self.evaluate = Some(evaluate);
        self
    }

    /// Receive the operand unresolved and decide what to evaluate
    pub fn controlling(mut self) -> Self {
        self.controls_evaluation = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ExpressionKind {
        self.kind
    }

    pub fn controls_evaluation(&self) -> bool {
        self.controls_evaluation
    }

    pub fn is_evaluable(&self) -> bool {
        self.evaluate.is_some()
    }
}

/// Expression registry and evaluator
#[derive(Debug, Clone)]
pub struct ExpressionEngine {
    definitions: FxHashMap<&'static str, ExpressionDef>,
}

impl ExpressionEngine {
    /// Engine with every built-in expression registered
    pub fn new() -> Self {
        let mut engine = Self::empty();
        for def in definitions::builtin() {
            engine.register(def);
        }
        engine
    }

    pub fn empty() -> Self {
        Self {
            definitions: FxHashMap::default(),
        }
    }

    /// Register a definition, returning the one it replaced
    pub fn register(&mut self, def: ExpressionDef) -> Option<ExpressionDef> {
        self.definitions.insert(def.name, def)
    }

    pub fn definition(&self, name: &str) -> Option<&ExpressionDef> {
        self.definitions.get(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Split a single-key object naming a registered expression
    pub fn split<'v>(&self, value: &'v Value) -> Option<(&ExpressionDef, &'v Value)> {
        let map = value.as_object()?;
        if map.len() != 1 {
            return None;
        }
        let (key, operand) = map.iter().next()?;
        self.definitions.get(key.as_str()).map(|def| (def, operand))
    }

    pub fn is_expression(&self, value: &Value) -> bool {
        self.split(value).is_some()
    }

    /// True when `expression` contains nothing that needs input data.
    ///
    /// `evaluate` succeeds past this check, though domain errors such as
    /// division by zero may still occur.
    pub fn is_evaluable(&self, expression: &Value) -> bool {
        match self.split(expression) {
            Some((def, operand)) => {
                def.evaluate.is_some() && (def.name == LITERAL || self.is_evaluable(operand))
            }
            None => match expression {
                Value::Array(items) => items.iter().all(|item| self.is_evaluable(item)),
                Value::Object(map) => map.values().all(|item| self.is_evaluable(item)),
                _ => true,
            },
        }
    }

    /// Apply `expression` to `input`.
    ///
    /// Non-expression values are returned with any nested expressions applied.
    pub fn apply(&self, expression: &Value, input: &Value) -> ExpressionResult<Value> {
        if let Some((def, operand)) = self.split(expression) {
            if def.controls_evaluation {
                return self.run_apply(def, operand, input);
            }
            let resolved = self.apply(operand, input)?;
            return self.run_apply(def, &resolved, input);
        }

        match expression {
            Value::Array(items) => items
                .iter()
                .map(|item| self.apply(item, input))
                .collect::<ExpressionResult<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), self.apply(item, input)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    /// Evaluate `expression` without input data
    pub fn evaluate(&self, expression: &Value) -> ExpressionResult<Value> {
        if !self.is_evaluable(expression) {
            let name = self
                .first_unevaluable(expression)
                .unwrap_or("expression")
                .to_string();
            return Err(ExpressionError::not_evaluable(name));
        }
        self.evaluate_unchecked(expression)
    }

    /// Evaluation past the evaluability check, used by controlling definitions
    /// on their raw operands.
    pub(crate) fn evaluate_unchecked(&self, expression: &Value) -> ExpressionResult<Value> {
        if let Some((def, operand)) = self.split(expression) {
            let evaluate = def
                .evaluate
                .ok_or_else(|| ExpressionError::not_evaluable(def.name))?;
            if def.controls_evaluation {
                return evaluate(operand, self);
            }
            let resolved = self.evaluate_unchecked(operand)?;
            return evaluate(&resolved, self);
        }

        match expression {
            Value::Array(items) => items
                .iter()
                .map(|item| self.evaluate_unchecked(item))
                .collect::<ExpressionResult<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), self.evaluate_unchecked(item)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    fn run_apply(
        &self,
        def: &ExpressionDef,
        operand: &Value,
        input: &Value,
    ) -> ExpressionResult<Value> {
        match (def.apply, def.evaluate) {
            (Some(apply), _) => apply(operand, input, self),
            (None, Some(evaluate)) => evaluate(operand, self),
            (None, None) => Err(ExpressionError::not_evaluable(def.name)),
        }
    }

    fn first_unevaluable(&self, expression: &Value) -> Option<&'static str> {
        match self.split(expression) {
            Some((def, _)) if def.evaluate.is_none() => Some(def.name),
            Some((def, _)) if def.name == LITERAL => None,
            Some((_, operand)) => self.first_unevaluable(operand),
            None => match expression {
                Value::Array(items) => items.iter().find_map(|item| self.first_unevaluable(item)),
                Value::Object(map) => map.values().find_map(|item| self.first_unevaluable(item)),
                _ => None,
            },
        }
    }
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        Self::new()
    }
}
