//! Static analysis of the input paths an expression reads

use super::{ExpressionEngine, ExpressionKind, LITERAL};
use indexmap::IndexSet;
use serde_json::Value;

fn join(base: &str, path: &str) -> String {
    match (base.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}.{}", base, path),
    }
}

impl ExpressionEngine {
    /// Dotted paths into its input that applying `expression` reads.
    ///
    /// Stages of `$pipe`/`$compose` and per-item operands of iterative
    /// expressions are resolved against the path that feeds them, so
    /// `{"$pipe": [{"$get": "powers"}, {"$any": {"$get": "name"}}]}` reads
    /// `powers` and `powers.name`. Reads from a computed value are not paths
    /// into the input and are left out.
    pub fn input_paths(&self, expression: &Value) -> Vec<String> {
        let mut paths = IndexSet::new();
        self.collect_paths(expression, Some(""), &mut paths);
        paths.into_iter().collect()
    }

    /// Record what `expression` reads at `base`; returns the path its result
    /// came from, if it is a plain read of the input
    fn collect_paths(
        &self,
        expression: &Value,
        base: Option<&str>,
        paths: &mut IndexSet<String>,
    ) -> Option<String> {
        let Some((def, operand)) = self.split(expression) else {
            match expression {
                Value::Array(items) => {
                    for item in items {
                        self.collect_paths(item, base, paths);
                    }
                }
                Value::Object(map) => {
                    for item in map.values() {
                        self.collect_paths(item, base, paths);
                    }
                }
                _ => {}
            }
            return None;
        };

        match def.name() {
            LITERAL => None,
            "$get" => match (operand, base) {
                (Value::String(path), Some(base)) => {
                    let full = join(base, path);
                    if !full.is_empty() {
                        paths.insert(full.clone());
                    }
                    Some(full)
                }
                (Value::String(_), None) => None,
                (dynamic, _) => {
                    self.collect_paths(dynamic, base, paths);
                    None
                }
            },
            "$echo" => {
                let base = base?;
                if !base.is_empty() {
                    paths.insert(base.to_string());
                }
                Some(base.to_string())
            }
            "$pipe" | "$compose" => {
                let Value::Array(stages) = operand else {
                    self.collect_paths(operand, base, paths);
                    return None;
                };
                let mut current = base.map(str::to_string);
                let ordered: Box<dyn Iterator<Item = &Value>> = if def.name() == "$compose" {
                    Box::new(stages.iter().rev())
                } else {
                    Box::new(stages.iter())
                };
                for stage in ordered {
                    current = self.collect_paths(stage, current.as_deref(), paths);
                }
                current
            }
            _ if def.kind() == ExpressionKind::Iterative && def.controls_evaluation() => {
                // the operand runs once per item, and items share their array's path
                let item = self.collect_paths(operand, base, paths);
                match def.name() {
                    "$filter" | "$find" => base.map(str::to_string),
                    "$map" | "$flatMap" => item,
                    _ => None,
                }
            }
            _ => {
                self.collect_paths(operand, base, paths);
                None
            }
        }
    }
}
