//! `$random` and `$uuid`

use crate::expression::value::{expect_number, float_value, type_name};
use crate::expression::{ExpressionDef, ExpressionEngine, ExpressionError, ExpressionKind, ExpressionResult};
use rand::Rng;
use serde_json::Value;
use uuid::Uuid;

pub fn definitions() -> Vec<ExpressionDef> {
    vec![
        ExpressionDef::pure("$random", ExpressionKind::Generative, random),
        ExpressionDef::pure("$uuid", ExpressionKind::Generative, uuid),
    ]
}

/// `{min, max, integer}` with defaults `0`, `1` and `false`
fn random(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let (min, max, integer) = match operand {
        Value::Null => (0.0, 1.0, false),
        Value::Object(options) => {
            let min = match options.get("min") {
                Some(v) => expect_number("$random", v)?,
                None => 0.0,
            };
            let max = match options.get("max") {
                Some(v) => expect_number("$random", v)?,
                None => 1.0,
            };
            let integer = options
                .get("integer")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            (min, max, integer)
        }
        other => {
            return Err(ExpressionError::invalid_operand(
                "$random",
                "null or options object",
                type_name(other),
            ))
        }
    };

    if min > max {
        return Err(ExpressionError::invalid_operand(
            "$random",
            "min <= max",
            format!("min {} > max {}", min, max),
        ));
    }

    let mut rng = rand::thread_rng();
    if integer {
        let low = min.ceil() as i64;
        let high = max.floor() as i64;
        if low > high {
            return Err(ExpressionError::invalid_operand(
                "$random",
                "an integer between min and max",
                "none",
            ));
        }
        return Ok(Value::from(rng.gen_range(low..=high)));
    }
    if min == max {
        return float_value("$random", min);
    }
    float_value("$random", rng.gen_range(min..max))
}

fn uuid(_operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    Ok(Value::String(Uuid::new_v4().to_string()))
}
