//! `$now` and `$timestamp`

use crate::expression::value::expect_str;
use crate::expression::{ExpressionDef, ExpressionEngine, ExpressionError, ExpressionKind, ExpressionResult};
use chrono::{DateTime, Utc};
use serde_json::Value;

pub fn definitions() -> Vec<ExpressionDef> {
    vec![
        ExpressionDef::pure("$now", ExpressionKind::Temporal, now),
        ExpressionDef::pure("$timestamp", ExpressionKind::Temporal, timestamp),
    ]
}

/// Current time as an RFC 3339 string
fn now(_operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    Ok(Value::String(Utc::now().to_rfc3339()))
}

/// RFC 3339 string to milliseconds since the Unix epoch
fn timestamp(operand: &Value, _engine: &ExpressionEngine) -> ExpressionResult<Value> {
    let text = expect_str("$timestamp", operand)?;
    let parsed = DateTime::parse_from_rfc3339(text)
        .map_err(|_| ExpressionError::invalid_date("$timestamp", text))?;
    Ok(Value::from(parsed.timestamp_millis()))
}
