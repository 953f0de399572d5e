//! Expression error types

use thiserror::Error;

/// Result type for expression evaluation.
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Errors raised while applying or evaluating an expression.
///
/// Every malformed operand surfaces as one of these rather than as a null or
/// non-finite number.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("{expression}: division by zero")]
    DivisionByZero { expression: String },

    #[error("{expression}: expected {expected} operand(s), got {actual}")]
    InvalidArity {
        expression: String,
        expected: String,
        actual: usize,
    },

    #[error("{expression}: expected {expected}, got {actual}")]
    InvalidOperand {
        expression: String,
        expected: String,
        actual: String,
    },

    #[error("{expression}: expected an array, got {actual}")]
    ExpectedArray { expression: String, actual: String },

    #[error("{expression} cannot be evaluated without input data")]
    NotEvaluable { expression: String },

    #[error("{expression}: invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        expression: String,
        pattern: String,
        message: String,
    },

    #[error("{expression}: result is not a finite number")]
    NonFiniteResult { expression: String },

    #[error("{expression}: invalid date '{value}'")]
    InvalidDate { expression: String, value: String },

    #[error("Malformed where clause: {message}")]
    MalformedWhere { message: String },
}

impl ExpressionError {
    pub fn division_by_zero(expression: impl Into<String>) -> Self {
        Self::DivisionByZero {
            expression: expression.into(),
        }
    }

    pub fn invalid_arity(
        expression: impl Into<String>,
        expected: impl Into<String>,
        actual: usize,
    ) -> Self {
        Self::InvalidArity {
            expression: expression.into(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn invalid_operand(
        expression: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidOperand {
            expression: expression.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn expected_array(expression: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ExpectedArray {
            expression: expression.into(),
            actual: actual.into(),
        }
    }

    pub fn not_evaluable(expression: impl Into<String>) -> Self {
        Self::NotEvaluable {
            expression: expression.into(),
        }
    }

    pub fn invalid_pattern(
        expression: impl Into<String>,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPattern {
            expression: expression.into(),
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn non_finite(expression: impl Into<String>) -> Self {
        Self::NonFiniteResult {
            expression: expression.into(),
        }
    }

    pub fn invalid_date(expression: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidDate {
            expression: expression.into(),
            value: value.into(),
        }
    }

    pub fn malformed_where(message: impl Into<String>) -> Self {
        Self::MalformedWhere {
            message: message.into(),
        }
    }
}
