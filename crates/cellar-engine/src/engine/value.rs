//! Typed formula values, numeric coercion and display formatting.

use crate::error::{EngineError, Result};

/// Display text for any failed evaluation.
pub const ERROR_MARKER: &str = "#ERROR";

/// The result of evaluating an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Interpret a cell's display text as a formula operand.
    /// Empty text reads as 0, numeric text as a number, anything else as text.
    pub fn from_cell_text(text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Number(0.0);
        }
        match parse_number(text) {
            Some(n) => Value::Number(n),
            None => Value::Text(text.to_string()),
        }
    }

    /// Numeric view of the value for arithmetic operators.
    pub fn as_number(&self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Text(s) => parse_number(s)
                .ok_or_else(|| EngineError::Type(format!("expected a number, found \"{}\"", s))),
        }
    }

    /// Display form of the value. Non-finite numbers are an error.
    pub fn to_display(&self) -> Result<String> {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Text(s) => Ok(s.clone()),
        }
    }
}

/// Parse text as a finite decimal number, ignoring surrounding whitespace.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    // f64's parser also accepts "inf" and "NaN"; those are text here.
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Coerce cell text for aggregate functions: non-numeric and empty are 0.
pub fn coerce_number(text: &str) -> f64 {
    parse_number(text).unwrap_or(0.0)
}

/// Format a number for display.
pub fn format_number(n: f64) -> Result<String> {
    if !n.is_finite() {
        return Err(EngineError::NonFinite);
    }
    if n == 0.0 {
        // Avoid rendering negative zero as "-0".
        return Ok("0".to_string());
    }
    Ok(n.to_string())
}
