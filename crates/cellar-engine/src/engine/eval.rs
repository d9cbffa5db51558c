//! Formula evaluation.
//!
//! `evaluate` is the boundary used by the document layer: literal text passes
//! through unchanged, formulas are parsed and evaluated against the current
//! cells, and every failure collapses to [`ERROR_MARKER`].

use super::ast::{BinaryOperator, Expr, UnaryOperator};
use super::cell::{CellMap, FORMULA_MARKER, is_formula, value_at};
use super::parser::parse_expression;
use super::value::{ERROR_MARKER, Value};
use crate::error::{EngineError, Result};

/// Parse a formula (with its leading `=`) into a syntax tree.
pub fn compile(formula: &str) -> Result<Expr> {
    let expression = formula
        .strip_prefix(FORMULA_MARKER)
        .ok_or_else(|| EngineError::Parse("formula must start with '='".into()))?;
    parse_expression(expression)
}

/// Compute the display value of authored cell content.
///
/// Never fails: text that is not a formula is returned unchanged and any
/// evaluation failure yields `#ERROR`.
pub fn evaluate(formula: &str, cells: &CellMap) -> String {
    if !is_formula(formula) {
        return formula.to_string();
    }
    match try_evaluate(formula, cells) {
        Ok(display) => display,
        Err(err) => {
            tracing::trace!(formula, error = %err, "formula evaluated to error");
            ERROR_MARKER.to_string()
        }
    }
}

/// Evaluate a formula, reporting why it failed instead of returning `#ERROR`.
pub fn try_evaluate(formula: &str, cells: &CellMap) -> Result<String> {
    let expr = compile(formula)?;
    eval_expr(&expr, cells)?.to_display()
}

/// Evaluate an already parsed expression.
pub fn eval_expr(expr: &Expr, cells: &CellMap) -> Result<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Text(s) => Ok(Value::Text(s.clone())),
        Expr::Ref(cell) => Ok(Value::from_cell_text(value_at(cells, &cell.to_string()))),
        Expr::Range(start, end) => Err(EngineError::Type(format!(
            "range {}:{} used outside a function argument",
            start, end
        ))),
        Expr::Unary { op, operand } => {
            let n = eval_expr(operand, cells)?.as_number()?;
            Ok(Value::Number(match op {
                UnaryOperator::Negate => -n,
                UnaryOperator::Plus => n,
            }))
        }
        Expr::Binary { op, left, right } => {
            let left = eval_expr(left, cells)?;
            let right = eval_expr(right, cells)?;
            eval_binary(*op, &left, &right)
        }
        Expr::Call { function, args } => {
            crate::builtins::call(*function, args, cells, &|arg| eval_expr(arg, cells))
        }
    }
}

fn eval_binary(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    let result = match op {
        BinaryOperator::Concat => {
            return Ok(Value::Text(format!(
                "{}{}",
                left.to_display()?,
                right.to_display()?
            )));
        }
        BinaryOperator::Add => left.as_number()? + right.as_number()?,
        BinaryOperator::Subtract => left.as_number()? - right.as_number()?,
        BinaryOperator::Multiply => left.as_number()? * right.as_number()?,
        BinaryOperator::Divide => left.as_number()? / right.as_number()?,
        BinaryOperator::Power => left.as_number()?.powf(right.as_number()?),
    };
    Ok(Value::Number(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Cell;

    fn cells(entries: &[(&str, &str)]) -> CellMap {
        entries
            .iter()
            .map(|(addr, value)| (addr.to_string(), Cell::from_input(value)))
            .collect()
    }

    #[test]
    fn test_literal_passthrough() {
        assert_eq!(evaluate("hello", &CellMap::new()), "hello");
        assert_eq!(evaluate("", &CellMap::new()), "");
    }

    #[test]
    fn test_arithmetic() {
        let empty = CellMap::new();
        assert_eq!(evaluate("=1+1", &empty), "2");
        assert_eq!(evaluate("=(1+2)*3", &empty), "9");
        assert_eq!(evaluate("=7/2", &empty), "3.5");
        assert_eq!(evaluate("=2^3^2", &empty), "512");
        assert_eq!(evaluate("=-2^2", &empty), "-4");
        assert_eq!(evaluate("=--3", &empty), "3");
    }

    #[test]
    fn test_reference_values() {
        let map = cells(&[("A1", "4"), ("B1", "x")]);
        assert_eq!(evaluate("=A1*2", &map), "8");
        // Absent cells read as zero.
        assert_eq!(evaluate("=C9+1", &map), "1");
        assert_eq!(evaluate("=B1&\"!\"", &map), "x!");
        assert_eq!(evaluate("=B1+1", &map), ERROR_MARKER);
    }

    #[test]
    fn test_concat_formats_numbers() {
        assert_eq!(evaluate("=1/4&\" cup\"", &CellMap::new()), "0.25 cup");
    }

    #[test]
    fn test_division_by_zero_is_error() {
        assert_eq!(evaluate("=1/0", &CellMap::new()), ERROR_MARKER);
        assert_eq!(
            try_evaluate("=0/0", &CellMap::new()),
            Err(EngineError::NonFinite)
        );
    }

    #[test]
    fn test_bare_range_is_error() {
        assert!(matches!(
            try_evaluate("=A1:A2", &CellMap::new()),
            Err(EngineError::Type(_))
        ));
    }

    #[test]
    fn test_string_literal_is_not_substituted() {
        let map = cells(&[("A1", "5")]);
        assert_eq!(evaluate("=\"A1\"", &map), "A1");
    }
}
