//! Built-in spreadsheet functions and their metadata.
//!
//! Conventions:
//! - Spreadsheet-facing names are ALL CAPS and matched case-sensitively.
//! - Aggregates (`SUM`, `AVERAGE`, ...) take ranges; their arguments are
//!   resolved here, never pre-evaluated into scalars.
//! - Text functions (`TRIM`, `UPPER`, `LOWER`) take exactly one scalar.
//! - If you add a built-in, add a [`Function`] variant and list it in
//!   [`Function::ALL`].

use crate::engine::{CellMap, Expr, Value, coerce_number, expand_corners, parse_number, value_at};
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Sum,
    Average,
    Max,
    Min,
    Count,
    Trim,
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Operates over the flattened values of range arguments
    Aggregate,
    /// Operates on a single text argument
    Text,
}

impl Function {
    /// Every built-in, in the order they are documented.
    pub const ALL: [Function; 8] = [
        Function::Sum,
        Function::Average,
        Function::Max,
        Function::Min,
        Function::Count,
        Function::Trim,
        Function::Upper,
        Function::Lower,
    ];

    pub fn from_name(name: &str) -> Option<Function> {
        Function::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Sum => "SUM",
            Function::Average => "AVERAGE",
            Function::Max => "MAX",
            Function::Min => "MIN",
            Function::Count => "COUNT",
            Function::Trim => "TRIM",
            Function::Upper => "UPPER",
            Function::Lower => "LOWER",
        }
    }

    pub fn kind(self) -> FunctionKind {
        match self {
            Function::Trim | Function::Upper | Function::Lower => FunctionKind::Text,
            _ => FunctionKind::Aggregate,
        }
    }
}

/// Invoke a built-in with its unevaluated argument expressions.
///
/// `eval` evaluates a scalar argument against the same cells; aggregates use
/// it only for arguments that are neither references nor ranges.
pub(crate) fn call(
    function: Function,
    args: &[Expr],
    cells: &CellMap,
    eval: &dyn Fn(&Expr) -> Result<Value>,
) -> Result<Value> {
    match function.kind() {
        FunctionKind::Aggregate => {
            let values = flatten_arguments(args, cells, eval)?;
            Ok(Value::Number(aggregate(function, &values)))
        }
        FunctionKind::Text => {
            let [arg] = args else {
                return Err(EngineError::ArgumentCount {
                    function: function.name().to_string(),
                    expected: "1",
                    actual: args.len(),
                });
            };
            if matches!(arg, Expr::Range(..)) {
                return Err(EngineError::Type(format!(
                    "{} expects a single value, not a range",
                    function.name()
                )));
            }
            let text = eval(arg)?.to_display()?;
            Ok(Value::Text(apply_text(function, &text)))
        }
    }
}

/// Resolve aggregate arguments to the display text of every covered cell.
fn flatten_arguments(
    args: &[Expr],
    cells: &CellMap,
    eval: &dyn Fn(&Expr) -> Result<Value>,
) -> Result<Vec<String>> {
    let mut values = Vec::new();
    for arg in args {
        match arg {
            Expr::Range(start, end) => {
                for cell in expand_corners(*start, *end)? {
                    values.push(value_at(cells, &cell.to_string()).to_string());
                }
            }
            Expr::Ref(cell) => values.push(value_at(cells, &cell.to_string()).to_string()),
            other => values.push(eval(other)?.to_display()?),
        }
    }
    Ok(values)
}

fn aggregate(function: Function, values: &[String]) -> f64 {
    let numbers = || values.iter().map(|v| coerce_number(v));
    match function {
        Function::Sum => numbers().sum(),
        // An empty argument list divides by zero and surfaces as an error.
        Function::Average => numbers().sum::<f64>() / values.len() as f64,
        Function::Max => numbers().fold(f64::NEG_INFINITY, f64::max),
        Function::Min => numbers().fold(f64::INFINITY, f64::min),
        Function::Count => values.iter().filter(|v| parse_number(v).is_some()).count() as f64,
        Function::Trim | Function::Upper | Function::Lower => f64::NAN,
    }
}

fn apply_text(function: Function, text: &str) -> String {
    match function {
        Function::Trim => text.trim().to_string(),
        Function::Upper => text.to_uppercase(),
        Function::Lower => text.to_lowercase(),
        _ => text.to_string(),
    }
}
