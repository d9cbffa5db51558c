//! Spreadsheet engine API.
//!
//! This module provides the core computation engine for the spreadsheet:
//!
//! - [`Cell`], [`CellStyle`], [`CellMap`] - Data structures for cell storage
//! - [`CellRef`], [`encode`], [`decode`] - Address parsing (A1 notation ↔ row/col indices)
//! - [`resolve_range`], [`expand_range`] - Range expansion
//! - [`compile`], [`evaluate`] - Formula parsing and evaluation
//! - [`references`], [`DependencyGraph`] - Formula dependencies
//! - [`recalc_order`], [`find_cycle`] - Recalculation order and cycle detection

mod ast;
mod cell;
mod cell_ref;
mod cycle;
mod deps;
mod eval;
mod parser;
mod range;
mod value;

pub use ast::{BinaryOperator, Expr, UnaryOperator};
pub use cell::{Cell, CellMap, CellStyle, FORMULA_MARKER, is_formula, value_at};
pub use cell_ref::{CellRef, decode, encode, is_address};
pub use cycle::{RecalcPlan, find_cycle, recalc_order};
pub use deps::{
    DependencyGraph, extract_dependencies, extract_dependencies_within, references,
    references_within,
};
pub use eval::{compile, eval_expr, evaluate, try_evaluate};
pub use parser::{MAX_DEPTH, parse_expression};
pub use range::{
    MAX_RANGE_CELLS, RANGE_SEPARATOR, expand_corners, expand_range, parse_range, resolve_range,
};
pub use value::{ERROR_MARKER, Value, coerce_number, format_number, parse_number};
