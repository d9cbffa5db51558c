//! Cell data structures for the spreadsheet grid.
//!
//! - [`Cell`] - Display value, optional formula and presentation style
//! - [`CellStyle`] - Presentation attributes, carried through untouched
//! - [`CellMap`] - Sparse storage keyed by address string

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The character that marks authored content as a formula.
pub const FORMULA_MARKER: char = '=';

/// Presentation attributes of a cell. Irrelevant to evaluation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A cell in the spreadsheet grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Literal value or the last computed display text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Authored formula text, including the leading `=`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<CellStyle>,
}

impl Cell {
    /// Create a cell from authored input.
    /// Input starting with `=` is stored as a formula and also as the
    /// (not yet evaluated) value.
    pub fn from_input(input: &str) -> Cell {
        Cell {
            value: Some(input.to_string()),
            formula: is_formula(input).then(|| input.to_string()),
            style: None,
        }
    }

    /// Current display text, empty when the cell has no value.
    pub fn display(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }
}

/// Whether authored text is a formula.
pub fn is_formula(text: &str) -> bool {
    text.starts_with(FORMULA_MARKER)
}

/// Sparse cell storage keyed by address string ("A1").
/// An address absent from the map is an empty cell.
pub type CellMap = BTreeMap<String, Cell>;

/// Current display text at `address`, empty when absent.
pub fn value_at<'a>(cells: &'a CellMap, address: &str) -> &'a str {
    cells.get(address).map(Cell::display).unwrap_or("")
}
