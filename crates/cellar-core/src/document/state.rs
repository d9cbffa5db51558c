use cellar_engine::EngineError;
use cellar_engine::engine::{Cell, CellMap, CellRef, CellStyle, decode, value_at};
use serde::{Deserialize, Serialize};

use crate::error::{CellarError, Result};

/// Grid size used when nothing else is configured
pub const DEFAULT_ROWS: usize = 50;
pub const DEFAULT_COLS: usize = 26;

/// One spreadsheet: its sparse cells plus the logical grid size.
///
/// Every edit produces a new `Sheet`; callers holding an older value keep
/// seeing the old cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    #[serde(default)]
    pub cells: CellMap,
    pub row_count: usize,
    pub col_count: usize,
}

impl Default for Sheet {
    fn default() -> Self {
        Sheet::new(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

impl Sheet {
    /// An empty sheet of the given size.
    pub fn new(row_count: usize, col_count: usize) -> Self {
        Sheet {
            cells: CellMap::new(),
            row_count,
            col_count,
        }
    }

    /// Parse a sheet from its JSON form and check that every key is an address.
    pub fn from_json(json: &str) -> Result<Sheet> {
        let sheet: Sheet = serde_json::from_str(json)?;
        sheet.validate()?;
        Ok(sheet)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject cell keys that are not canonical A1 addresses.
    ///
    /// Cells outside the grid are tolerated: structural deletes leave them
    /// behind on purpose.
    pub fn validate(&self) -> Result<()> {
        for address in self.cells.keys() {
            let cell_ref = decode(address)?;
            if cell_ref.to_string() != *address {
                return Err(EngineError::InvalidAddress(address.clone()).into());
            }
        }
        Ok(())
    }

    pub fn cell(&self, address: &str) -> Option<&Cell> {
        self.cells.get(address)
    }

    /// The display text of a cell, empty if it has never been set.
    pub fn display(&self, address: &str) -> &str {
        value_at(&self.cells, address)
    }

    /// `(row_count, col_count)`.
    pub fn grid(&self) -> (usize, usize) {
        (self.row_count, self.col_count)
    }

    /// Decode `address` and check it against the grid bounds.
    pub fn locate(&self, address: &str) -> Result<CellRef> {
        let cell_ref = decode(address)?;
        if !cell_ref.within(self.row_count, self.col_count) {
            return Err(CellarError::AddressOutOfBounds {
                address: address.to_string(),
                row_count: self.row_count,
                col_count: self.col_count,
            });
        }
        Ok(cell_ref)
    }
}

/// A partial change to one cell. Absent fields are left as they were.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<CellStyle>,
}

impl CellUpdate {
    /// Set the authored text; a leading `=` makes it a formula.
    pub fn value(text: impl Into<String>) -> Self {
        CellUpdate {
            value: Some(text.into()),
            style: None,
        }
    }

    pub fn style(style: CellStyle) -> Self {
        CellUpdate {
            value: None,
            style: Some(style),
        }
    }

    /// Merge this update into `existing`.
    ///
    /// New text replaces the value and re-derives the formula, so a literal
    /// clears any formula the cell held before.
    pub fn merge_into(&self, existing: Option<&Cell>) -> Cell {
        let mut cell = existing.cloned().unwrap_or_default();
        if let Some(text) = &self.value {
            let fresh = Cell::from_input(text);
            cell.value = fresh.value;
            cell.formula = fresh.formula;
        }
        if let Some(style) = &self.style {
            cell.style = Some(style.clone());
        }
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sheet_json_shape() {
        let mut sheet = Sheet::new(2, 3);
        sheet.cells.insert("A1".into(), Cell::from_input("5"));
        let json = serde_json::to_value(&sheet).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "cells": { "A1": { "value": "5" } },
                "rowCount": 2,
                "colCount": 3
            })
        );
    }

    #[test]
    fn test_from_json_rejects_bad_keys() {
        let json = r#"{"cells":{"a1":{"value":"1"}},"rowCount":5,"colCount":5}"#;
        assert!(Sheet::from_json(json).is_err());

        let json = r#"{"cells":{"A01":{"value":"1"}},"rowCount":5,"colCount":5}"#;
        assert!(Sheet::from_json(json).is_err());
    }

    #[test]
    fn test_from_json_keeps_cells_outside_the_grid() {
        let json = r#"{"cells":{"C9":{"value":"1"}},"rowCount":2,"colCount":2}"#;
        let sheet = Sheet::from_json(json).unwrap();
        assert_eq!(sheet.display("C9"), "1");
    }

    #[test]
    fn test_locate_checks_bounds() {
        let sheet = Sheet::new(2, 2);
        assert_eq!(sheet.locate("B2").unwrap(), CellRef::new(1, 1));
        assert!(matches!(
            sheet.locate("C1"),
            Err(CellarError::AddressOutOfBounds { .. })
        ));
        assert!(matches!(sheet.locate("A3"), Err(CellarError::AddressOutOfBounds { .. })));
        assert!(matches!(sheet.locate("1A"), Err(CellarError::Engine(_))));
    }

    #[test]
    fn test_merge_literal_clears_formula_and_keeps_style() {
        let style = CellStyle {
            bold: Some(true),
            ..CellStyle::default()
        };
        let existing = Cell {
            value: Some("3".into()),
            formula: Some("=1+2".into()),
            style: Some(style.clone()),
        };
        let merged = CellUpdate::value("7").merge_into(Some(&existing));
        assert_eq!(merged.value.as_deref(), Some("7"));
        assert_eq!(merged.formula, None);
        assert_eq!(merged.style, Some(style));
    }

    #[test]
    fn test_merge_style_only_keeps_value() {
        let existing = Cell::from_input("=1+2");
        let style = CellStyle {
            italic: Some(true),
            ..CellStyle::default()
        };
        let merged = CellUpdate::style(style.clone()).merge_into(Some(&existing));
        assert_eq!(merged.formula.as_deref(), Some("=1+2"));
        assert_eq!(merged.style, Some(style));
    }
}
