//! Structural edits: growing and shrinking the grid.
//!
//! Deleting a row or column removes the cells on it and shrinks the grid by
//! one. Remaining cells keep their addresses and no formula is rewritten, so
//! cells past the new edge stay in the mapping.

use cellar_engine::engine::{CellRef, decode};
use tracing::debug;

use super::recalc::{Recalculated, Recalculator};
use super::state::Sheet;
use crate::error::Result;

/// Dimension for row/column operations
#[derive(Copy, Clone, Debug)]
enum Dimension {
    Row,
    Column,
}

impl Dimension {
    /// Get the coordinate value from a CellRef for this dimension
    fn get_coord(&self, cell_ref: &CellRef) -> usize {
        match self {
            Dimension::Row => cell_ref.row,
            Dimension::Column => cell_ref.col,
        }
    }

    fn count_mut<'a>(&self, sheet: &'a mut Sheet) -> &'a mut usize {
        match self {
            Dimension::Row => &mut sheet.row_count,
            Dimension::Column => &mut sheet.col_count,
        }
    }
}

impl Sheet {
    /// A copy of this sheet with one more row.
    pub fn add_row(&self) -> Sheet {
        self.add_dimension(Dimension::Row)
    }

    /// A copy of this sheet with one more column.
    pub fn add_column(&self) -> Sheet {
        self.add_dimension(Dimension::Column)
    }

    fn add_dimension(&self, dim: Dimension) -> Sheet {
        let mut sheet = self.clone();
        let count = dim.count_mut(&mut sheet);
        *count = count.saturating_add(1);
        sheet
    }
}

impl Recalculator {
    /// Remove every cell on row `index` and shrink the grid by one row.
    pub fn delete_row(&self, sheet: &Sheet, index: usize) -> Result<Recalculated> {
        self.delete_dimension(sheet, Dimension::Row, index)
    }

    /// Remove every cell in column `index` and shrink the grid by one column.
    pub fn delete_column(&self, sheet: &Sheet, index: usize) -> Result<Recalculated> {
        self.delete_dimension(sheet, Dimension::Column, index)
    }

    fn delete_dimension(
        &self,
        sheet: &Sheet,
        dim: Dimension,
        index: usize,
    ) -> Result<Recalculated> {
        let mut next = sheet.clone();
        let mut removed = Vec::new();
        for address in sheet.cells.keys() {
            let cell_ref = decode(address)?;
            if dim.get_coord(&cell_ref) == index {
                next.cells.remove(address);
                removed.push(cell_ref);
            }
        }
        let count = dim.count_mut(&mut next);
        *count = count.saturating_sub(1);

        // Ranges still reach the removed line, so order over the old grid.
        let (recomputed, circular) = self.refresh(&mut next.cells, &removed, sheet.grid());
        debug!(?dim, index, removed = removed.len(), "deleted grid line");

        Ok(Recalculated {
            sheet: next,
            recomputed,
            circular,
        })
    }
}
