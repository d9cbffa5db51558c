//! Sheet documents and the edits applied to them.

mod ops;
mod recalc;
mod state;

pub use recalc::{RecalcMode, Recalculated, Recalculator};
pub use state::{CellUpdate, DEFAULT_COLS, DEFAULT_ROWS, Sheet};

/// Apply `update` to the cell at `address` using the default recalculation
/// mode and return the resulting sheet.
pub fn apply_cell_update(
    sheet: &Sheet,
    address: &str,
    update: &CellUpdate,
) -> crate::Result<Sheet> {
    Recalculator::default()
        .apply_cell_update(sheet, address, update)
        .map(|out| out.sheet)
}
