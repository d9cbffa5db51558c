//! Range expansion: "A1:B3" to the flat, row-major list of covered cells.

use super::cell::{CellMap, value_at};
use super::cell_ref::CellRef;
use crate::error::{EngineError, Result};

/// Upper bound on the number of cells a single range may cover.
pub const MAX_RANGE_CELLS: usize = 1_000_000;

/// The range separator.
pub const RANGE_SEPARATOR: char = ':';

/// Parse a range like "A1:B5" into its two (unordered) corners.
pub fn parse_range(range: &str) -> Result<(CellRef, CellRef)> {
    let Some((start, end)) = range.split_once(RANGE_SEPARATOR) else {
        return Err(EngineError::InvalidAddress(range.to_string()));
    };
    Ok((CellRef::parse(start.trim())?, CellRef::parse(end.trim())?))
}

/// Expand two corners into the covered cells, outer loop over rows,
/// inner loop over columns. Corner order does not matter.
pub fn expand_corners(start: CellRef, end: CellRef) -> Result<Vec<CellRef>> {
    let min_row = start.row.min(end.row);
    let max_row = start.row.max(end.row);
    let min_col = start.col.min(end.col);
    let max_col = start.col.max(end.col);

    let row_count = max_row - min_row + 1;
    let col_count = max_col - min_col + 1;
    match row_count.checked_mul(col_count) {
        Some(n) if n <= MAX_RANGE_CELLS => {}
        _ => return Err(EngineError::RangeTooLarge(format!("{}:{}", start, end))),
    }

    let mut cells = Vec::with_capacity(row_count * col_count);
    for row in min_row..=max_row {
        for col in min_col..=max_col {
            cells.push(CellRef::new(row, col));
        }
    }
    Ok(cells)
}

/// Enumerate the addresses covered by a range expression.
/// An expression without `:` is a single address.
pub fn expand_range(range_expr: &str) -> Result<Vec<CellRef>> {
    let range_expr = range_expr.trim();
    if range_expr.contains(RANGE_SEPARATOR) {
        let (start, end) = parse_range(range_expr)?;
        expand_corners(start, end)
    } else {
        Ok(vec![CellRef::parse(range_expr)?])
    }
}

/// Current values of every cell covered by `range_expr`, absent cells as "".
pub fn resolve_range(range_expr: &str, cells: &CellMap) -> Result<Vec<String>> {
    Ok(expand_range(range_expr)?
        .into_iter()
        .map(|cell| value_at(cells, &cell.to_string()).to_string())
        .collect())
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
    fn test_single_address_absent_is_empty() {
        assert_eq!(resolve_range("C7", &CellMap::new()).unwrap(), vec![""]);
    }

    #[test]
    fn test_row_major_order() {
        let map = cells(&[("A1", "1"), ("B1", "2"), ("A2", "3"), ("B2", "4")]);
        assert_eq!(resolve_range("A1:B2", &map).unwrap(), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_reversed_corners() {
        let map = cells(&[("A1", "1"), ("A2", "2")]);
        assert_eq!(resolve_range("A2:A1", &map).unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_invalid_endpoint() {
        assert_eq!(
            resolve_range("A1:1B", &CellMap::new()),
            Err(EngineError::InvalidAddress("1B".into()))
        );
    }

    #[test]
    fn test_over_limit_range_is_rejected() {
        assert!(matches!(
            expand_range("A1:A1000001"),
            Err(EngineError::RangeTooLarge(_))
        ));
    }
}
