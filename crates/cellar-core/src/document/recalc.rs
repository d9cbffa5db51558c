//! Recalculation after an edit.
//!
//! Two strategies are available. [`RecalcMode::Graph`] recomputes every
//! transitive dependent of the edited cell in dependency order and marks
//! cycles as `#ERROR`. [`RecalcMode::Legacy`] re-evaluates, once and in key
//! order, every formula whose text contains the edited address; it can leave
//! multi-hop dependents stale and over-matches (`A1` also hits `A10`).

use std::collections::BTreeSet;

use cellar_engine::engine::{
    CellMap, CellRef, DependencyGraph, ERROR_MARKER, evaluate, find_cycle, recalc_order,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::state::{CellUpdate, Sheet};
use crate::error::{CellarError, Result};

/// Which propagation strategy an edit uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecalcMode {
    #[default]
    Graph,
    Legacy,
}

impl std::str::FromStr for RecalcMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graph" => Ok(RecalcMode::Graph),
            "legacy" => Ok(RecalcMode::Legacy),
            other => Err(format!("unknown recalc mode '{other}' (expected graph or legacy)")),
        }
    }
}

/// A sheet after recalculation, with what was touched.
#[derive(Clone, Debug, PartialEq)]
pub struct Recalculated {
    pub sheet: Sheet,
    /// Formula cells whose value was recomputed, in evaluation order.
    pub recomputed: Vec<String>,
    /// Cells found on a dependency cycle and set to `#ERROR`.
    pub circular: Vec<String>,
}

impl Recalculated {
    /// Turn a detected cycle into an error.
    pub fn deny_cycles(self) -> Result<Self> {
        match self.circular.first() {
            Some(address) => Err(CellarError::CircularReference(address.clone())),
            None => Ok(self),
        }
    }
}

#[derive(Debug, Default)]
struct Report {
    recomputed: Vec<String>,
    circular: Vec<String>,
}

/// Applies edits to sheets and keeps formula values current.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recalculator {
    mode: RecalcMode,
}

impl Recalculator {
    pub fn new(mode: RecalcMode) -> Self {
        Recalculator { mode }
    }

    pub fn mode(&self) -> RecalcMode {
        self.mode
    }

    /// Merge `update` into the cell at `address` and recompute what it affects.
    ///
    /// The address must decode and lie inside the grid. The input sheet is
    /// left untouched.
    pub fn apply_cell_update(
        &self,
        sheet: &Sheet,
        address: &str,
        update: &CellUpdate,
    ) -> Result<Recalculated> {
        let cell_ref = sheet.locate(address)?;
        let key = cell_ref.to_string();

        let mut cells = sheet.cells.clone();
        let merged = update.merge_into(cells.get(&key));
        cells.insert(key.clone(), merged);

        let report = match self.mode {
            RecalcMode::Graph => propagate(&mut cells, &[cell_ref], sheet.grid()),
            RecalcMode::Legacy => legacy_pass(&mut cells, &key),
        };
        debug!(
            address = %key,
            mode = ?self.mode,
            recomputed = ?report.recomputed,
            "applied cell update"
        );

        Ok(Recalculated {
            sheet: Sheet {
                cells,
                row_count: sheet.row_count,
                col_count: sheet.col_count,
            },
            recomputed: report.recomputed,
            circular: report.circular,
        })
    }

    /// Recompute every formula on the sheet in dependency order.
    ///
    /// Used after loading a sheet whose stored values may be stale. Both
    /// modes share this ordering.
    pub fn recalculate_all(&self, sheet: &Sheet) -> Recalculated {
        let mut cells = sheet.cells.clone();
        let roots: Vec<CellRef> = cells
            .iter()
            .filter(|(_, cell)| cell.formula.is_some())
            .filter_map(|(key, _)| CellRef::parse(key).ok())
            .collect();
        let report = propagate(&mut cells, &roots, sheet.grid());
        Recalculated {
            sheet: Sheet {
                cells,
                row_count: sheet.row_count,
                col_count: sheet.col_count,
            },
            recomputed: report.recomputed,
            circular: report.circular,
        }
    }

    /// Recompute the dependents of cells removed by a structural edit,
    /// returning `(recomputed, circular)`. Legacy mode leaves them as they were.
    pub(crate) fn refresh(
        &self,
        cells: &mut CellMap,
        removed: &[CellRef],
        grid: (usize, usize),
    ) -> (Vec<String>, Vec<String>) {
        match self.mode {
            RecalcMode::Graph => {
                let report = propagate(cells, removed, grid);
                (report.recomputed, report.circular)
            }
            RecalcMode::Legacy => (Vec::new(), Vec::new()),
        }
    }
}

/// Graph pass: order the affected cells, mark cycles, evaluate the rest.
///
/// Ranges are clipped to `grid`, widened to take in every root and formula
/// cell so no edge between them is lost.
fn propagate(cells: &mut CellMap, roots: &[CellRef], grid: (usize, usize)) -> Report {
    let (rows, cols) = extent(cells, roots, grid);
    let graph = DependencyGraph::build_within(cells, rows, cols);
    let plan = recalc_order(&graph, roots);
    debug!(order = ?plan.order, "recalculation order");

    let mut report = Report::default();
    let mut reported: BTreeSet<CellRef> = BTreeSet::new();
    for cell_ref in &plan.circular {
        if !reported.contains(cell_ref) {
            let path = find_cycle(cell_ref, &graph).unwrap_or_else(|| vec![*cell_ref]);
            let rendered: Vec<String> = path.iter().map(CellRef::to_string).collect();
            warn!(cycle = %rendered.join(" -> "), "circular reference");
            reported.extend(path);
        }
        let address = cell_ref.to_string();
        set_value(cells, &address, ERROR_MARKER.to_string());
        report.circular.push(address);
    }

    for cell_ref in &plan.order {
        let address = cell_ref.to_string();
        if recompute(cells, &address) {
            report.recomputed.push(address);
        }
    }
    report
}

fn extent(cells: &CellMap, roots: &[CellRef], grid: (usize, usize)) -> (usize, usize) {
    cells
        .iter()
        .filter(|(_, cell)| cell.formula.is_some())
        .filter_map(|(key, _)| CellRef::parse(key).ok())
        .chain(roots.iter().copied())
        .fold(grid, |(rows, cols), cell| {
            (rows.max(cell.row + 1), cols.max(cell.col + 1))
        })
}

/// Legacy pass: the edited cell, then every other formula whose text
/// contains its address, in key order.
fn legacy_pass(cells: &mut CellMap, address: &str) -> Report {
    let mut report = Report::default();
    if recompute(cells, address) {
        report.recomputed.push(address.to_string());
    }

    // Later cells see values written by earlier ones within the same scan.
    let matches: Vec<String> = cells
        .iter()
        .filter(|(key, cell)| {
            key.as_str() != address
                && cell.formula.as_deref().is_some_and(|f| f.contains(address))
        })
        .map(|(key, _)| key.clone())
        .collect();
    for key in matches {
        if recompute(cells, &key) {
            report.recomputed.push(key);
        }
    }
    report
}

/// Evaluate the formula stored at `address` against the current cells.
/// Returns false when the cell holds no formula.
fn recompute(cells: &mut CellMap, address: &str) -> bool {
    let Some(formula) = cells.get(address).and_then(|cell| cell.formula.clone()) else {
        return false;
    };
    let value = evaluate(&formula, cells);
    set_value(cells, address, value);
    true
}

fn set_value(cells: &mut CellMap, address: &str, value: String) {
    if let Some(cell) = cells.get_mut(address) {
        cell.value = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sheet(entries: &[(&str, &str)]) -> Sheet {
        let mut sheet = Sheet::new(50, 26);
        for (address, input) in entries {
            sheet
                .cells
                .insert(address.to_string(), cellar_engine::engine::Cell::from_input(input));
        }
        sheet
    }

    fn set(recalc: &Recalculator, sheet: &Sheet, address: &str, input: &str) -> Recalculated {
        recalc
            .apply_cell_update(sheet, address, &CellUpdate::value(input))
            .unwrap()
    }

    #[test]
    fn test_recalc_mode_parses_case_insensitively() {
        assert_eq!("Graph".parse::<RecalcMode>(), Ok(RecalcMode::Graph));
        assert_eq!(" legacy ".parse::<RecalcMode>(), Ok(RecalcMode::Legacy));
        assert!("eager".parse::<RecalcMode>().is_err());
    }

    #[test]
    fn test_edited_formula_is_evaluated() {
        let out = set(&Recalculator::default(), &Sheet::default(), "A1", "=2*3");
        let cell = out.sheet.cell("A1").unwrap();
        assert_eq!(cell.value.as_deref(), Some("6"));
        assert_eq!(cell.formula.as_deref(), Some("=2*3"));
        assert_eq!(out.recomputed, vec!["A1"]);
    }

    #[test]
    fn test_graph_order_is_reported() {
        let base = sheet(&[("C1", "=B1*2"), ("B1", "=A1+1"), ("A1", "1")]);
        let out = set(&Recalculator::default(), &base, "A1", "5");
        assert_eq!(out.recomputed, vec!["B1", "C1"]);
        assert_eq!(out.sheet.display("C1"), "12");
    }

    #[test]
    fn test_input_sheet_is_not_modified() {
        let base = sheet(&[("A1", "1"), ("B1", "=A1")]);
        let before = base.clone();
        let _ = set(&Recalculator::default(), &base, "A1", "9");
        assert_eq!(base, before);
    }

    #[test]
    fn test_cycle_marks_error_and_can_be_denied() {
        let base = sheet(&[("B1", "=A1+1")]);
        let out = set(&Recalculator::default(), &base, "A1", "=B1+1");
        assert_eq!(out.circular, vec!["A1", "B1"]);
        assert_eq!(out.sheet.display("A1"), ERROR_MARKER);
        assert_eq!(out.sheet.display("B1"), ERROR_MARKER);
        assert!(matches!(
            out.deny_cycles(),
            Err(CellarError::CircularReference(address)) if address == "A1"
        ));
    }

    #[test]
    fn test_legacy_scan_runs_in_key_order() {
        // A2 sorts before B1, so it reads B1's value from before the edit.
        let base = sheet(&[("A1", "1"), ("B1", "=A1+1"), ("A2", "=B1+A1")]);
        let base = Recalculator::default().recalculate_all(&base).sheet;
        assert_eq!(base.display("A2"), "3");

        let out = set(&Recalculator::new(RecalcMode::Legacy), &base, "A1", "10");
        assert_eq!(out.recomputed, vec!["A2", "B1"]);
        assert_eq!(out.sheet.display("B1"), "11");
        assert_eq!(out.sheet.display("A2"), "12");
    }

    #[test]
    fn test_long_range_propagates_within_the_grid() {
        // 26 x 30000 cells as written; the graph only holds the 50 x 26 grid.
        let base = sheet(&[("A1", "1"), ("B50", "7"), ("C1", "=SUM(A1:B30000)")]);
        let base = Recalculator::default().recalculate_all(&base).sheet;
        assert_eq!(base.display("C1"), "8");

        let out = set(&Recalculator::default(), &base, "A50", "2");
        assert_eq!(out.recomputed, vec!["C1"]);
        assert_eq!(out.sheet.display("C1"), "10");
    }

    #[test]
    fn test_recalculate_all_fixes_stale_values() {
        let mut base = sheet(&[("A1", "2"), ("B1", "=A1*10"), ("C1", "=B1+1")]);
        base.cells.get_mut("B1").unwrap().value = Some("stale".into());
        base.cells.get_mut("C1").unwrap().value = Some("stale".into());

        let out = Recalculator::default().recalculate_all(&base);
        assert_eq!(out.sheet.display("B1"), "20");
        assert_eq!(out.sheet.display("C1"), "21");
        assert_eq!(out.recomputed, vec!["B1", "C1"]);
    }
}
