//! Formula dependency extraction and the sheet dependency graph.
//!
//! Dependencies come from the parsed formula, so references inside string
//! literals and function names shaped like addresses are never counted.

use std::collections::{BTreeMap, BTreeSet};

use super::ast::Expr;
use super::cell::CellMap;
use super::cell_ref::CellRef;
use super::eval::compile;
use super::range::expand_corners;

/// Every cell an expression reads, in order of appearance (duplicates kept).
/// Ranges contribute each covered cell; ranges over the size limit are skipped.
pub fn extract_dependencies(expr: &Expr) -> Vec<CellRef> {
    let mut deps = Vec::new();
    collect(expr, None, &mut deps);
    deps
}

/// Like [`extract_dependencies`], but ranges are clipped to a grid of
/// `rows` by `cols` first. Single references are kept as written.
pub fn extract_dependencies_within(expr: &Expr, rows: usize, cols: usize) -> Vec<CellRef> {
    let mut deps = Vec::new();
    collect(expr, Some((rows, cols)), &mut deps);
    deps
}

/// Shrink a range to the part inside the grid, if any.
fn clip(
    start: CellRef,
    end: CellRef,
    (rows, cols): (usize, usize),
) -> Option<(CellRef, CellRef)> {
    let top = start.row.min(end.row);
    let left = start.col.min(end.col);
    if top >= rows || left >= cols {
        return None;
    }
    let bottom = start.row.max(end.row).min(rows - 1);
    let right = start.col.max(end.col).min(cols - 1);
    Some((CellRef::new(top, left), CellRef::new(bottom, right)))
}

fn collect(expr: &Expr, grid: Option<(usize, usize)>, deps: &mut Vec<CellRef>) {
    match expr {
        Expr::Number(_) | Expr::Text(_) => {}
        Expr::Ref(cell) => deps.push(*cell),
        Expr::Range(start, end) => {
            let corners = match grid {
                Some(grid) => clip(*start, *end, grid),
                None => Some((*start, *end)),
            };
            if let Some((start, end)) = corners
                && let Ok(cells) = expand_corners(start, end)
            {
                deps.extend(cells);
            }
        }
        Expr::Unary { operand, .. } => collect(operand, grid, deps),
        Expr::Binary { left, right, .. } => {
            collect(left, grid, deps);
            collect(right, grid, deps);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect(arg, grid, deps);
            }
        }
    }
}

/// Distinct cells a formula reads. A formula that does not parse reads nothing.
pub fn references(formula: &str) -> BTreeSet<CellRef> {
    compile(formula)
        .map(|expr| extract_dependencies(&expr).into_iter().collect())
        .unwrap_or_default()
}

/// Distinct cells a formula reads, with ranges clipped to a `rows` by `cols` grid.
pub fn references_within(formula: &str, rows: usize, cols: usize) -> BTreeSet<CellRef> {
    compile(formula)
        .map(|expr| extract_dependencies_within(&expr, rows, cols).into_iter().collect())
        .unwrap_or_default()
}

/// Directed dependency edges between formula cells.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Cell -> cells whose formulas read it
    dependents: BTreeMap<CellRef, BTreeSet<CellRef>>,
    /// Cell -> cells its formula reads
    precedents: BTreeMap<CellRef, BTreeSet<CellRef>>,
    /// Every cell holding a formula
    formulas: BTreeSet<CellRef>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from every formula in `cells`.
    /// Keys that are not valid addresses are ignored.
    pub fn build(cells: &CellMap) -> Self {
        Self::from_formulas(cells, references)
    }

    /// Build the graph for a sheet of `rows` by `cols`, clipping ranges to it.
    /// Cells past the grid hold no values, so no edges are kept for them.
    pub fn build_within(cells: &CellMap, rows: usize, cols: usize) -> Self {
        Self::from_formulas(cells, |formula| references_within(formula, rows, cols))
    }

    fn from_formulas(cells: &CellMap, refs: impl Fn(&str) -> BTreeSet<CellRef>) -> Self {
        let mut graph = Self::new();
        for (address, cell) in cells {
            let Some(formula) = &cell.formula else {
                continue;
            };
            let Ok(cell_ref) = CellRef::parse(address) else {
                continue;
            };
            graph.formulas.insert(cell_ref);
            for precedent in refs(formula) {
                graph.add_dependency(precedent, cell_ref);
            }
        }
        graph
    }

    /// Record that `dependent`'s formula reads `precedent`.
    pub fn add_dependency(&mut self, precedent: CellRef, dependent: CellRef) {
        self.dependents
            .entry(precedent)
            .or_default()
            .insert(dependent);
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    pub fn dependents_of(&self, cell: &CellRef) -> impl Iterator<Item = &CellRef> + '_ {
        self.dependents.get(cell).into_iter().flatten()
    }

    pub fn precedents_of(&self, cell: &CellRef) -> impl Iterator<Item = &CellRef> + '_ {
        self.precedents.get(cell).into_iter().flatten()
    }

    pub fn is_formula(&self, cell: &CellRef) -> bool {
        self.formulas.contains(cell)
    }

    pub fn formula_cells(&self) -> impl Iterator<Item = &CellRef> + '_ {
        self.formulas.iter()
    }

    /// Every cell reachable from `roots` through dependent edges,
    /// excluding the roots unless a cycle leads back to them.
    pub fn transitive_dependents(&self, roots: &[CellRef]) -> BTreeSet<CellRef> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<CellRef> = roots.to_vec();
        while let Some(cell) = stack.pop() {
            for dependent in self.dependents_of(&cell) {
                if seen.insert(*dependent) {
                    stack.push(*dependent);
                }
            }
        }
        seen
    }
}
