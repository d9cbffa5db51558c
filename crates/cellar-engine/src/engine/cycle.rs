//! Recalculation ordering and circular dependency detection.
//!
//! When a cell changes, its transitive dependents must be recomputed with
//! every precedent before its dependents. Cells on a cycle can never be
//! ordered that way; they are reported instead of evaluated.

use std::collections::{BTreeMap, BTreeSet};

use super::cell_ref::CellRef;
use super::deps::DependencyGraph;

/// The cells to recompute after a change, in evaluation order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecalcPlan {
    /// Acyclic cells, each listed after all of its affected precedents.
    pub order: Vec<CellRef>,
    /// Cells that sit on a dependency cycle.
    pub circular: BTreeSet<CellRef>,
}

/// Plan the recalculation of `roots` (those holding formulas) and
/// everything that transitively depends on them.
///
/// Cells downstream of a cycle are still ordered; they come after the
/// acyclic part and read whatever the cyclic cells display.
pub fn recalc_order(graph: &DependencyGraph, roots: &[CellRef]) -> RecalcPlan {
    let mut nodes = graph.transitive_dependents(roots);
    nodes.extend(roots.iter().filter(|r| graph.is_formula(r)).copied());

    let (mut order, leftover) = kahn(graph, &nodes);
    if leftover.is_empty() {
        return RecalcPlan {
            order,
            circular: BTreeSet::new(),
        };
    }

    let circular: BTreeSet<CellRef> = leftover
        .iter()
        .filter(|cell| reaches_itself(graph, cell, &leftover))
        .copied()
        .collect();
    let downstream: BTreeSet<CellRef> = leftover.difference(&circular).copied().collect();
    let (rest, _) = kahn(graph, &downstream);
    order.extend(rest);

    RecalcPlan { order, circular }
}

/// Topologically order `nodes`, counting only edges inside `nodes`.
/// Returns the ordered cells and the ones that could not be ordered.
fn kahn(graph: &DependencyGraph, nodes: &BTreeSet<CellRef>) -> (Vec<CellRef>, BTreeSet<CellRef>) {
    let mut in_degree: BTreeMap<CellRef, usize> = nodes
        .iter()
        .map(|cell| {
            let degree = graph.precedents_of(cell).filter(|p| nodes.contains(*p)).count();
            (*cell, degree)
        })
        .collect();

    let mut ready: BTreeSet<CellRef> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(cell, _)| *cell)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(cell) = ready.pop_first() {
        order.push(cell);
        in_degree.remove(&cell);
        for dependent in graph.dependents_of(&cell) {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    (order, in_degree.into_keys().collect())
}

fn reaches_itself(graph: &DependencyGraph, start: &CellRef, within: &BTreeSet<CellRef>) -> bool {
    let mut seen = BTreeSet::new();
    let mut stack = vec![*start];
    while let Some(cell) = stack.pop() {
        for dependent in graph.dependents_of(&cell) {
            if dependent == start {
                return true;
            }
            if within.contains(dependent) && seen.insert(*dependent) {
                stack.push(*dependent);
            }
        }
    }
    false
}

/// Detect a circular dependency through `start`.
/// Returns the cycle path (ending where it re-enters) if found.
pub fn find_cycle(start: &CellRef, graph: &DependencyGraph) -> Option<Vec<CellRef>> {
    let mut visiting = BTreeSet::new();
    let mut path = Vec::new();

    if find_cycle_dfs(start, start, graph, &mut visiting, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn find_cycle_dfs(
    current: &CellRef,
    start: &CellRef,
    graph: &DependencyGraph,
    visiting: &mut BTreeSet<CellRef>,
    path: &mut Vec<CellRef>,
) -> bool {
    if !visiting.insert(*current) {
        if current == start {
            path.push(*current);
            return true;
        }
        return false;
    }
    path.push(*current);

    for precedent in graph.precedents_of(current) {
        if find_cycle_dfs(precedent, start, graph, visiting, path) {
            return true;
        }
    }

    path.pop();
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Cell, CellMap};

    fn graph(entries: &[(&str, &str)]) -> DependencyGraph {
        let cells: CellMap = entries
            .iter()
            .map(|(addr, value)| (addr.to_string(), Cell::from_input(value)))
            .collect();
        DependencyGraph::build(&cells)
    }

    fn r(address: &str) -> CellRef {
        CellRef::parse(address).unwrap()
    }

    #[test]
    fn test_chain_is_ordered_precedents_first() {
        // C1 <- B1 <- A1, declared out of order.
        let g = graph(&[("C1", "=B1+1"), ("B1", "=A1+1"), ("A1", "1")]);
        let plan = recalc_order(&g, &[r("A1")]);
        assert_eq!(plan.order, vec![r("B1"), r("C1")]);
        assert!(plan.circular.is_empty());
    }

    #[test]
    fn test_formula_root_comes_first() {
        let g = graph(&[("A2", "=A1*2"), ("A1", "=5")]);
        let plan = recalc_order(&g, &[r("A1")]);
        assert_eq!(plan.order, vec![r("A1"), r("A2")]);
    }

    #[test]
    fn test_diamond_evaluates_join_once_after_both_sides() {
        let g = graph(&[
            ("B1", "=A1"),
            ("C1", "=A1"),
            ("D1", "=B1+C1"),
            ("A1", "1"),
        ]);
        let plan = recalc_order(&g, &[r("A1")]);
        assert_eq!(plan.order.len(), 3);
        assert_eq!(plan.order.last(), Some(&r("D1")));
    }

    #[test]
    fn test_cycle_is_reported_and_downstream_still_ordered() {
        let g = graph(&[("A1", "=B1"), ("B1", "=A1"), ("C1", "=A1+1")]);
        let plan = recalc_order(&g, &[r("A1")]);
        assert_eq!(plan.circular, [r("A1"), r("B1")].into_iter().collect());
        assert_eq!(plan.order, vec![r("C1")]);
    }

    #[test]
    fn test_self_reference_is_circular() {
        let g = graph(&[("A1", "=A1+1")]);
        let plan = recalc_order(&g, &[r("A1")]);
        assert!(plan.circular.contains(&r("A1")));
        assert!(plan.order.is_empty());
    }

    #[test]
    fn test_find_cycle() {
        let g = graph(&[("A1", "=B1"), ("B1", "=C1"), ("C1", "=A1")]);
        let path = find_cycle(&r("A1"), &g).unwrap();
        assert!(path.len() >= 3);
        assert_eq!(path.first(), path.last());

        let acyclic = graph(&[("A1", "=B1+C1"), ("B1", "=C1")]);
        assert!(find_cycle(&r("A1"), &acyclic).is_none());
    }
}
