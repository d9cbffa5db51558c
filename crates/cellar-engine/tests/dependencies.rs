use cellar_engine::EngineError;
use cellar_engine::engine::{
    Cell, CellMap, CellRef, DependencyGraph, compile, evaluate, recalc_order, references,
    try_evaluate,
};

fn r(address: &str) -> CellRef {
    address.parse().unwrap()
}

#[test]
fn test_references_include_every_range_cell() {
    let refs: Vec<String> = references("=SUM(A1:B2)+C3")
        .into_iter()
        .map(|c| c.to_string())
        .collect();
    // Row-major order.
    assert_eq!(refs, vec!["A1", "B1", "A2", "B2", "C3"]);
}

#[test]
fn test_compile_rejects_what_evaluate_marks_as_error() {
    for formula in ["=1+", "=SUM(", "=NOPE(1)", "=A1:"] {
        assert!(compile(formula).is_err(), "{formula}");
        assert_eq!(evaluate(formula, &CellMap::new()), "#ERROR");
    }
}

#[test]
fn test_graph_from_cells_orders_a_spreadsheet() {
    let cells: CellMap = [
        ("A1", "10"),
        ("A2", "=A1*2"),
        ("A3", "=A1+A2"),
        ("B1", "=SUM(A1:A3)"),
        ("B2", "=UPPER(\"total\")"),
    ]
    .into_iter()
    .map(|(address, input)| (address.to_string(), Cell::from_input(input)))
    .collect();

    let graph = DependencyGraph::build(&cells);
    let plan = recalc_order(&graph, &[r("A1")]);
    let order: Vec<String> = plan.order.iter().map(CellRef::to_string).collect();
    assert_eq!(order, vec!["A2", "A3", "B1"]);
    assert!(plan.circular.is_empty());
}

#[test]
fn test_deeply_nested_formula_is_an_error() {
    let cells = CellMap::new();
    let parens = format!("={}1{}", "(".repeat(200_000), ")".repeat(200_000));
    assert_eq!(evaluate(&parens, &cells), "#ERROR");
    assert_eq!(
        try_evaluate(&parens, &cells),
        Err(EngineError::Parse("formula nested too deeply".into()))
    );

    let negations = format!("={}1", "-".repeat(10_000));
    assert_eq!(evaluate(&negations, &cells), "#ERROR");

    let chain = format!("={}", vec!["1"; 1_000].join("+"));
    assert_eq!(evaluate(&chain, &cells), "#ERROR");
    assert!(references(&chain).is_empty());

    let chain = format!("={}", vec!["1"; 200].join("+"));
    assert_eq!(evaluate(&chain, &cells), "200");

    let nested = format!("={}2{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(evaluate(&nested, &cells), "2");
}
