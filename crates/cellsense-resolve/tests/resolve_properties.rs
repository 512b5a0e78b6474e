use cellsense_resolve::{
    CellAddress, CellValue, GridSnapshot, LayoutHint, LayoutPattern, ResolverConfig, SheetContext,
    build_label_map, parse_formula_dependencies, resolve_cell_to_variable,
};

fn addr(s: &str) -> CellAddress {
    CellAddress::parse(s).unwrap()
}

fn led_row(first: &str) -> GridSnapshot {
    GridSnapshot::from_text_rows(addr("A1"), [[first, "", "", "12.5"]])
}

#[test]
fn resolution_is_deterministic() {
    let grid = GridSnapshot::from_text_rows(
        addr("A1"),
        [
            vec!["Column design", "", "", "", ""],
            vec!["Effective length, strong axis", "Led", "", "", "12.5"],
            vec!["Yield strength", "Fy", "", "", "355"],
        ],
    );
    let map = build_label_map(&grid);
    let hint = LayoutHint::default();
    let first = resolve_cell_to_variable("E2", &grid, Some(&map), Some(&hint), false);
    let second = resolve_cell_to_variable("E2", &grid, Some(&map), Some(&hint), false);
    assert_eq!(first, second);
    assert_eq!(first.symbol, "Led");
}

#[test]
fn same_row_symbol() {
    let v = resolve_cell_to_variable("D1", &led_row("Led"), None, None, true);
    assert_eq!(v.symbol, "Led");
    assert_eq!(v.label, "");
    assert_eq!(v.value, CellValue::Number(12.5));
}

#[test]
fn long_text_is_a_label_not_a_symbol() {
    let grid = led_row("Effective Length, Strong Axis");
    let v = resolve_cell_to_variable("D1", &grid, None, None, true);
    assert_eq!(v.label, "Effective Length, Strong Axis");
    assert_eq!(v.symbol, "");
}

#[test]
fn cell_without_text_neighbours_resolves_empty() {
    let grid = GridSnapshot::from_text_rows(addr("A1"), [["", "", "5"], ["", "", "7"]]);
    let v = resolve_cell_to_variable("C2", &grid, None, None, false);
    assert_eq!((v.label.as_str(), v.symbol.as_str()), ("", ""));
    assert_eq!(v.value, CellValue::Number(7.0));

    let outside = resolve_cell_to_variable("Z99", &grid, None, None, false);
    assert_eq!(outside.value, CellValue::Empty);
    assert!(!outside.has_meaning());
}

#[test]
fn formula_dependencies_in_order() {
    let grid = GridSnapshot::from_text_rows(
        addr("A1"),
        [
            vec!["", "", "", "", ""],
            vec!["", "", "", "", ""],
            vec!["", "", "", "", ""],
            vec!["", "", "", "", ""],
            vec!["Lx", "6.0", "Ly", "4.0", "=B5+D5"],
        ],
    );
    let deps = parse_formula_dependencies("=B5+D5", &grid, None);
    assert_eq!(deps.len(), 2);
    assert_eq!(deps[0].cell_ref, "B5");
    assert_eq!(deps[1].cell_ref, "D5");
    for dep in &deps {
        let direct = resolve_cell_to_variable(&dep.cell_ref, &grid, None, None, true);
        assert_eq!(dep.resolved, direct);
    }
    assert_eq!(deps[0].resolved.symbol, "Lx");
    assert_eq!(deps[1].resolved.symbol, "Ly");
}

#[test]
fn same_row_symbol_does_not_need_a_hint() {
    let grid = led_row("Led");
    let without = resolve_cell_to_variable("D1", &grid, None, None, true);
    let above = LayoutHint::new(LayoutPattern::AboveRow).with_columns(Some(3), Some(3), None);
    let with_hint = resolve_cell_to_variable("D1", &grid, None, Some(&above), true);
    let with_default = resolve_cell_to_variable("D1", &grid, None, Some(&LayoutHint::default()), true);
    assert_eq!(without.symbol, "Led");
    assert_eq!(with_hint.symbol, "Led");
    assert_eq!(with_default.symbol, "Led");
}

#[test]
fn label_map_supplies_label_outside_the_scan_window() {
    let grid = GridSnapshot::from_text_rows(addr("A1"), [["Span length", "", "Ls", "6.0"]]);
    let config = ResolverConfig::from_yaml_str("scan:\n  left_window: 1\n").unwrap();
    let ctx = SheetContext::new(grid, config);
    assert_eq!(ctx.label_map().get("span length"), Some(addr("D1")));
    let v = ctx.resolve("D1");
    assert_eq!(v.symbol, "Ls");
    assert_eq!(v.label, "Span length");
}

#[test]
fn malformed_references_never_fail() {
    let grid = led_row("Led");
    for bad in ["", "1A", "a1", "A0", "$$", "A1B"] {
        let v = resolve_cell_to_variable(bad, &grid, None, None, false);
        assert_eq!(v.address, None, "{bad:?}");
        assert!(!v.has_meaning());
    }
}
