//! Per-sheet cache of the derived label map, legend and layout hint.

use cellsense_common::{CellAddress, GridSnapshot};

use crate::config::ResolverConfig;
use crate::formula::{FormulaDependency, parse_formula_dependencies};
use crate::hint::LayoutHint;
use crate::label_map::{LabelMap, build_label_map};
use crate::legend::{LegendEntry, detect_legend};
use crate::provider::{LayoutHintProvider, LegendClassifier, detect_legend_with, fetch_layout_hint};
use crate::resolver::{ResolvedVariable, VariableResolver};

/// A grid with its derived sheet-wide state: label map, legend and layout
/// hint. Built once per snapshot and then queried many times.
#[derive(Debug, Clone)]
pub struct SheetContext {
    grid: GridSnapshot,
    config: ResolverConfig,
    label_map: LabelMap,
    legend: Vec<LegendEntry>,
    hint: Option<LayoutHint>,
}

impl SheetContext {
    /// Local-only context: no layout hint, keyword legend classification.
    pub fn new(grid: GridSnapshot, config: ResolverConfig) -> Self {
        let label_map = build_label_map(&grid, &config.scan, config.label_map_policy);
        let legend = detect_legend(&grid, &config.scan);
        Self {
            grid,
            config,
            label_map,
            legend,
            hint: None,
        }
    }

    /// Context whose hint and legend come from providers. Provider failures
    /// degrade to the default hint and local classification.
    pub async fn with_providers(
        grid: GridSnapshot,
        sheet_name: &str,
        layout: &dyn LayoutHintProvider,
        legend: &dyn LegendClassifier,
        config: ResolverConfig,
    ) -> Self {
        let timeout = config.provider_timeout();
        let hint = fetch_layout_hint(layout, &grid, sheet_name, &config.scan, timeout).await;
        let legend = detect_legend_with(&grid, Some(legend), &config.scan, timeout).await;
        let label_map = build_label_map(&grid, &config.scan, config.label_map_policy);
        Self {
            grid,
            config,
            label_map,
            legend,
            hint: Some(hint),
        }
    }

    pub fn with_hint(mut self, hint: Option<LayoutHint>) -> Self {
        self.hint = hint;
        self
    }

    fn resolver(&self) -> VariableResolver<'_> {
        VariableResolver::new(&self.config)
    }

    /// Resolve an `A1` reference in permissive mode (row above allowed).
    pub fn resolve(&self, reference: &str) -> ResolvedVariable {
        self.resolver().resolve_a1(
            reference,
            &self.grid,
            Some(&self.label_map),
            self.hint.as_ref(),
            false,
        )
    }

    pub fn resolve_address(&self, address: &CellAddress, strict_same_row: bool) -> ResolvedVariable {
        self.resolver().resolve(
            address,
            &self.grid,
            Some(&self.label_map),
            self.hint.as_ref(),
            strict_same_row,
        )
    }

    pub fn dependencies(&self, formula: &str) -> Vec<FormulaDependency> {
        parse_formula_dependencies(
            &self.resolver(),
            formula,
            &self.grid,
            Some(&self.label_map),
            self.hint.as_ref(),
        )
    }

    /// Dependencies of the formula stored at `reference`; empty when the
    /// reference is malformed or the cell holds no formula.
    pub fn dependencies_of(&self, reference: &str) -> Vec<FormulaDependency> {
        let Ok(address) = CellAddress::parse(reference) else {
            return Vec::new();
        };
        match self.grid.cell(&address).and_then(|c| c.formula.as_deref()) {
            Some(formula) => self.dependencies(formula),
            None => Vec::new(),
        }
    }

    pub fn grid(&self) -> &GridSnapshot {
        &self.grid
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }

    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }

    pub fn hint(&self) -> Option<&LayoutHint> {
        self.hint.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{KeywordLegendClassifier, RuleBasedLayoutProvider};

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    fn sheet() -> GridSnapshot {
        GridSnapshot::from_text_rows(
            addr("A1"),
            [
                vec!["Unbraced length", "Lb", "4.2"],
                vec!["Radius of gyration", "r", "0.05"],
                vec!["Slenderness", "lambda", "=C1/C2"],
            ],
        )
        .with_value(addr("C3"), 84.0)
    }

    #[test]
    fn resolves_and_follows_formulas() {
        let ctx = SheetContext::new(sheet(), ResolverConfig::default());
        let v = ctx.resolve("C3");
        assert_eq!(v.symbol, "lambda");
        assert_eq!(v.formula.as_deref(), Some("=C1/C2"));

        let deps = ctx.dependencies_of("C3");
        let symbols: Vec<_> = deps.iter().map(|d| d.resolved.symbol.as_str()).collect();
        assert_eq!(symbols, ["Lb", "r"]);
        assert!(ctx.dependencies_of("C1").is_empty());
        assert!(ctx.dependencies_of("??").is_empty());
    }

    #[test]
    fn label_map_is_built_once() {
        let ctx = SheetContext::new(sheet(), ResolverConfig::default());
        assert_eq!(ctx.label_map().get("radius of gyration"), Some(addr("C2")));
        assert!(ctx.legend().is_empty());
        assert!(ctx.hint().is_none());
    }

    #[test]
    fn dependencies_use_the_cached_label_map() {
        let grid = GridSnapshot::from_text_rows(
            addr("A1"),
            [vec!["Span length", "", "Ls", "6.0"], vec!["", "", "w", "=D1*2"]],
        );
        let config = ResolverConfig::from_yaml_str("scan:\n  left_window: 1\n").unwrap();
        let ctx = SheetContext::new(grid, config);
        let deps = ctx.dependencies_of("D2");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].resolved.symbol, "Ls");
        assert_eq!(deps[0].resolved.label, "Span length");
        assert_eq!(deps[0].resolved, ctx.resolve_address(&addr("D1"), true));
    }

    #[tokio::test]
    async fn local_providers_supply_a_hint() {
        let ctx = SheetContext::with_providers(
            sheet(),
            "Column",
            &RuleBasedLayoutProvider,
            &KeywordLegendClassifier,
            ResolverConfig::default(),
        )
        .await;
        let hint = ctx.hint().unwrap();
        assert_eq!(hint.label_column, Some(1));
        assert_eq!(ctx.resolve("C1").label, "Unbraced length");
    }
}
