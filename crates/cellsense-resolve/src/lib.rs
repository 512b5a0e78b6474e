//! Infer what the cells of a free-form engineering spreadsheet mean.
//!
//! Given a [`GridSnapshot`], the resolver finds the human label and the
//! short symbol that describe a value cell, resolves the cells a formula
//! depends on, builds a sheet-wide label → cell index and reads the color
//! legend. Everything is heuristic; an unresolvable cell produces empty
//! strings, never an error.
//!
//! The free functions below use [`ResolverConfig::default`]. For repeated
//! queries against one sheet, build a [`SheetContext`].

pub mod classify;
pub mod config;
mod context;
pub mod error;
pub mod formula;
pub mod hint;
pub mod label_map;
pub mod legend;
pub mod provider;
pub mod resolver;
pub mod scanner;
pub mod score;

pub use classify::{Classification, TextKind, classify};
pub use config::{DuplicatePolicy, ResolverConfig, ScanLimits, ScoringWeights};
pub use context::SheetContext;
pub use error::{ConfigError, ProviderError};
pub use formula::{FormulaDependency, extract_cell_refs};
pub use hint::{LayoutHint, LayoutPattern};
pub use label_map::{LabelEntry, LabelMap};
pub use legend::{LegendCategory, LegendCell, LegendEntry};
pub use provider::{
    JsonContractProvider, JsonLegendProvider, KeywordLegendClassifier, LayoutHintProvider,
    LegendClassifier, RuleBasedLayoutProvider, Transport, classify_legend_with_fallback,
    fetch_layout_hint,
};
pub use resolver::{ResolvedVariable, VariableResolver};
pub use scanner::Candidate;

pub use cellsense_common::{CellAddress, CellValue, GridCell, GridSnapshot};

/// Resolve `reference` (e.g. `"E12"`) to its label, symbol and value.
pub fn resolve_cell_to_variable(
    reference: &str,
    grid: &GridSnapshot,
    label_map: Option<&LabelMap>,
    hint: Option<&LayoutHint>,
    strict_same_row: bool,
) -> ResolvedVariable {
    let config = ResolverConfig::default();
    VariableResolver::new(&config).resolve_a1(reference, grid, label_map, hint, strict_same_row)
}

/// Resolve every cell reference in `formula`, in order of first appearance.
pub fn parse_formula_dependencies(
    formula: &str,
    grid: &GridSnapshot,
    hint: Option<&LayoutHint>,
) -> Vec<FormulaDependency> {
    let config = ResolverConfig::default();
    formula::parse_formula_dependencies(&VariableResolver::new(&config), formula, grid, None, hint)
}

pub fn build_label_map(grid: &GridSnapshot) -> LabelMap {
    let config = ResolverConfig::default();
    label_map::build_label_map(grid, &config.scan, config.label_map_policy)
}

/// Legend from local keyword heuristics only. See
/// [`provider::detect_legend_with`] to delegate to a classifier.
pub fn detect_legend(grid: &GridSnapshot) -> Vec<LegendEntry> {
    legend::detect_legend(grid, &ScanLimits::default())
}
