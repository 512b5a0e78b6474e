//! Scanner → classifier → scorer orchestration for a single cell.

use std::cmp::Ordering;

use cellsense_common::{CellAddress, CellValue, GridSnapshot};
use serde::Serialize;

use crate::config::ResolverConfig;
use crate::hint::LayoutHint;
use crate::label_map::LabelMap;
use crate::scanner::{Candidate, scan_candidates};
use crate::score::{rank, score_all};

/// What a cell means: its label, symbol and current value.
///
/// `label` and `symbol` are empty when nothing qualifies; that is a normal
/// outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedVariable {
    /// The reference as requested (normalized to `B5` form when it parsed).
    pub reference: String,
    pub address: Option<CellAddress>,
    pub label: String,
    pub symbol: String,
    pub value: CellValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl ResolvedVariable {
    /// Result for a reference that could not be parsed.
    pub fn unresolved(reference: &str) -> Self {
        Self {
            reference: reference.to_string(),
            address: None,
            label: String::new(),
            symbol: String::new(),
            value: CellValue::Empty,
            formula: None,
        }
    }

    pub fn has_meaning(&self) -> bool {
        !self.label.is_empty() || !self.symbol.is_empty()
    }
}

/// Chosen symbol/label candidates for one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub symbol: Option<Candidate>,
    pub label: Option<Candidate>,
}

/// Stateless resolver; holds only the configuration it was built with.
#[derive(Debug, Clone, Copy)]
pub struct VariableResolver<'c> {
    config: &'c ResolverConfig,
}

impl<'c> VariableResolver<'c> {
    pub fn new(config: &'c ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        self.config
    }

    /// Resolve an `A1` reference. Malformed references yield
    /// [`ResolvedVariable::unresolved`].
    pub fn resolve_a1(
        &self,
        reference: &str,
        grid: &GridSnapshot,
        label_map: Option<&LabelMap>,
        hint: Option<&LayoutHint>,
        strict_same_row: bool,
    ) -> ResolvedVariable {
        match CellAddress::parse(reference) {
            Ok(address) => self.resolve(&address, grid, label_map, hint, strict_same_row),
            Err(err) => {
                tracing::debug!(reference, %err, "unparseable cell reference");
                ResolvedVariable::unresolved(reference)
            }
        }
    }

    pub fn resolve(
        &self,
        address: &CellAddress,
        grid: &GridSnapshot,
        label_map: Option<&LabelMap>,
        hint: Option<&LayoutHint>,
        strict_same_row: bool,
    ) -> ResolvedVariable {
        let candidates = self.candidates(address, grid, hint, strict_same_row);
        if candidates.is_empty() {
            tracing::debug!(%address, "no label or symbol candidates");
        }
        let selection = self.select(&candidates);

        let symbol = selection
            .symbol
            .map(|c| c.text)
            .unwrap_or_default();
        let mut label = selection.label.map(|c| c.text).unwrap_or_default();
        if label.is_empty() {
            if let Some(mapped) = label_map.and_then(|m| m.label_for(address)) {
                if mapped != symbol {
                    label = mapped.to_string();
                }
            }
        }

        let cell = grid.cell(address);
        ResolvedVariable {
            reference: address.to_string(),
            address: Some(*address),
            label,
            symbol,
            value: cell.map(|c| c.value.clone()).unwrap_or_default(),
            formula: cell.and_then(|c| c.formula.clone()),
        }
    }

    /// Scanned candidates with their scores filled in, in scan order.
    pub fn candidates(
        &self,
        address: &CellAddress,
        grid: &GridSnapshot,
        hint: Option<&LayoutHint>,
        strict_same_row: bool,
    ) -> Vec<Candidate> {
        let mut candidates =
            scan_candidates(address, grid, hint, strict_same_row, &self.config.scan);
        score_all(&mut candidates, hint, &self.config.weights);
        candidates
    }

    /// Pick a symbol and a label from scored candidates.
    pub fn select(&self, candidates: &[Candidate]) -> Selection {
        if candidates.is_empty() {
            return Selection::default();
        }
        if !candidates.iter().any(Candidate::is_classified) {
            return select_by_length(candidates);
        }

        let weights = &self.config.weights;
        let symbol = best(
            candidates
                .iter()
                .filter(|c| c.looks_like_symbol)
                .map(|c| (c, c.score)),
        )
        .or_else(|| {
            best(
                candidates
                    .iter()
                    .filter(|c| !c.is_classified() && is_symbol_fallback(&c.text))
                    .map(|c| (c, c.score * weights.symbol_fallback_scale)),
            )
        });
        let symbol_text = symbol.map(|c| c.text.as_str());
        let not_symbol = |c: &&Candidate| Some(c.text.as_str()) != symbol_text;

        let labels: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.looks_like_label)
            .filter(not_symbol)
            .collect();
        let label = best(labels.iter().filter(|c| c.same_row()).map(|c| (*c, c.score)))
            .or_else(|| best(labels.iter().map(|c| (*c, c.score))))
            .or_else(|| {
                best(
                    candidates
                        .iter()
                        .filter(|c| !c.is_classified())
                        .filter(not_symbol)
                        .map(|c| (c, c.score * weights.label_fallback_scale)),
                )
            });

        Selection {
            symbol: symbol.cloned(),
            label: label.cloned(),
        }
    }
}

/// Highest-ranked candidate; the first one wins exact ties.
fn best<'a>(scored: impl Iterator<Item = (&'a Candidate, f64)>) -> Option<&'a Candidate> {
    let mut winner: Option<(&Candidate, f64)> = None;
    for (candidate, score) in scored {
        match winner {
            Some((current, current_score))
                if rank(candidate, score, current, current_score) != Ordering::Greater => {}
            _ => winner = Some((candidate, score)),
        }
    }
    winner.map(|(c, _)| c)
}

/// Short, space-free, letter-led text that no rule claimed (`E`, `L`).
fn is_symbol_fallback(text: &str) -> bool {
    text.chars().count() <= 10
        && !text.contains(' ')
        && text.chars().next().is_some_and(char::is_alphabetic)
}

/// Nothing classified: shortest text is the symbol, longest the label.
fn select_by_length(candidates: &[Candidate]) -> Selection {
    let len = |c: &Candidate| c.text.chars().count();
    if let [only] = candidates {
        return if only.text.contains(' ') {
            Selection {
                symbol: None,
                label: Some(only.clone()),
            }
        } else {
            Selection {
                symbol: Some(only.clone()),
                label: None,
            }
        };
    }
    let mut shortest = &candidates[0];
    let mut longest = &candidates[0];
    for c in &candidates[1..] {
        if len(c) < len(shortest) {
            shortest = c;
        }
        if len(c) > len(longest) {
            longest = c;
        }
    }
    let label = if longest.text == shortest.text {
        candidates.iter().find(|c| c.text != shortest.text)
    } else {
        Some(longest)
    };
    Selection {
        symbol: Some(shortest.clone()),
        label: label.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint::LayoutPattern;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    fn resolve(grid: &GridSnapshot, at: &str, hint: Option<&LayoutHint>, strict: bool) -> ResolvedVariable {
        let config = ResolverConfig::default();
        VariableResolver::new(&config).resolve_a1(at, grid, None, hint, strict)
    }

    #[test]
    fn symbol_and_label_on_one_row() {
        let grid = GridSnapshot::from_text_rows(
            addr("A1"),
            [["Effective length, strong axis", "", "Led", "", "12.5"]],
        );
        let v = resolve(&grid, "E1", None, true);
        assert_eq!(v.symbol, "Led");
        assert_eq!(v.label, "Effective length, strong axis");
        assert_eq!(v.value, CellValue::Number(12.5));
    }

    #[test]
    fn nearer_symbol_wins() {
        let grid = GridSnapshot::from_text_rows(addr("A1"), [["Lx", "", "Ly", "", "3"]]);
        assert_eq!(resolve(&grid, "E1", None, true).symbol, "Ly");
    }

    #[test]
    fn symbol_fallback_takes_untagged_short_text() {
        // "E" is too short for the symbol rule and matches no label rule.
        let grid = GridSnapshot::from_text_rows(addr("A1"), [["Modulus of elasticity", "E", "200000"]]);
        let v = resolve(&grid, "C1", None, true);
        assert_eq!(v.symbol, "E");
        assert_eq!(v.label, "Modulus of elasticity");
    }

    #[test]
    fn label_fallback_takes_untagged_text() {
        let grid = GridSnapshot::from_text_rows(addr("A1"), [["k-t", "Fy", "355"]]);
        let v = resolve(&grid, "C1", None, true);
        assert_eq!(v.symbol, "Fy");
        assert_eq!(v.label, "k-t");
    }

    #[test]
    fn unclassified_only_uses_length() {
        let grid = GridSnapshot::from_text_rows(addr("A1"), [["(note)", "x", "4"]]);
        let v = resolve(&grid, "C1", None, true);
        assert_eq!(v.symbol, "x");
        assert_eq!(v.label, "(note)");

        let single = GridSnapshot::from_text_rows(addr("A1"), [["a b", "4"]]);
        let v = resolve(&single, "B1", None, true);
        assert_eq!((v.symbol.as_str(), v.label.as_str()), ("", "a b"));
    }

    #[test]
    fn label_prefers_same_row_over_hinted_row_above() {
        let grid = GridSnapshot::from_text_rows(
            addr("A1"),
            [
                vec!["", "Unbraced length above", "", "", "", ""],
                vec!["Axial load", "", "", "", "", "5"],
            ],
        );
        // Above-row text scores 70 + 50; the same-row label only 100 + 5.
        let hint = LayoutHint::new(LayoutPattern::AboveRow).with_columns(Some(2), None, None);
        let v = resolve(&grid, "F2", Some(&hint), true);
        assert_eq!(v.label, "Axial load");
    }

    #[test]
    fn row_above_used_when_row_is_bare() {
        let grid = GridSnapshot::from_text_rows(
            addr("A1"),
            [vec!["", "", "", "Span length", ""], vec!["", "", "", "", "5"]],
        );
        let v = resolve(&grid, "E2", None, false);
        assert_eq!(v.label, "Span length");
        assert_eq!(resolve(&grid, "E2", None, true).label, "");
    }

    #[test]
    fn label_map_fills_missing_label() {
        let grid = GridSnapshot::from_text_rows(addr("A1"), [["Span", "", "6"]]);
        let config = ResolverConfig::default();
        let mut map = LabelMap::new(config.label_map_policy);
        map.insert("Clear span", addr("C1"));
        let v = VariableResolver::new(&config).resolve_a1("C1", &grid, Some(&map), None, true);
        assert_eq!(v.symbol, "Span");
        assert_eq!(v.label, "Clear span");
    }

    #[test]
    fn malformed_reference_is_empty_not_error() {
        let grid = GridSnapshot::from_text_rows(addr("A1"), [["Led", "1"]]);
        let v = resolve(&grid, "not a cell", None, true);
        assert_eq!(v, ResolvedVariable::unresolved("not a cell"));
        assert!(!v.has_meaning());
    }

    #[test]
    fn formula_is_carried_through() {
        let grid = GridSnapshot::from_text_rows(addr("A1"), [["Mu", "=B2*2"]]);
        let v = resolve(&grid, "B1", None, true);
        assert_eq!(v.formula.as_deref(), Some("=B2*2"));
        assert_eq!(v.symbol, "Mu");
    }
}
