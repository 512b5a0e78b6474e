//! Cell references used by a formula, each resolved to its meaning.

use cellsense_common::{CellAddress, GridSnapshot};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::hint::LayoutHint;
use crate::label_map::LabelMap;
use crate::resolver::{ResolvedVariable, VariableResolver};

static CELL_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$?([A-Z]{1,3})\$?([0-9]{1,7})").expect("cell reference regex must compile")
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaDependency {
    /// Reference as it appears in the formula, minus `$` anchors.
    pub cell_ref: String,
    pub resolved: ResolvedVariable,
}

/// Distinct cell references in first-seen order. Returns nothing when the
/// text does not start with `=`.
///
/// Skipped: text in string literals, function names such as `LOG10(`,
/// references qualified with another sheet (`Sheet2!B5`, both ends of
/// `Sheet2!B5:C6`).
pub fn extract_cell_refs(formula: &str) -> Vec<String> {
    let Some(body) = formula.trim_start().strip_prefix('=') else {
        return Vec::new();
    };
    let masked = mask_string_literals(body);
    let bytes = masked.as_bytes();

    let mut seen = FxHashSet::default();
    let mut refs = Vec::new();
    // End offset of the last reference qualified with another sheet.
    let mut foreign_end: Option<usize> = None;
    for caps in CELL_REF.captures_iter(&masked) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let (start, end) = (whole.start(), whole.end());
        let range_of_foreign = foreign_end
            .take()
            .is_some_and(|prev| bytes.get(prev) == Some(&b':') && start == prev + 1);
        if range_of_foreign {
            continue;
        }
        let glued_before = start > 0 && is_ident_byte(bytes[start - 1]);
        let glued_after = bytes.get(end).is_some_and(|b| is_ident_byte(*b));
        if glued_before || glued_after {
            continue;
        }
        let next = masked[end..].trim_start().chars().next();
        if next == Some('(') {
            continue;
        }
        if start > 0 && bytes[start - 1] == b'!' {
            foreign_end = Some(end);
            continue;
        }
        let cell_ref = format!("{}{}", &caps[1], &caps[2]);
        if seen.insert(cell_ref.clone()) {
            refs.push(cell_ref);
        }
    }
    refs
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// Replace the contents of `"..."` literals (including `""` escapes) with
/// spaces so byte offsets stay aligned with the original text.
fn mask_string_literals(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_string = false;
    for ch in body.chars() {
        if ch == '"' {
            in_string = !in_string;
            out.push('"');
        } else if in_string {
            out.extend(std::iter::repeat_n(' ', ch.len_utf8()));
        } else {
            out.push(ch);
        }
    }
    out
}

/// Extract and resolve every dependency of `formula`. Dependencies are
/// resolved with `strict_same_row = true`: a referenced value normally
/// shares its row with its label. `label_map` supplies labels the scan misses.
pub fn parse_formula_dependencies(
    resolver: &VariableResolver<'_>,
    formula: &str,
    grid: &GridSnapshot,
    label_map: Option<&LabelMap>,
    hint: Option<&LayoutHint>,
) -> Vec<FormulaDependency> {
    extract_cell_refs(formula)
        .into_iter()
        .filter_map(|cell_ref| {
            let address = CellAddress::parse(&cell_ref).ok()?;
            let resolved = resolver.resolve(&address, grid, label_map, hint, true);
            Some(FormulaDependency { cell_ref, resolved })
        })
        .collect()
}
