//! Collect text candidates around a target cell.

use cellsense_common::{CellAddress, GridSnapshot, parse_numeric_text};
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use crate::classify::{TextKind, classify};
use crate::config::ScanLimits;
use crate::hint::LayoutHint;

static NUMERIC_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9.E+\-()]+$").expect("numeric-like regex must compile"));

const TRAILING_PUNCTUATION: &[char] = &[':', '=', ';', ',', '.'];

/// A text cell considered as a label or symbol for a target value.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub address: CellAddress,
    pub text: String,
    /// `0` for the target's row, `-1` for the row above.
    pub row_offset: i32,
    pub column_distance: u32,
    pub looks_like_symbol: bool,
    pub looks_like_label: bool,
    pub score: f64,
}

impl Candidate {
    fn new(address: CellAddress, text: String, target: &CellAddress) -> Self {
        let classification = classify(&text);
        Self {
            row_offset: if address.row == target.row { 0 } else { -1 },
            column_distance: address.column.abs_diff(target.column),
            looks_like_symbol: classification.looks_like_symbol(),
            looks_like_label: classification.looks_like_label(),
            address,
            text,
            score: 0.0,
        }
    }

    pub fn same_row(&self) -> bool {
        self.row_offset == 0
    }

    pub fn kind(&self) -> TextKind {
        match (self.looks_like_symbol, self.looks_like_label) {
            (true, true) => TextKind::Both,
            (true, false) => TextKind::Symbol,
            (false, true) => TextKind::Label,
            (false, false) => TextKind::Neither,
        }
    }

    pub fn is_classified(&self) -> bool {
        self.looks_like_symbol || self.looks_like_label
    }
}

/// Trim whitespace and strip trailing `:` `=` `;` `,` `.`.
pub fn clean_candidate_text(raw: &str) -> &str {
    raw.trim().trim_end_matches(TRAILING_PUNCTUATION).trim_end()
}

/// True for text made only of digits and number punctuation (`1.5E+3`, `(2)`)
/// and for formatted numbers a reader would take as values (`12,500`, `15%`).
pub fn is_numeric_text(text: &str) -> bool {
    NUMERIC_LIKE.is_match(text) || parse_numeric_text(text).is_some()
}

fn candidate_text(grid: &GridSnapshot, address: &CellAddress) -> Option<String> {
    let raw = grid.text(address)?;
    let text = clean_candidate_text(raw);
    if text.is_empty() || is_numeric_text(text) {
        return None;
    }
    Some(text.to_string())
}

/// Walk the target's row leftwards, then (when allowed) a fixed set of
/// columns in the row above. Order of the result is scan order.
pub fn scan_candidates(
    target: &CellAddress,
    grid: &GridSnapshot,
    hint: Option<&LayoutHint>,
    strict_same_row: bool,
    limits: &ScanLimits,
) -> Vec<Candidate> {
    let mut out = Vec::new();

    let leftmost = target.column.saturating_sub(limits.left_window).max(1);
    for column in (leftmost..target.column).rev() {
        let address = CellAddress {
            column,
            row: target.row,
        };
        if let Some(text) = candidate_text(grid, &address) {
            out.push(Candidate::new(address, text, target));
        }
    }

    let look_above = !strict_same_row || hint.is_some_and(|h| h.pattern.looks_above());
    if look_above && target.row > 1 {
        let row = target.row - 1;
        for column in above_columns(target, hint, limits) {
            let address = CellAddress { column, row };
            if let Some(text) = candidate_text(grid, &address) {
                out.push(Candidate::new(address, text, target));
            }
        }
    }

    out
}

fn above_columns(
    target: &CellAddress,
    hint: Option<&LayoutHint>,
    limits: &ScanLimits,
) -> SmallVec<[u32; 4]> {
    let mut columns: SmallVec<[u32; 4]> = SmallVec::new();
    let hinted: SmallVec<[u32; 2]> = hint
        .map(|h| h.label_column.into_iter().chain(h.symbol_column).collect())
        .unwrap_or_default();
    if hinted.is_empty() {
        for offset in &limits.above_offsets {
            if let Some(addr) = target.offset(0, *offset) {
                columns.push(addr.column);
            }
        }
    } else {
        columns.extend(hinted);
    }
    let mut seen = SmallVec::<[u32; 4]>::new();
    columns.retain(|c| {
        if seen.contains(c) {
            false
        } else {
            seen.push(*c);
            true
        }
    });
    columns
}
