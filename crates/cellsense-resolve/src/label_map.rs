//! Sheet-wide reverse index from label text to the value cell it names.

use std::collections::BTreeMap;

use cellsense_common::{CellAddress, GridSnapshot};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::classify::classify;
use crate::config::{DuplicatePolicy, ScanLimits};
use crate::scanner::is_numeric_text;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelEntry {
    pub address: CellAddress,
    /// Label as written in the sheet (trimmed).
    pub text: String,
}

/// Every occurrence of a label is kept in row-major scan order, so repeated
/// section labels ("Span" in several design blocks) can be told apart.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    entries: BTreeMap<String, Vec<LabelEntry>>,
    by_address: FxHashMap<CellAddress, Vec<String>>,
    policy: DuplicatePolicy,
}

/// Lower-case, collapse inner whitespace, drop trailing `:` / `=`.
pub fn normalize_label(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches([':', '='])
        .trim_end()
        .to_lowercase()
}

impl LabelMap {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, label: &str, address: CellAddress) {
        let key = normalize_label(label);
        self.entries.entry(key.clone()).or_default().push(LabelEntry {
            address,
            text: label.trim().to_string(),
        });
        self.by_address.entry(address).or_default().push(key);
    }

    /// One address per label according to the duplicate policy.
    pub fn get(&self, label: &str) -> Option<CellAddress> {
        let all = self.entries.get(&normalize_label(label))?;
        let entry = match self.policy {
            DuplicatePolicy::First => all.first(),
            DuplicatePolicy::Last => all.last(),
        };
        entry.map(|e| e.address)
    }

    pub fn get_all(&self, label: &str) -> &[LabelEntry] {
        self.entries
            .get(&normalize_label(label))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Occurrence closest to `target`; ties go to the earlier occurrence.
    pub fn nearest(&self, label: &str, target: &CellAddress) -> Option<CellAddress> {
        self.get_all(label)
            .iter()
            .min_by_key(|e| e.address.manhattan_distance(target))
            .map(|e| e.address)
    }

    /// Label text that names `address`, preferring descriptive text over
    /// symbol-like text, then the nearest (last scanned) label.
    pub fn label_for(&self, address: &CellAddress) -> Option<&str> {
        let keys = self.by_address.get(address)?;
        let texts: Vec<&str> = keys
            .iter()
            .filter_map(|key| {
                self.entries
                    .get(key)?
                    .iter()
                    .find(|e| e.address == *address)
                    .map(|e| e.text.as_str())
            })
            .collect();
        texts
            .iter()
            .rev()
            .find(|t| classify(t).looks_like_label())
            .or_else(|| texts.last())
            .copied()
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Number of distinct normalized labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalized labels with their occurrences, sorted by label.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[LabelEntry])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// One pass over the grid: each non-formula text cell whose normalized text
/// is longer than two characters and not numeric maps to the first
/// numeric-looking cell within `label_map_right_window` columns to its right.
pub fn build_label_map(grid: &GridSnapshot, limits: &ScanLimits, policy: DuplicatePolicy) -> LabelMap {
    let mut map = LabelMap::new(policy);
    for (address, cell) in grid.iter_cells() {
        if cell.is_formula() {
            continue;
        }
        let Some(text) = cell.text() else {
            continue;
        };
        let normalized = normalize_label(text);
        if normalized.chars().count() <= 2 || is_numeric_text(&normalized.to_uppercase()) {
            continue;
        }
        let found = (1..=limits.label_map_right_window).find_map(|step| {
            let probe = address.offset(0, i64::from(step))?;
            grid.value(&probe)
                .filter(|v| v.is_numeric_like())
                .map(|_| probe)
        });
        if let Some(value_address) = found {
            map.insert(text, value_address);
        }
    }
    tracing::debug!(labels = map.len(), "built label map");
    map
}
