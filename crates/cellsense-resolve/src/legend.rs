//! Legend detection: map fill colors to the role of the cells they mark.

use std::fmt;

use cellsense_common::{CellAddress, GridSnapshot, normalize_color};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::config::ScanLimits;

const HEADER_KEYWORDS: &[&str] = &["legend", "key", "category", "type"];
const ROLE_KEYWORDS: &[&str] = &["input", "output", "calc", "override", "result", "parameter"];

const KEYWORD_CONFIDENCE: f64 = 0.8;
const UNKNOWN_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendCategory {
    UserInput,
    CalculatedOutput,
    Calculation,
    Override,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for LegendCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UserInput => "user_input",
            Self::CalculatedOutput => "calculated_output",
            Self::Calculation => "calculation",
            Self::Override => "override",
            Self::Unknown => "unknown",
        })
    }
}

impl LegendCategory {
    /// Keyword heuristic over legend text. Checked in order: override,
    /// output/result, input/parameter, calc.
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["override"]) {
            Self::Override
        } else if has(&["output", "result"]) {
            Self::CalculatedOutput
        } else if has(&["input", "parameter"]) {
            Self::UserInput
        } else if has(&["calc"]) {
            Self::Calculation
        } else {
            Self::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub color: String,
    pub category: LegendCategory,
    pub description: String,
    /// In `[0, 1]`.
    pub confidence: f64,
}

/// A colored legend cell, as handed to a classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendCell {
    pub address: CellAddress,
    pub text: String,
    pub color: String,
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn joined_row_text(grid: &GridSnapshot, row: usize) -> String {
    grid.row_cells(row)
        .filter_map(|(_, cell)| cell.text())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Find a legend header, then collect colored role-keyword cells from the
/// rows that follow it. Header candidates are tried top-down; the first one
/// with colored cells below it wins. A cell's color is its own fill, else the
/// fill of its left neighbour, else its right neighbour.
pub fn find_legend_cells(grid: &GridSnapshot, limits: &ScanLimits) -> Vec<LegendCell> {
    let header_rows = grid.height().min(limits.legend_header_rows);
    for header in
        (0..header_rows).filter(|&r| contains_any(&joined_row_text(grid, r), HEADER_KEYWORDS))
    {
        let cells = legend_body_cells(grid, header, limits);
        if !cells.is_empty() {
            tracing::debug!(row = header + 1, cells = cells.len(), "legend header found");
            return cells;
        }
    }
    Vec::new()
}

fn legend_body_cells(grid: &GridSnapshot, header: usize, limits: &ScanLimits) -> Vec<LegendCell> {
    let last = grid.height().min(header + 1 + limits.legend_body_rows);
    let mut cells = Vec::new();
    for row in (header + 1)..last {
        if !contains_any(&joined_row_text(grid, row), ROLE_KEYWORDS) {
            continue;
        }
        for (address, cell) in grid.row_cells(row) {
            let Some(text) = cell.text() else {
                continue;
            };
            if !contains_any(&text.to_lowercase(), ROLE_KEYWORDS) {
                continue;
            }
            let color = cell
                .fill
                .clone()
                .or_else(|| neighbour_fill(grid, &address, -1))
                .or_else(|| neighbour_fill(grid, &address, 1));
            if let Some(color) = color {
                cells.push(LegendCell {
                    address,
                    text: text.trim().to_string(),
                    color,
                });
            }
        }
    }
    cells
}

fn neighbour_fill(grid: &GridSnapshot, address: &CellAddress, d_col: i64) -> Option<String> {
    let neighbour = address.offset(0, d_col)?;
    grid.cell(&neighbour)?.fill.clone()
}

/// Local keyword classification, one entry per color (first occurrence wins).
pub fn classify_locally(cells: &[LegendCell]) -> Vec<LegendEntry> {
    let mut seen = FxHashSet::default();
    cells
        .iter()
        .filter(|cell| seen.insert(cell.color.clone()))
        .map(|cell| {
            let category = LegendCategory::from_text(&cell.text);
            let confidence = if category == LegendCategory::Unknown {
                UNKNOWN_CONFIDENCE
            } else {
                KEYWORD_CONFIDENCE
            };
            LegendEntry {
                color: cell.color.clone(),
                category,
                description: cell.text.clone(),
                confidence,
            }
        })
        .collect()
}

/// Clamp confidences, normalize colors and drop repeated colors in an
/// externally produced answer.
pub fn sanitize_entries(entries: Vec<LegendEntry>) -> Vec<LegendEntry> {
    let mut seen = FxHashSet::default();
    entries
        .into_iter()
        .filter_map(|mut entry| {
            entry.color = normalize_color(&entry.color)?;
            entry.confidence = if entry.confidence.is_finite() {
                entry.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            };
            seen.insert(entry.color.clone()).then_some(entry)
        })
        .collect()
}

/// Detect the legend using local heuristics only.
pub fn detect_legend(grid: &GridSnapshot, limits: &ScanLimits) -> Vec<LegendEntry> {
    classify_locally(&find_legend_cells(grid, limits))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    fn legend_grid() -> GridSnapshot {
        GridSnapshot::from_text_rows(
            addr("A1"),
            [
                vec!["Beam design", "", ""],
                vec!["", "Legend", ""],
                vec!["", "", "User input"],
                vec!["", "Calculated output", ""],
                vec!["", "Override", ""],
                vec!["", "Intermediate calc", ""],
                vec!["", "Another input", ""],
            ],
        )
        .with_fill(addr("B3"), "#FFFF00")
        .with_fill(addr("B4"), "c6efce")
        .with_fill(addr("B5"), "#FF0000")
        .with_fill(addr("C6"), "#D9D9D9")
        .with_fill(addr("B7"), "#ffff00")
    }

    #[test]
    fn finds_colored_role_cells() {
        let cells = find_legend_cells(&legend_grid(), &ScanLimits::default());
        let found: Vec<_> = cells
            .iter()
            .map(|c| (c.address.to_string(), c.color.as_str()))
            .collect();
        assert_eq!(
            found,
            [
                ("C3".to_string(), "#FFFF00"),
                ("B4".to_string(), "#C6EFCE"),
                ("B5".to_string(), "#FF0000"),
                ("B6".to_string(), "#D9D9D9"),
                ("B7".to_string(), "#FFFF00"),
            ]
        );
    }

    #[test]
    fn local_classification_dedups_colors() {
        let entries = detect_legend(&legend_grid(), &ScanLimits::default());
        let cats: Vec<_> = entries.iter().map(|e| e.category).collect();
        assert_eq!(
            cats,
            [
                LegendCategory::UserInput,
                LegendCategory::CalculatedOutput,
                LegendCategory::Override,
                LegendCategory::Calculation,
            ]
        );
        assert!(entries.iter().all(|e| e.confidence == KEYWORD_CONFIDENCE));
        assert_eq!(entries[0].description, "User input");
    }

    #[test]
    fn no_header_no_legend() {
        let grid = GridSnapshot::from_text_rows(addr("A1"), [["Input", "1"]])
            .with_fill(addr("A1"), "#FFFF00");
        assert!(detect_legend(&grid, &ScanLimits::default()).is_empty());
    }

    #[test]
    fn skips_header_words_in_data_rows() {
        let mut rows = vec![vec!["Section type", "W310x39"], vec!["Input", "A992"]];
        rows.extend((0..12).map(|_| vec![""]));
        rows.push(vec!["Legend"]);
        rows.push(vec!["User input"]);
        let grid = GridSnapshot::from_text_rows(addr("A1"), rows).with_fill(addr("A16"), "#FFFF00");
        let cells = find_legend_cells(&grid, &ScanLimits::default());
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].address, addr("A16"));
        assert_eq!(cells[0].color, "#FFFF00");
    }

    #[test]
    fn uncolored_cells_are_skipped() {
        let grid = GridSnapshot::from_text_rows(addr("A1"), [vec!["Key"], vec!["Input"]]);
        assert!(find_legend_cells(&grid, &ScanLimits::default()).is_empty());
    }

    #[test]
    fn category_keyword_order() {
        assert_eq!(
            LegendCategory::from_text("Calculated result"),
            LegendCategory::CalculatedOutput
        );
        assert_eq!(
            LegendCategory::from_text("Input override"),
            LegendCategory::Override
        );
        assert_eq!(
            LegendCategory::from_text("Design parameter"),
            LegendCategory::UserInput
        );
        assert_eq!(LegendCategory::from_text("Notes"), LegendCategory::Unknown);
    }

    #[test]
    fn sanitize_clamps_and_dedups() {
        let entries = sanitize_entries(vec![
            LegendEntry {
                color: "ffff00".into(),
                category: LegendCategory::UserInput,
                description: "Input".into(),
                confidence: 1.7,
            },
            LegendEntry {
                color: "#FFFF00".into(),
                category: LegendCategory::Calculation,
                description: "dup".into(),
                confidence: 0.5,
            },
            LegendEntry {
                color: " ".into(),
                category: LegendCategory::Unknown,
                description: "blank".into(),
                confidence: f64::NAN,
            },
        ]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].color, "#FFFF00");
        assert_eq!(entries[0].confidence, 1.0);
    }

    #[test]
    fn category_wire_names() {
        let json = serde_json::to_string(&LegendCategory::CalculatedOutput).unwrap();
        assert_eq!(json, "\"calculated_output\"");
        let parsed: LegendCategory = serde_json::from_str("\"mystery\"").unwrap();
        assert_eq!(parsed, LegendCategory::Unknown);
    }
}
