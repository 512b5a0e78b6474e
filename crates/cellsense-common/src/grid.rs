//! Immutable 2-D snapshot of a sheet region.
//!
//! A snapshot stores cells row-major, relative to `origin` (the absolute
//! address of its top-left cell). Rows may be ragged; any lookup outside the
//! stored cells yields `None` rather than an error.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::address::CellAddress;
use crate::value::CellValue;

/// One cell as reported by the host.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridCell {
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: CellValue,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub formula: Option<String>,
    /// Normalized fill color, see [`normalize_color`].
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub fill: Option<String>,
}

impl GridCell {
    pub fn from_value(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            formula: None,
            fill: None,
        }
    }

    /// Non-blank text value. Formula cells expose their cached value only.
    pub fn text(&self) -> Option<&str> {
        self.value.as_text()
    }

    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GridSnapshot {
    origin: CellAddress,
    rows: Vec<Vec<GridCell>>,
}

impl GridSnapshot {
    pub fn new(origin: CellAddress, rows: Vec<Vec<GridCell>>) -> Self {
        Self { origin, rows }
    }

    /// Build from plain values.
    pub fn from_values(origin: CellAddress, values: Vec<Vec<CellValue>>) -> Self {
        let rows = values
            .into_iter()
            .map(|row| row.into_iter().map(GridCell::from_value).collect())
            .collect();
        Self { origin, rows }
    }

    /// Build from host text: numeric strings become numbers and `=`-prefixed
    /// strings become formulas with an empty cached value.
    pub fn from_text_rows<R, S>(origin: CellAddress, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|raw| {
                        let raw = raw.as_ref();
                        if raw.starts_with('=') && raw.len() > 1 {
                            GridCell {
                                value: CellValue::Empty,
                                formula: Some(raw.to_string()),
                                fill: None,
                            }
                        } else {
                            GridCell::from_value(CellValue::from_host_text(raw))
                        }
                    })
                    .collect()
            })
            .collect();
        Self { origin, rows }
    }

    /// Attach a formula to an absolute address, growing the grid if needed.
    pub fn with_formula(mut self, address: CellAddress, formula: impl Into<String>) -> Self {
        if let Some(cell) = self.cell_mut_or_grow(address) {
            cell.formula = Some(formula.into());
        }
        self
    }

    /// Attach a fill color to an absolute address, growing the grid if needed.
    pub fn with_fill(mut self, address: CellAddress, color: &str) -> Self {
        if let Some(cell) = self.cell_mut_or_grow(address) {
            cell.fill = normalize_color(color);
        }
        self
    }

    /// Replace the cached value at an absolute address, growing the grid if needed.
    pub fn with_value(mut self, address: CellAddress, value: impl Into<CellValue>) -> Self {
        if let Some(cell) = self.cell_mut_or_grow(address) {
            cell.value = value.into();
        }
        self
    }

    pub fn origin(&self) -> CellAddress {
        self.origin
    }

    pub fn rows(&self) -> &[Vec<GridCell>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// Snapshot-relative `(row, col)` indices for an absolute address.
    pub fn to_index(&self, address: &CellAddress) -> Option<(usize, usize)> {
        let row = address.row.checked_sub(self.origin.row)? as usize;
        let col = address.column.checked_sub(self.origin.column)? as usize;
        Some((row, col))
    }

    /// Absolute address for snapshot-relative indices.
    pub fn to_address(&self, row: usize, col: usize) -> Option<CellAddress> {
        let row = u32::try_from(row).ok()?.checked_add(self.origin.row)?;
        let column = u32::try_from(col).ok()?.checked_add(self.origin.column)?;
        Some(CellAddress { column, row })
    }

    pub fn cell(&self, address: &CellAddress) -> Option<&GridCell> {
        let (row, col) = self.to_index(address)?;
        self.rows.get(row)?.get(col)
    }

    pub fn value(&self, address: &CellAddress) -> Option<&CellValue> {
        self.cell(address).map(|c| &c.value)
    }

    pub fn text(&self, address: &CellAddress) -> Option<&str> {
        self.cell(address).and_then(GridCell::text)
    }

    /// Iterate every stored cell with its absolute address, row-major.
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellAddress, &GridCell)> + '_ {
        self.rows.iter().enumerate().flat_map(move |(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, cell)| self.to_address(r, c).map(|addr| (addr, cell)))
        })
    }

    /// Iterate the cells of one snapshot-relative row with absolute addresses.
    pub fn row_cells(&self, row: usize) -> impl Iterator<Item = (CellAddress, &GridCell)> + '_ {
        self.rows
            .get(row)
            .into_iter()
            .flat_map(move |cells| {
                cells
                    .iter()
                    .enumerate()
                    .filter_map(move |(c, cell)| self.to_address(row, c).map(|addr| (addr, cell)))
            })
    }

    fn cell_mut_or_grow(&mut self, address: CellAddress) -> Option<&mut GridCell> {
        let (row, col) = self.to_index(&address)?;
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, GridCell::default);
        }
        cells.get_mut(col)
    }
}

/// Normalize a host color: hex forms (`ffff00`, `#FF0`, `FFFFFF00` ARGB)
/// become `#RRGGBB`; anything else is trimmed and kept. Blank → `None`.
pub fn normalize_color(color: &str) -> Option<String> {
    let trimmed = color.trim();
    if trimmed.is_empty() {
        return None;
    }
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        let upper = hex.to_ascii_uppercase();
        match upper.len() {
            6 => return Some(format!("#{upper}")),
            8 => return Some(format!("#{}", &upper[2..])),
            3 => {
                let expanded: String = upper.chars().flat_map(|c| [c, c]).collect();
                return Some(format!("#{expanded}"));
            }
            _ => {}
        }
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn lookups_are_origin_relative() {
        let grid = GridSnapshot::from_text_rows(addr("B3"), [["Led", "", "", "12.5"]]);
        assert_eq!(grid.text(&addr("B3")), Some("Led"));
        assert_eq!(grid.value(&addr("E3")), Some(&CellValue::Number(12.5)));
        assert!(grid.cell(&addr("A3")).is_none());
        assert!(grid.cell(&addr("B2")).is_none());
        assert!(grid.cell(&addr("B4")).is_none());
        assert_eq!(grid.to_address(0, 3), Some(addr("E3")));
    }

    #[test]
    fn text_rows_split_formulas() {
        let grid = GridSnapshot::from_text_rows(addr("A1"), [["=B1*2", "x"]]);
        let cell = grid.cell(&addr("A1")).unwrap();
        assert_eq!(cell.formula.as_deref(), Some("=B1*2"));
        assert_eq!(cell.value, CellValue::Empty);
    }

    #[test]
    fn builders_grow_ragged_rows() {
        let grid = GridSnapshot::from_text_rows(addr("A1"), [["a"]])
            .with_fill(addr("C2"), "ffff00")
            .with_value(addr("C2"), "Input");
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.width(), 3);
        let cell = grid.cell(&addr("C2")).unwrap();
        assert_eq!(cell.fill.as_deref(), Some("#FFFF00"));
        assert_eq!(cell.text(), Some("Input"));
        // Addresses left of / above the origin are ignored.
        let grid = GridSnapshot::from_text_rows(addr("B2"), [["a"]]).with_fill(addr("A1"), "red");
        assert_eq!(grid.height(), 1);
    }

    #[test]
    fn iter_cells_is_row_major_and_absolute() {
        let grid = GridSnapshot::from_text_rows(addr("C5"), [vec!["a", "b"], vec!["c"]]);
        let seen: Vec<String> = grid.iter_cells().map(|(a, _)| a.to_string()).collect();
        assert_eq!(seen, ["C5", "D5", "C6"]);
    }

    #[test]
    fn color_normalization() {
        assert_eq!(normalize_color("#ff0").as_deref(), Some("#FFFF00"));
        assert_eq!(normalize_color("FFC6EFCE").as_deref(), Some("#C6EFCE"));
        assert_eq!(normalize_color(" lightblue ").as_deref(), Some("lightblue"));
        assert_eq!(normalize_color("  "), None);
    }
}
