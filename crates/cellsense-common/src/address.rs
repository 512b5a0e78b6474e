//! Sheet-relative cell coordinates and A1 conversion helpers.
//!
//! `CellAddress` is 1-based on both axes, matching the way hosts report
//! selections (`B5` is column 2, row 5). Grid snapshots translate these into
//! 0-based indices relative to their own origin.

use core::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// Absolute (sheet-relative) cell position, 1-based.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub column: u32,
    pub row: u32,
}

impl CellAddress {
    /// Construct from 1-based coordinates.
    pub fn new(column: u32, row: u32) -> Result<Self, AddressError> {
        if column == 0 || row == 0 {
            return Err(AddressError::ZeroIndex);
        }
        Ok(Self { column, row })
    }

    /// Parse an `A1`-style reference. `$` anchors are accepted and dropped.
    pub fn parse(reference: &str) -> Result<Self, AddressError> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }
        let cleaned: String = trimmed.chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(cleaned.len());
        let (letters, digits) = cleaned.split_at(split);
        if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(AddressError::InvalidColumn(trimmed.to_string()));
        }
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::InvalidRow(trimmed.to_string()));
        }
        let column = letters_to_column(letters)
            .ok_or_else(|| AddressError::ColumnOverflow(trimmed.to_string()))?;
        let row: u32 = digits
            .parse()
            .map_err(|_| AddressError::InvalidRow(trimmed.to_string()))?;
        Self::new(column, row)
    }

    /// Offset by signed deltas; `None` when the result leaves the sheet.
    pub fn offset(self, d_row: i64, d_col: i64) -> Option<Self> {
        let row = i64::from(self.row) + d_row;
        let column = i64::from(self.column) + d_col;
        if row < 1 || column < 1 || row > i64::from(u32::MAX) || column > i64::from(u32::MAX) {
            return None;
        }
        Some(Self {
            column: column as u32,
            row: row as u32,
        })
    }

    /// Column letters for this address (`28` → `AB`).
    pub fn column_letters(&self) -> String {
        column_letters(self.column)
    }

    /// Sum of the row and column distances to `other`.
    pub fn manhattan_distance(&self, other: &CellAddress) -> u32 {
        self.row.abs_diff(other.row) + self.column.abs_diff(other.column)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.column), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<(u32, u32)> for CellAddress {
    type Error = AddressError;

    /// `(column, row)`, both 1-based.
    fn try_from(value: (u32, u32)) -> Result<Self, Self::Error> {
        Self::new(value.0, value.1)
    }
}

/// Convert a 1-based column number to letters. `0` renders as an empty string.
pub fn column_letters(column: u32) -> String {
    let mut col = column;
    let mut buf = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        buf.push(b'A' + rem);
        col = (col - 1) / 26;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

/// Convert upper-case column letters to a 1-based column number.
pub fn letters_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.bytes() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?;
        col = col.checked_add(u32::from(ch - b'A') + 1)?;
    }
    Some(col)
}
