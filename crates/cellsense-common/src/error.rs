//! Errors raised while constructing addresses from unchecked input.

use std::{error::Error, fmt};

/// Reasons an A1-style reference or raw coordinate pair was rejected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AddressError {
    /// Input was empty after trimming.
    Empty,
    /// Row or column was 0; addresses are 1-based.
    ZeroIndex,
    /// Column letters were missing or not ASCII upper-case.
    InvalidColumn(String),
    /// Row digits were missing or not a number.
    InvalidRow(String),
    /// Column letters overflowed a `u32`.
    ColumnOverflow(String),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Empty => write!(f, "cell reference is empty"),
            AddressError::ZeroIndex => {
                write!(f, "row and column indices must be 1-based (>= 1)")
            }
            AddressError::InvalidColumn(s) => write!(f, "invalid column letters in `{s}`"),
            AddressError::InvalidRow(s) => write!(f, "invalid row number in `{s}`"),
            AddressError::ColumnOverflow(s) => write!(f, "column in `{s}` is out of range"),
        }
    }
}

impl Error for AddressError {}
