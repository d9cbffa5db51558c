//! Cell address encoding and decoding.
//!
//! Provides bidirectional conversion between spreadsheet-style addresses
//! (e.g., "A1", "B2", "AA100") and zero-indexed row/column coordinates.
//!
//! # Examples
//!
//! ```
//! use cellar_engine::engine::{decode, encode};
//!
//! assert_eq!(encode(2, 1), "B3");
//! let cell = decode("B3").unwrap();
//! assert_eq!((cell.row, cell.col), (2, 1));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::{EngineError, Result};

/// A reference to a cell by row and column indices (0-indexed).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse an address such as "A1" or "AA10".
    ///
    /// Only uppercase column letters are accepted and the row number is
    /// 1-based, so "A0" is rejected.
    pub fn parse(address: &str) -> Result<CellRef> {
        let invalid = || EngineError::InvalidAddress(address.to_string());
        let caps = address_re().captures(address).ok_or_else(invalid)?;

        let mut col_acc = 0usize;
        for c in caps["letters"].bytes() {
            let digit = (c - b'A') as usize + 1;
            col_acc = col_acc
                .checked_mul(26)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(invalid)?;
        }
        let col = col_acc.checked_sub(1).ok_or_else(invalid)?;

        let row = caps["numbers"]
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(invalid)?;

        Ok(CellRef::new(row, col))
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }

    /// Whether this address lies inside a `row_count` x `col_count` grid.
    pub fn within(&self, row_count: usize, col_count: usize) -> bool {
        self.row < row_count && self.col < col_count
    }
}

impl std::str::FromStr for CellRef {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        CellRef::parse(s)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row + 1)
    }
}

/// Render a zero-based row/column pair as an address string.
pub fn encode(row: usize, col: usize) -> String {
    CellRef::new(row, col).to_string()
}

/// Decode an address string into a zero-based row/column pair.
pub fn decode(address: &str) -> Result<CellRef> {
    CellRef::parse(address)
}

/// Whether `text` has the shape of an address (uppercase letters then digits).
pub fn is_address(text: &str) -> bool {
    address_re().is_match(text)
}

fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Z]+)(?<numbers>[0-9]+)$").expect("address regex must compile")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overflow_is_invalid() {
        let huge = format!("{}1", "Z".repeat(40));
        assert!(matches!(
            CellRef::parse(&huge),
            Err(EngineError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_col_to_letters_handles_max_usize() {
        let letters = CellRef::col_to_letters(usize::MAX);
        assert!(!letters.is_empty());
        assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        for row in 0..26 {
            for col in [0, 1, 12, 25, 26, 51, 702] {
                let cell = decode(&encode(row, col)).unwrap();
                assert_eq!((cell.row, cell.col), (row, col));
            }
        }
    }

    #[test]
    fn test_lowercase_is_rejected() {
        assert!(decode("a1").is_err());
        assert!(!is_address("b2"));
    }

    #[test]
    fn test_within_bounds() {
        let cell = CellRef::new(49, 25);
        assert!(cell.within(50, 26));
        assert!(!cell.within(49, 26));
        assert!(!cell.within(50, 25));
    }
}
