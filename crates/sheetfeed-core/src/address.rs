//! Cell addresses in the two notations the feed service speaks
//!
//! Rows and columns are 1-based everywhere in this crate, matching the
//! `row`/`col` attributes of `gs:cell` elements. Batch requests identify cells
//! by A1 address (`B3`), while cell resources live under R1C1 paths (`R3C2`).

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "B3", "$B$3")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Row number (1-based)
    pub row: u32,
    /// Column number (1-based, A=1)
    pub col: u32,
    /// Whether the A1 form carries `$` markers
    pub absolute: bool,
}

impl CellAddress {
    /// Create a relative address, rejecting row or column 0
    pub fn new(row: u32, col: u32) -> Result<Self> {
        check_position(row, col)?;
        Ok(Self {
            row,
            col,
            absolute: false,
        })
    }

    /// Create an absolute address ($B$3 style)
    pub fn absolute(row: u32, col: u32) -> Result<Self> {
        check_position(row, col)?;
        Ok(Self {
            row,
            col,
            absolute: true,
        })
    }

    /// Parse a cell address from A1-style notation
    ///
    /// Absolute markers are accepted on either part; the address counts as
    /// absolute when any marker is present.
    ///
    /// # Examples
    /// ```
    /// use sheetfeed_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("B3").unwrap();
    /// assert_eq!((addr.row, addr.col), (3, 2));
    ///
    /// let addr = CellAddress::parse("$AA$10").unwrap();
    /// assert_eq!((addr.row, addr.col), (10, 27));
    /// assert!(addr.absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;
        let mut absolute = false;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
            absolute = true;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(Error::InvalidAddress(format!("no column letters in '{}'", s)));
        }
        let col = letters_to_column(&s[col_start..pos])?;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
            absolute = true;
        }

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }
        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        check_position(row, col)?;
        Ok(Self { row, col, absolute })
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format_a1(self.row, self.col, self.absolute)
    }

    /// Format as R1C1-style string (the cell's resource path segment)
    pub fn to_r1c1_string(&self) -> String {
        format!("R{}C{}", self.row, self.col)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn check_position(row: u32, col: u32) -> Result<()> {
    if row == 0 || col == 0 {
        return Err(Error::InvalidAddress(format!(
            "row and column must be >= 1 (got row {}, column {})",
            row, col
        )));
    }
    Ok(())
}

fn format_a1(row: u32, col: u32, absolute: bool) -> String {
    let marker = if absolute { "$" } else { "" };
    format!("{marker}{}{marker}{row}", letters_unchecked(col))
}

fn letters_unchecked(col: u32) -> String {
    let mut result = Vec::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        result.push((n % 26) as u8 + b'A');
        n /= 26;
    }

    result.reverse();
    // Only ASCII capitals were pushed
    String::from_utf8(result).unwrap_or_default()
}

/// Convert a 1-based column number to letters (1 = A, 26 = Z, 27 = AA, etc.)
pub fn column_to_letters(col: u32) -> Result<String> {
    if col == 0 {
        return Err(Error::InvalidAddress("column must be >= 1".into()));
    }
    Ok(letters_unchecked(col))
}

/// Convert column letters to a 1-based column number (A = 1, Z = 26, AA = 27, etc.)
pub fn letters_to_column(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::InvalidAddress("empty column letters".into()));
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::InvalidAddress(format!("invalid column letter '{}'", c)));
        }
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(digit))
            .ok_or_else(|| Error::InvalidAddress(format!("column '{}' is too large", letters)))?;
    }

    Ok(col)
}

/// A1 address for a row/column pair: `($)?<letters>($)?<row>`
pub fn to_a1(row: u32, col: u32, absolute: bool) -> Result<String> {
    check_position(row, col)?;
    Ok(format_a1(row, col, absolute))
}

/// R1C1 address for a row/column pair: `R<row>C<col>`
pub fn to_r1c1(row: u32, col: u32) -> Result<String> {
    check_position(row, col)?;
    Ok(format!("R{}C{}", row, col))
}
