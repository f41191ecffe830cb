//! Cell values and coordinates as seen by interceptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The computed value of a cell, as handed to style interceptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Error literal such as `#DIV/0!`.
    Error(String),
}

impl CellValue {
    /// Returns `true` for [`CellValue::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the numeric value, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text value, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Zero-based (row, column) coordinates of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoords {
    pub row: u32,
    pub col: u32,
}

impl CellCoords {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Column letters for this cell (`0 -> "A"`, `26 -> "AA"`).
    pub fn column_name(&self) -> String {
        let mut n = u64::from(self.col) + 1;
        let mut letters = Vec::new();
        while n > 0 {
            let rem = ((n - 1) % 26) as u8;
            letters.push(b'A' + rem);
            n = (n - 1) / 26;
        }
        letters.reverse();
        String::from_utf8_lossy(&letters).into_owned()
    }
}

impl fmt::Display for CellCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_name(), u64::from(self.row) + 1)
    }
}

impl From<(u32, u32)> for CellCoords {
    fn from((row, col): (u32, u32)) -> Self {
        Self { row, col }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a1_display() {
        assert_eq!(CellCoords::new(0, 0).to_string(), "A1");
        assert_eq!(CellCoords::new(9, 25).to_string(), "Z10");
        assert_eq!(CellCoords::new(0, 26).to_string(), "AA1");
        assert_eq!(CellCoords::new(4, 702).to_string(), "AAA5");
    }

    #[test]
    fn test_a1_display_at_u32_max() {
        let coords = CellCoords::new(u32::MAX, u32::MAX);
        assert_eq!(coords.column_name(), "MWLQKWV");
        assert_eq!(coords.to_string(), "MWLQKWV4294967296");
    }

    #[test]
    fn test_value_serde_shape() {
        let json = serde_json::to_value(CellValue::Number(2.5)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "number", "value": 2.5 }));
        let empty = serde_json::to_value(CellValue::Empty).unwrap();
        assert_eq!(empty, serde_json::json!({ "type": "empty" }));
    }
}
