//! Cell addressing and cell values.
//!
//! Rows are 1-based, columns are single letters `A..=Z`. A `CellRef` formats
//! as the familiar `B7` reference, which is also the key used in the
//! persisted cell map.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Single-letter columns only: A..=Z.
pub const MAX_COLUMNS: usize = 26;

/// A grid column, stored as its 0-based index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column(u8);

impl Column {
    /// Column for a 0-based index (0 = A). `None` past Z.
    pub fn from_index(index: usize) -> Option<Self> {
        if index < MAX_COLUMNS {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Column for a letter, case-insensitive.
    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            Some(Self(upper as u8 - b'A'))
        } else {
            None
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn letter(self) -> char {
        (b'A' + self.0) as char
    }

    /// Iterate the first `count` columns (A, B, ...).
    pub fn first(count: usize) -> impl Iterator<Item = Column> {
        (0..count.min(MAX_COLUMNS)).map(|i| Column(i as u8))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl Serialize for Column {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Column {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Column::from_letter(c)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid column letter: {s:?}"))),
            _ => Err(serde::de::Error::custom(format!("invalid column letter: {s:?}"))),
        }
    }
}

/// Address of one cell: 1-based row plus column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: Column,
}

impl CellRef {
    #[inline]
    pub fn new(row: u32, col: Column) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col.letter(), self.row)
    }
}

/// Error parsing an `A1`-style reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCellRefError(pub String);

impl fmt::Display for ParseCellRefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cell reference: {:?}", self.0)
    }
}

impl std::error::Error for ParseCellRefError {}

impl FromStr for CellRef {
    type Err = ParseCellRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCellRefError(s.to_string());
        let mut chars = s.chars();
        let col = chars.next().and_then(Column::from_letter).ok_or_else(err)?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let row: u32 = digits.parse().map_err(|_| err())?;
        if row == 0 {
            return Err(err());
        }
        Ok(CellRef { row, col })
    }
}

/// Execution state of a cell in an executable column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    /// Not executed yet
    #[default]
    Idle,
    /// A simulated run is in flight
    Pending,
    /// Run finished with a recorded output
    Complete(String),
}

impl RunState {
    pub fn has_output(&self) -> bool {
        matches!(self, RunState::Complete(_))
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            RunState::Complete(out) => Some(out),
            _ => None,
        }
    }
}

/// Stored content of a cell. Absent entries are the kind's default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Text(String),
    Run(RunState),
}

impl CellValue {
    /// String value as exposed by `get_cell`: text, or the recorded output.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Run(state) => state.output().unwrap_or_default().to_string(),
        }
    }

    /// True for values that need not be stored (empty text, idle run).
    pub fn is_default(&self) -> bool {
        match self {
            CellValue::Text(s) => s.is_empty(),
            CellValue::Run(state) => *state == RunState::Idle,
        }
    }
}
