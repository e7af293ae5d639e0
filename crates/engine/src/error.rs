use std::fmt;

use crate::cell::{CellRef, Column};

/// Errors returned by grid operations. None of them are fatal: the state is
/// left untouched and the caller decides how to surface the problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Row or column outside the current grid bounds.
    /// `row` is `None` when a whole column was addressed.
    OutOfRange { row: Option<u32>, col: Column },
    /// Column configuration is missing a field its kind requires.
    InvalidConfig { col: Column, reason: String },
    /// Adding a column would go past Z.
    ColumnLimitExceeded { limit: usize },
    /// Appending rows would go past the row cap.
    RowLimitExceeded { limit: u32, requested: u64 },
    /// Persisted state could not be turned back into a grid.
    CorruptState(String),
    /// Cell is in a test-mode locked row and cannot be run.
    Locked(CellRef),
    /// Column kind has nothing to run.
    NotExecutable { col: Column },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { row: Some(row), col } => {
                write!(f, "cell {}{row} is out of range", col.letter())
            }
            Self::OutOfRange { row: None, col } => write!(f, "column {col} is out of range"),
            Self::InvalidConfig { col, reason } => {
                write!(f, "invalid configuration for column {col}: {reason}")
            }
            Self::ColumnLimitExceeded { limit } => {
                write!(f, "cannot add column: limit of {limit} columns reached")
            }
            Self::RowLimitExceeded { limit, requested } => {
                write!(f, "cannot grow to {requested} rows: limit is {limit}")
            }
            Self::CorruptState(msg) => write!(f, "corrupt state: {msg}"),
            Self::Locked(cell) => write!(f, "cell {cell} is locked while test mode is active"),
            Self::NotExecutable { col } => write!(f, "column {col} has no runnable kind"),
        }
    }
}

impl std::error::Error for GridError {}

pub type Result<T> = std::result::Result<T, GridError>;
