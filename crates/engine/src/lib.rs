//! `gridmock-engine`: grid state model.
//!
//! Pure in-memory model: cell addressing, column kinds, test-mode gating,
//! credits and bulk import. No IO.

pub mod cell;
pub mod column;
pub mod error;
pub mod grid;
pub mod import;
pub mod view;

pub use cell::{CellRef, CellValue, Column, RunState, MAX_COLUMNS};
pub use column::{ColumnConfig, ColumnKind, PromptSpec};
pub use error::GridError;
pub use grid::{GridPolicy, GridSnapshot, GridState, MAX_ROWS};
pub use import::ImportRecord;
pub use view::CellView;
