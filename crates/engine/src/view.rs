//! Render projection.
//!
//! The view layer never reads cell contents back from widgets; it asks the
//! grid for a `CellView` and draws that.

use crate::cell::{Column, RunState};
use crate::error::Result;
use crate::grid::GridState;

/// What a cell should look like right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellView {
    /// Free-text input
    Text(String),
    /// Option picker for dropdown-like kinds
    Choice {
        options: Vec<String>,
        selected: Vec<String>,
        allow_multiple: bool,
    },
    /// Run slot with its button label
    Run { state: RunState, label: String },
    /// Executable cell in a test-mode locked row
    Locked,
}

impl GridState {
    pub fn cell_view(&self, row: u32, col: Column) -> Result<CellView> {
        let value = self.get_cell(row, col)?;
        let kind = self.kind_of(col);

        if kind.is_executable() {
            if self.locked(row) {
                return Ok(CellView::Locked);
            }
            let label = self
                .column_config(col)
                .and_then(|cfg| cfg.bound_app_name.clone())
                .unwrap_or_else(|| self.display_name(col));
            return Ok(CellView::Run { state: self.run_state(row, col)?, label });
        }

        if kind.requires_options() {
            let cfg = self.column_config(col);
            let allow_multiple = cfg.is_some_and(|c| c.allow_multiple);
            let selected = if allow_multiple {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            } else if value.is_empty() {
                Vec::new()
            } else {
                vec![value]
            };
            return Ok(CellView::Choice {
                options: cfg.map(|c| c.options.clone()).unwrap_or_default(),
                selected,
                allow_multiple,
            });
        }

        Ok(CellView::Text(value))
    }
}
