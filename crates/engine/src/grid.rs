//! Grid state: dimensions, cell values, column configs and mode flags.
//!
//! Every fallible operation validates before it mutates, so an `Err` always
//! leaves the grid exactly as it was.
//!
//! ## Storage invariant
//!
//! `cells` only holds non-default values. Empty text and idle run slots are
//! implicit: any in-bounds address without an entry reads as the default for
//! its column kind. Every key is inside `1..=row_count` and below
//! `column_count`.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use rustc_hash::FxHashMap;

use crate::cell::{CellRef, CellValue, Column, RunState, MAX_COLUMNS};
use crate::column::{ColumnConfig, ColumnKind};
use crate::error::{GridError, Result};
use crate::import::ImportRecord;

pub const DEFAULT_ROWS: u32 = 20;
pub const DEFAULT_COLUMNS: usize = 8;

/// Upper bound on rows after imports.
pub const MAX_ROWS: u32 = 10_000;

/// Rows above this stay interactive in test mode.
pub const DEFAULT_LOCK_THRESHOLD: u32 = 10;

/// Cost of one unexecuted output cell.
pub const DEFAULT_CREDITS_PER_CELL: u32 = 20;

/// Tunables for gating and credit accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPolicy {
    pub lock_threshold: u32,
    pub credits_per_cell: u32,
}

impl Default for GridPolicy {
    fn default() -> Self {
        Self {
            lock_threshold: DEFAULT_LOCK_THRESHOLD,
            credits_per_cell: DEFAULT_CREDITS_PER_CELL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    row_count: u32,
    column_count: usize,
    cells: FxHashMap<CellRef, CellValue>,
    columns: BTreeMap<Column, ColumnConfig>,
    test_mode_active: bool,
    preview_mode: bool,
    file_name: String,
    /// Upload rows held back by the preview, appended by `commit_import`
    staged_rows: Vec<Vec<String>>,
    policy: GridPolicy,
}

/// Plain-data copy of a grid, used by persistence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridSnapshot {
    pub row_count: u32,
    pub column_count: usize,
    /// Non-empty cell strings (text, or recorded run output)
    pub cells: BTreeMap<CellRef, String>,
    pub columns: BTreeMap<Column, ColumnConfig>,
    pub file_name: String,
    pub preview_mode: bool,
    pub test_mode_active: bool,
    pub staged_rows: Vec<Vec<String>>,
}

impl Default for GridState {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLUMNS, GridPolicy::default())
    }
}

impl GridState {
    /// Empty grid. Dimensions are clamped to `MAX_ROWS` / `MAX_COLUMNS`.
    pub fn new(rows: u32, columns: usize, policy: GridPolicy) -> Self {
        Self {
            row_count: rows.min(MAX_ROWS),
            column_count: columns.min(MAX_COLUMNS),
            cells: FxHashMap::default(),
            columns: BTreeMap::new(),
            test_mode_active: false,
            preview_mode: false,
            file_name: String::new(),
            staged_rows: Vec::new(),
            policy,
        }
    }

    /// Grid filled from an uploaded file's rows.
    ///
    /// Data row `i` lands on grid row `i + 1` starting at column A; values
    /// past the last column are dropped. In a preview, rows past the last
    /// grid row are staged for `commit_import` and test mode starts on.
    /// A full load grows the grid to fit every row, failing with
    /// `RowLimitExceeded` past `MAX_ROWS`.
    pub fn from_preview(
        file_name: impl Into<String>,
        preview_mode: bool,
        data: Vec<Vec<String>>,
        rows: u32,
        columns: usize,
        policy: GridPolicy,
    ) -> Result<Self> {
        let mut rows = rows;
        if !preview_mode {
            let requested = data.len() as u64;
            if requested > MAX_ROWS as u64 {
                return Err(GridError::RowLimitExceeded { limit: MAX_ROWS, requested });
            }
            rows = rows.max(requested as u32);
        }

        let mut grid = Self::new(rows, columns, policy);
        grid.file_name = file_name.into();
        grid.preview_mode = preview_mode;
        grid.test_mode_active = preview_mode;

        let mut data = data.into_iter();
        for row in 1..=grid.row_count {
            let Some(values) = data.next() else { break };
            for (col, value) in Column::first(grid.column_count).zip(values) {
                grid.store(CellRef::new(row, col), CellValue::Text(value));
            }
        }
        grid.staged_rows = data.collect();
        Ok(grid)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn test_mode_active(&self) -> bool {
        self.test_mode_active
    }

    pub fn preview_mode(&self) -> bool {
        self.preview_mode
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, name: impl Into<String>) {
        self.file_name = name.into();
    }

    pub fn staged_rows(&self) -> &[Vec<String>] {
        &self.staged_rows
    }

    pub fn policy(&self) -> GridPolicy {
        self.policy
    }

    /// Columns currently in the grid, A first.
    pub fn column_letters(&self) -> impl Iterator<Item = Column> {
        Column::first(self.column_count)
    }

    pub fn column_config(&self, col: Column) -> Option<&ColumnConfig> {
        self.columns.get(&col)
    }

    /// Kind of `col`; unconfigured columns are plain.
    pub fn kind_of(&self, col: Column) -> ColumnKind {
        self.columns.get(&col).map(|c| c.kind).unwrap_or_default()
    }

    /// Header text: the configured display name, else the letter.
    pub fn display_name(&self, col: Column) -> String {
        match self.columns.get(&col) {
            Some(cfg) if !cfg.display_name.is_empty() => cfg.display_name.clone(),
            _ => col.to_string(),
        }
    }

    // =========================================================================
    // Cells
    // =========================================================================

    fn check_column(&self, col: Column) -> Result<()> {
        if col.index() >= self.column_count {
            return Err(GridError::OutOfRange { row: None, col });
        }
        Ok(())
    }

    /// Validate an address against the current bounds.
    pub fn check_cell(&self, row: u32, col: Column) -> Result<CellRef> {
        if col.index() >= self.column_count || row == 0 || row > self.row_count {
            return Err(GridError::OutOfRange { row: Some(row), col });
        }
        Ok(CellRef::new(row, col))
    }

    /// Stored value, or an empty string if unset.
    pub fn get_cell(&self, row: u32, col: Column) -> Result<String> {
        let cell = self.check_cell(row, col)?;
        Ok(self.cells.get(&cell).map(CellValue::as_text).unwrap_or_default())
    }

    /// Overwrite a cell. In executable columns the value is the recorded
    /// output; an empty value resets the slot to idle.
    pub fn set_cell(&mut self, row: u32, col: Column, value: impl Into<String>) -> Result<()> {
        let cell = self.check_cell(row, col)?;
        let value = value.into();
        let value = if self.kind_of(col).is_executable() {
            if value.is_empty() {
                CellValue::Run(RunState::Idle)
            } else {
                CellValue::Run(RunState::Complete(value))
            }
        } else {
            CellValue::Text(value)
        };
        self.store(cell, value);
        Ok(())
    }

    fn store(&mut self, cell: CellRef, value: CellValue) {
        if value.is_default() {
            self.cells.remove(&cell);
        } else {
            self.cells.insert(cell, value);
        }
    }

    /// Number of stored (non-default) cells.
    pub fn stored_cell_count(&self) -> usize {
        self.cells.len()
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// Replace the config of `col`, resetting every cell in that column.
    pub fn configure_column(&mut self, col: Column, config: ColumnConfig) -> Result<()> {
        self.check_column(col)?;
        config.validate(col, self.column_count, self.kind_of(col))?;

        self.cells.retain(|cell, _| cell.col != col);
        self.columns.insert(col, config);
        Ok(())
    }

    /// Append one column and return its letter.
    pub fn add_column(&mut self) -> Result<Column> {
        let col = Column::from_index(self.column_count)
            .ok_or(GridError::ColumnLimitExceeded { limit: MAX_COLUMNS })?;
        self.column_count += 1;
        Ok(col)
    }

    /// Remove a contiguous suffix of columns, with their configs and cells.
    ///
    /// Returns `Ok(false)` without touching anything when `letters` is empty
    /// or not exactly the trailing columns.
    pub fn remove_columns(&mut self, letters: impl IntoIterator<Item = Column>) -> Result<bool> {
        let set: BTreeSet<Column> = letters.into_iter().collect();
        if let Some(col) = set.iter().find(|c| c.index() >= self.column_count) {
            return Err(GridError::OutOfRange { row: None, col: *col });
        }
        if set.is_empty() || !self.is_trailing(&set) {
            return Ok(false);
        }

        self.cells.retain(|cell, _| !set.contains(&cell.col));
        for col in &set {
            self.columns.remove(col);
        }
        self.column_count -= set.len();

        // Prompt context refs must stay inside the grid
        for cfg in self.columns.values_mut() {
            if let Some(prompt) = cfg.prompt.as_mut() {
                if prompt.context_column.is_some_and(|c| set.contains(&c)) {
                    prompt.context_column = None;
                }
            }
        }
        Ok(true)
    }

    fn is_trailing(&self, set: &BTreeSet<Column>) -> bool {
        let start = self.column_count - set.len();
        set.iter().enumerate().all(|(i, col)| col.index() == start + i)
    }

    // =========================================================================
    // Test mode & credits
    // =========================================================================

    /// Locks are derived from the flag; no cell data changes.
    pub fn set_test_mode(&mut self, active: bool) {
        self.test_mode_active = active;
    }

    /// True when `row` is past the test-mode window and test mode is on.
    pub fn locked(&self, row: u32) -> bool {
        self.test_mode_active && row > self.policy.lock_threshold
    }

    /// Unexecuted executable cells in unlocked rows, times the per-cell cost.
    /// Computed from scratch on every call.
    pub fn credits_owed(&self) -> u32 {
        let executable: Vec<Column> = self
            .column_letters()
            .filter(|c| self.kind_of(*c).is_executable())
            .collect();
        if executable.is_empty() {
            return 0;
        }

        let last_row = if self.test_mode_active {
            self.row_count.min(self.policy.lock_threshold)
        } else {
            self.row_count
        };

        let mut missing: u32 = 0;
        for row in 1..=last_row {
            for col in &executable {
                let has_output = matches!(
                    self.cells.get(&CellRef::new(row, *col)),
                    Some(CellValue::Run(state)) if state.has_output()
                );
                if !has_output {
                    missing += 1;
                }
            }
        }
        missing.saturating_mul(self.policy.credits_per_cell)
    }

    // =========================================================================
    // Bulk import
    // =========================================================================

    /// Append `records` after the last row. Executable columns get idle run
    /// slots; every other column takes the field at its position. Returns the
    /// new row numbers. No deduplication: importing twice appends twice.
    pub fn import_bulk_rows(&mut self, records: &[ImportRecord]) -> Result<Range<u32>> {
        let requested = self.row_count as u64 + records.len() as u64;
        if requested > MAX_ROWS as u64 {
            return Err(GridError::RowLimitExceeded { limit: MAX_ROWS, requested });
        }

        let start = self.row_count + 1;
        let text_columns: Vec<Column> = self
            .column_letters()
            .filter(|c| !self.kind_of(*c).is_executable())
            .collect();

        for (offset, record) in records.iter().enumerate() {
            let row = start + offset as u32;
            for col in &text_columns {
                if let Some(value) = record.value_at(col.index()) {
                    self.store(CellRef::new(row, *col), CellValue::Text(value.to_string()));
                }
            }
        }

        self.row_count = requested as u32;
        Ok(start..self.row_count + 1)
    }

    /// Leave preview: drop test mode and append the staged upload rows.
    pub fn commit_import(&mut self) -> Result<Range<u32>> {
        let records: Vec<ImportRecord> = self
            .staged_rows
            .iter()
            .map(|row| ImportRecord::from_values(row.iter().cloned()))
            .collect();
        let added = self.import_bulk_rows(&records)?;

        self.staged_rows.clear();
        self.preview_mode = false;
        self.test_mode_active = false;
        Ok(added)
    }

    // =========================================================================
    // Run slots
    // =========================================================================

    fn check_executable(&self, row: u32, col: Column) -> Result<CellRef> {
        let cell = self.check_cell(row, col)?;
        if !self.kind_of(col).is_executable() {
            return Err(GridError::NotExecutable { col });
        }
        Ok(cell)
    }

    /// Address of a slot that can be triggered right now.
    pub fn check_runnable(&self, row: u32, col: Column) -> Result<CellRef> {
        let cell = self.check_executable(row, col)?;
        if self.locked(row) {
            return Err(GridError::Locked(cell));
        }
        Ok(cell)
    }

    /// Run state of an executable cell.
    pub fn run_state(&self, row: u32, col: Column) -> Result<RunState> {
        let cell = self.check_executable(row, col)?;
        Ok(match self.cells.get(&cell) {
            Some(CellValue::Run(state)) => state.clone(),
            _ => RunState::Idle,
        })
    }

    pub fn mark_pending(&mut self, row: u32, col: Column) -> Result<CellRef> {
        let cell = self.check_runnable(row, col)?;
        self.cells.insert(cell, CellValue::Run(RunState::Pending));
        Ok(cell)
    }

    pub fn complete_run(&mut self, cell: CellRef, output: impl Into<String>) -> Result<()> {
        let cell = self.check_executable(cell.row, cell.col)?;
        self.store(cell, CellValue::Run(RunState::Complete(output.into())));
        Ok(())
    }

    /// Put a pending slot back to idle. Completed outputs are kept.
    pub fn reset_run(&mut self, cell: CellRef) -> Result<()> {
        let cell = self.check_executable(cell.row, cell.col)?;
        if self.cells.get(&cell) == Some(&CellValue::Run(RunState::Pending)) {
            self.cells.remove(&cell);
        }
        Ok(())
    }

    // =========================================================================
    // Snapshot / restore
    // =========================================================================

    /// Copy out everything worth persisting. Pending runs are not.
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            row_count: self.row_count,
            column_count: self.column_count,
            cells: self
                .cells
                .iter()
                .filter_map(|(cell, value)| {
                    let text = value.as_text();
                    (!text.is_empty()).then_some((*cell, text))
                })
                .collect(),
            columns: self.columns.clone(),
            file_name: self.file_name.clone(),
            preview_mode: self.preview_mode,
            test_mode_active: self.test_mode_active,
            staged_rows: self.staged_rows.clone(),
        }
    }

    /// Rebuild a grid from a snapshot, rejecting anything that breaks the
    /// grid invariants with `CorruptState`.
    pub fn restore(snapshot: GridSnapshot, policy: GridPolicy) -> Result<Self> {
        if snapshot.row_count > MAX_ROWS {
            return Err(GridError::CorruptState(format!(
                "rowCount {} exceeds {MAX_ROWS}",
                snapshot.row_count
            )));
        }
        if snapshot.column_count > MAX_COLUMNS {
            return Err(GridError::CorruptState(format!(
                "columnCount {} exceeds {MAX_COLUMNS}",
                snapshot.column_count
            )));
        }

        let mut grid = Self::new(snapshot.row_count, snapshot.column_count, policy);

        for (col, config) in snapshot.columns {
            if col.index() >= grid.column_count {
                return Err(GridError::CorruptState(format!("config for column {col} outside the grid")));
            }
            config
                .validate(col, grid.column_count, ColumnKind::Plain)
                .map_err(|e| GridError::CorruptState(e.to_string()))?;
            grid.columns.insert(col, config);
        }

        for (cell, value) in snapshot.cells {
            if grid.check_cell(cell.row, cell.col).is_err() {
                return Err(GridError::CorruptState(format!(
                    "cell {cell} outside the {}x{} grid",
                    grid.row_count, grid.column_count
                )));
            }
            grid.set_cell(cell.row, cell.col, value)?;
        }

        grid.file_name = snapshot.file_name;
        grid.preview_mode = snapshot.preview_mode;
        grid.test_mode_active = snapshot.test_mode_active;
        grid.staged_rows = snapshot.staged_rows;
        Ok(grid)
    }
}
