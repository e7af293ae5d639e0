//! Grid state owner
//!
//! `GridStateStore` is the single writer for a `GridState`. The view calls
//! its operations and re-renders from `cell_view`; it never holds state of
//! its own.
//!
//! Startup precedence: a pending upload payload, then the persisted blob,
//! then an empty grid. A corrupt blob is logged and replaced by an empty
//! grid. Design principle: never crash on bad storage.
//!
//! Saving is debounced: a mutation marks the store dirty and `tick` writes
//! once the debounce (or the periodic interval) has elapsed. `flush` writes
//! immediately and is meant for session end.
//!
//! The store owns no timer. The host drives saves by calling `tick`, at the
//! latest by `next_save_deadline`; run completions also wait for `tick` or
//! `poll_runs`.

use std::ops::Range;
use std::time::{Duration, Instant};

use gridmock_config::Settings;
use gridmock_engine::{
    CellRef, CellView, Column, ColumnConfig, GridError, GridPolicy, GridState, ImportRecord,
    MAX_COLUMNS,
};
use gridmock_io::{blob, KeyValueStore, StoreError, UploadedFile, STATE_KEY, UPLOAD_KEY};

use crate::backend;
use crate::runner::RunScheduler;

/// Where the startup state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupSource {
    /// Converted from the one-shot upload payload
    Upload,
    /// Restored from the persisted blob
    Persisted,
    /// Persisted blob was unreadable; started empty
    Recovered,
    /// Nothing stored; started empty
    Empty,
}

pub struct GridStateStore {
    grid: GridState,
    kv: Box<dyn KeyValueStore>,
    runs: RunScheduler,
    source: StartupSource,
    /// Has the grid been modified since last save?
    dirty: bool,
    /// When was the grid first marked dirty?
    dirty_since: Option<Instant>,
    last_save: Instant,
    debounce: Duration,
    autosave_interval: Duration,
}

impl GridStateStore {
    /// Build the store over `kv`, loading the startup state from it.
    pub fn open(mut kv: Box<dyn KeyValueStore>, settings: &Settings) -> Self {
        let (grid, source) = load_initial(kv.as_mut(), settings);
        log::info!(
            "grid ready from {:?}: {} rows x {} columns",
            source,
            grid.row_count(),
            grid.column_count()
        );

        let mut store = Self {
            grid,
            kv,
            runs: RunScheduler::new(settings.run_delay()),
            source,
            dirty: false,
            dirty_since: None,
            last_save: Instant::now(),
            debounce: settings.save_debounce(),
            autosave_interval: settings.auto_save_interval(),
        };
        // A converted upload only lives in memory until the first save
        if source == StartupSource::Upload {
            store.mark_dirty();
        }
        store
    }

    /// Open with the backend named in settings.
    pub fn open_default(settings: &Settings) -> Result<Self, StoreError> {
        Ok(Self::open(backend::open_backend(settings)?, settings))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn startup_source(&self) -> StartupSource {
        self.source
    }

    pub fn backend(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }

    pub fn get_cell(&self, row: u32, col: Column) -> Result<String, GridError> {
        self.grid.get_cell(row, col)
    }

    pub fn cell_view(&self, row: u32, col: Column) -> Result<CellView, GridError> {
        self.grid.cell_view(row, col)
    }

    pub fn locked(&self, row: u32) -> bool {
        self.grid.locked(row)
    }

    pub fn credits_owed(&self) -> u32 {
        self.grid.credits_owed()
    }

    pub fn pending_runs(&self) -> Vec<CellRef> {
        self.runs.pending_cells()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn set_cell(&mut self, row: u32, col: Column, value: impl Into<String>) -> Result<(), GridError> {
        let cell = self.grid.check_cell(row, col)?;
        self.grid.set_cell(row, col, value)?;
        self.runs.cancel(cell);
        self.mark_dirty();
        Ok(())
    }

    /// Replace a column's config. Cells in that column are reset and runs
    /// in flight there are cancelled.
    pub fn configure_column(&mut self, col: Column, config: ColumnConfig) -> Result<(), GridError> {
        self.grid.configure_column(col, config)?;
        let cancelled = self.runs.cancel_column(col);
        if !cancelled.is_empty() {
            log::debug!("cancelled {} runs in reconfigured column {}", cancelled.len(), col);
        }
        self.mark_dirty();
        Ok(())
    }

    pub fn add_column(&mut self) -> Result<Column, GridError> {
        let col = self.grid.add_column()?;
        self.mark_dirty();
        Ok(col)
    }

    /// Remove trailing columns; see `GridState::remove_columns`.
    pub fn remove_columns(&mut self, letters: impl IntoIterator<Item = Column>) -> Result<bool, GridError> {
        let letters: Vec<Column> = letters.into_iter().collect();
        let removed = self.grid.remove_columns(letters.iter().copied())?;
        if removed {
            for col in &letters {
                self.runs.cancel_column(*col);
            }
            self.mark_dirty();
        } else if !letters.is_empty() {
            log::debug!("ignoring removal of non-trailing columns {:?}", letters);
        }
        Ok(removed)
    }

    /// Toggle test mode. Runs in flight on rows that become locked are
    /// cancelled and their slots go back to idle.
    pub fn set_test_mode(&mut self, active: bool) {
        self.grid.set_test_mode(active);
        if active {
            for cell in self.runs.pending_cells() {
                if self.grid.locked(cell.row) {
                    self.runs.cancel(cell);
                    if let Err(e) = self.grid.reset_run(cell) {
                        log::debug!("could not reset locked run at {}: {}", cell, e);
                    }
                }
            }
        }
        self.mark_dirty();
    }

    /// Append rows in one step; autosave never sees a partial import.
    pub fn import_bulk_rows(&mut self, records: &[ImportRecord]) -> Result<Range<u32>, GridError> {
        let added = self.grid.import_bulk_rows(records)?;
        self.mark_dirty();
        log::info!(
            "imported {} rows (now {}), {} credits owed",
            records.len(),
            self.grid.row_count(),
            self.grid.credits_owed()
        );
        Ok(added)
    }

    /// Leave preview and append the staged upload rows.
    pub fn commit_import(&mut self) -> Result<Range<u32>, GridError> {
        let added = self.grid.commit_import()?;
        self.mark_dirty();
        log::info!(
            "full import committed: rows {}..{}, {} credits owed",
            added.start,
            added.end,
            self.grid.credits_owed()
        );
        Ok(added)
    }

    pub fn set_file_name(&mut self, name: impl Into<String>) {
        self.grid.set_file_name(name);
        self.mark_dirty();
    }

    // =========================================================================
    // Runs
    // =========================================================================

    /// Start a simulated run. A run already in flight on the same cell is
    /// replaced. Returns the run's generation.
    pub fn trigger_run(&mut self, row: u32, col: Column) -> Result<u64, GridError> {
        let cell = self.grid.mark_pending(row, col)?;
        let output = self
            .grid
            .column_config(col)
            .map(ColumnConfig::completed_output)
            .unwrap_or_default();
        Ok(self.runs.schedule(cell, output))
    }

    /// Cancel the run in flight on a cell. Returns whether one existed.
    pub fn cancel_run(&mut self, row: u32, col: Column) -> Result<bool, GridError> {
        let cell = self.grid.check_cell(row, col)?;
        let cancelled = self.runs.cancel(cell);
        if cancelled {
            self.grid.reset_run(cell)?;
        }
        Ok(cancelled)
    }

    /// Apply completions that have arrived. Returns how many were applied.
    pub fn poll_runs(&mut self) -> usize {
        let ready = self.runs.drain_ready();
        self.apply_completions(ready)
    }

    /// Wait up to `timeout` for at least one completion, then apply.
    pub fn wait_for_runs(&mut self, timeout: Duration) -> usize {
        let ready = self.runs.wait_ready(timeout);
        self.apply_completions(ready)
    }

    fn apply_completions(&mut self, ready: Vec<crate::runner::RunCompletion>) -> usize {
        let mut applied = 0;
        for completion in ready {
            match self.grid.complete_run(completion.cell, completion.output) {
                Ok(()) => applied += 1,
                Err(e) => log::debug!("discarding completion for {}: {}", completion.cell, e),
            }
        }
        if applied > 0 {
            self.mark_dirty();
        }
        applied
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Mark the grid as needing a save
    pub fn mark_dirty(&mut self) {
        if !self.dirty {
            self.dirty = true;
            self.dirty_since = Some(Instant::now());
        }
    }

    /// Dirty and either the debounce or the periodic interval has elapsed.
    pub fn should_save_at(&self, now: Instant) -> bool {
        if !self.dirty {
            return false;
        }
        let debounced = self
            .dirty_since
            .is_some_and(|since| now.saturating_duration_since(since) >= self.debounce);
        let periodic = now.saturating_duration_since(self.last_save) >= self.autosave_interval;
        debounced || periodic
    }

    /// When the next save falls due: the earlier of the debounce expiry
    /// and the periodic interval. `None` while there is nothing to save.
    pub fn next_save_deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        let periodic = self.last_save + self.autosave_interval;
        Some(match self.dirty_since {
            Some(since) => periodic.min(since + self.debounce),
            None => periodic,
        })
    }

    /// Save if due. Returns whether a save happened.
    pub fn maybe_save_at(&mut self, now: Instant) -> bool {
        self.should_save_at(now) && self.save_now().is_ok()
    }

    pub fn maybe_save(&mut self) -> bool {
        self.maybe_save_at(Instant::now())
    }

    /// Timer entry point: apply finished runs, then save if due.
    pub fn tick(&mut self) -> bool {
        self.poll_runs();
        self.maybe_save()
    }

    /// Write the blob now. On failure the store stays dirty so the next
    /// save point retries.
    pub fn save_now(&mut self) -> Result<(), StoreError> {
        let result = blob::serialize(&self.grid).and_then(|json| self.kv.set(STATE_KEY, &json));
        match &result {
            Ok(()) => {
                self.dirty = false;
                self.dirty_since = None;
                self.last_save = Instant::now();
                log::debug!("grid state saved");
            }
            Err(e) => log::warn!("failed to save grid state: {}", e),
        }
        result
    }

    /// Session end: apply finished runs and save unconditionally.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.poll_runs();
        self.save_now()
    }
}

fn policy_from(settings: &Settings) -> GridPolicy {
    GridPolicy {
        lock_threshold: settings.test_mode_row_limit,
        credits_per_cell: settings.credits_per_cell,
    }
}

fn empty_grid(settings: &Settings) -> GridState {
    GridState::new(
        settings.initial_rows.max(1),
        settings.initial_columns.clamp(1, MAX_COLUMNS),
        policy_from(settings),
    )
}

fn load_initial(kv: &mut dyn KeyValueStore, settings: &Settings) -> (GridState, StartupSource) {
    let policy = policy_from(settings);

    match kv.get(UPLOAD_KEY) {
        Ok(Some(json)) => {
            // One-shot: consumed whether or not it parses
            if let Err(e) = kv.remove(UPLOAD_KEY) {
                log::warn!("failed to clear upload payload: {}", e);
            }
            match UploadedFile::parse(&json) {
                Ok(upload) => {
                    let name = upload.name.clone();
                    let mode = if upload.preview_mode { "preview" } else { "full load" };
                    match upload.into_grid(
                        settings.initial_rows.max(1),
                        settings.initial_columns.clamp(1, MAX_COLUMNS),
                        policy,
                    ) {
                        Ok(grid) => {
                            log::info!("loading upload {} of {:?}", mode, name);
                            return (grid, StartupSource::Upload);
                        }
                        Err(e) => log::warn!("ignoring upload {:?}: {}", name, e),
                    }
                }
                Err(e) => log::warn!("ignoring malformed upload payload: {}", e),
            }
        }
        Ok(None) => {}
        Err(e) => log::warn!("failed to read upload payload: {}", e),
    }

    match kv.get(STATE_KEY) {
        Ok(Some(json)) => match blob::deserialize(&json, policy) {
            Ok(grid) => {
                if let Some(saved) = blob::saved_at(&json) {
                    log::info!("restoring grid saved at {}", saved.to_rfc3339());
                }
                (grid, StartupSource::Persisted)
            }
            Err(e) => {
                log::warn!("persisted grid unusable ({}); starting empty", e);
                (empty_grid(settings), StartupSource::Recovered)
            }
        },
        Ok(None) => (empty_grid(settings), StartupSource::Empty),
        Err(e) => {
            log::warn!("failed to read persisted grid ({}); starting empty", e);
            (empty_grid(settings), StartupSource::Recovered)
        }
    }
}
